//! OpenRouter Backend Implementation
//!
//! Completion provider for OpenAI-compatible chat-completion endpoints
//! (OpenRouter by default).
//!
//! # Wire format
//!
//! Request: `POST <api_url>` with a bearer key and
//! `{"model", "messages": [{"role", "content"}], "max_tokens"}`.
//!
//! Response: `choices[0].message.content` carries the reply; the optional
//! `usage` object carries `prompt_tokens`, `completion_tokens` and
//! `total_tokens`.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::error::ProviderError;
use super::traits::{Completion, CompletionProvider, CompletionRequest, TokenUsage};

/// Default chat-completion endpoint
pub const DEFAULT_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Key sent when none is configured; the endpoint will reject it
const MISSING_KEY: &str = "no-key";

/// Reply used when the provider returns `null` content
const EMPTY_REPLY: &str = "No response";

/// OpenRouter (OpenAI-compatible) backend client
#[derive(Clone)]
pub struct OpenRouterBackend {
    /// Endpoint URL
    api_url: String,
    /// Bearer credential
    api_key: Option<String>,
    /// HTTP client
    http_client: reqwest::Client,
}

impl OpenRouterBackend {
    /// Create a backend with a per-request timeout
    pub fn new(
        api_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            api_url: api_url.into(),
            api_key,
            http_client,
        })
    }

    /// Endpoint this backend posts to
    #[must_use]
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.api_key.as_deref().unwrap_or(MISSING_KEY))
    }
}

#[async_trait]
impl CompletionProvider for OpenRouterBackend {
    fn name(&self) -> &'static str {
        "OpenRouter"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, ProviderError> {
        let response = self
            .http_client
            .post(&self.api_url)
            .header("Authorization", self.bearer())
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status { status, body });
        }

        let body = response.text().await?;
        parse_completion(&body)
    }
}

/// Extract reply text and token usage from a response body
pub fn parse_completion(body: &str) -> Result<Completion, ProviderError> {
    let data: Value = serde_json::from_str(body)?;

    let message = data
        .get("choices")
        .ok_or(ProviderError::MissingField("choices"))?
        .get(0)
        .ok_or(ProviderError::MissingField("choices[0]"))?
        .get("message")
        .ok_or(ProviderError::MissingField("choices[0].message"))?;

    let content = match message.get("content") {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Null) => EMPTY_REPLY.to_string(),
        _ => return Err(ProviderError::MissingField("choices[0].message.content")),
    };

    let usage = data.get("usage").map(parse_usage).unwrap_or_default();

    Ok(Completion { content, usage })
}

fn parse_usage(usage: &Value) -> TokenUsage {
    let count = |key: &str| {
        usage
            .get(key)
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(0)
    };

    TokenUsage {
        prompt: count("prompt_tokens"),
        completion: count("completion_tokens"),
        total: count("total_tokens"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_usage() {
        let body = r#"{
            "choices": [{"message": {"role": "assistant", "content": "total 0"}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
        }"#;
        let completion = parse_completion(body).unwrap();
        assert_eq!(completion.content, "total 0");
        assert_eq!(
            completion.usage,
            TokenUsage {
                prompt: 12,
                completion: 3,
                total: 15
            }
        );
    }

    #[test]
    fn test_parse_without_usage_defaults_to_zero() {
        let body = r#"{"choices": [{"message": {"content": "root"}}]}"#;
        let completion = parse_completion(body).unwrap();
        assert_eq!(completion.content, "root");
        assert_eq!(completion.usage, TokenUsage::default());
    }

    #[test]
    fn test_parse_partial_usage() {
        let body = r#"{
            "choices": [{"message": {"content": "x"}}],
            "usage": {"prompt_tokens": 7, "completion_tokens": "n/a"}
        }"#;
        let usage = parse_completion(body).unwrap().usage;
        assert_eq!(usage.prompt, 7);
        assert_eq!(usage.completion, 0);
        assert_eq!(usage.total, 0);
    }

    #[test]
    fn test_parse_null_content() {
        let body = r#"{"choices": [{"message": {"content": null}}]}"#;
        assert_eq!(parse_completion(body).unwrap().content, "No response");
    }

    #[test]
    fn test_parse_missing_fields() {
        assert!(matches!(
            parse_completion("{}"),
            Err(ProviderError::MissingField("choices"))
        ));
        assert!(matches!(
            parse_completion(r#"{"choices": []}"#),
            Err(ProviderError::MissingField("choices[0]"))
        ));
        assert!(matches!(
            parse_completion(r#"{"choices": [{}]}"#),
            Err(ProviderError::MissingField("choices[0].message"))
        ));
        assert!(matches!(
            parse_completion(r#"{"choices": [{"message": {}}]}"#),
            Err(ProviderError::MissingField("choices[0].message.content"))
        ));
    }

    #[test]
    fn test_parse_malformed_json() {
        assert!(matches!(
            parse_completion("<html>bad gateway</html>"),
            Err(ProviderError::Decode(_))
        ));
    }

    #[test]
    fn test_bearer_falls_back_to_placeholder() {
        let backend =
            OpenRouterBackend::new(DEFAULT_API_URL, None, Duration::from_secs(5)).unwrap();
        assert_eq!(backend.bearer(), "Bearer no-key");

        let backend = OpenRouterBackend::new(
            DEFAULT_API_URL,
            Some("sk-test".to_string()),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(backend.bearer(), "Bearer sk-test");
        assert_eq!(backend.api_url(), DEFAULT_API_URL);
    }
}
