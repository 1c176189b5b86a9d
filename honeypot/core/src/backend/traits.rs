//! Completion Provider Traits
//!
//! Trait definitions for chat-completion backends. The session pipeline only
//! talks to [`CompletionProvider`], so the hosted endpoint can be swapped for
//! a scripted stand-in in tests.
//!
//! # Contract
//!
//! - One request in, one reply out; no streaming
//! - Token counts default to zero when the upstream omits usage data
//! - No automatic retries: a failure is returned to the caller as-is

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::ProviderError;

/// Who authored a chat message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Persona instruction
    System,
    /// Raw operator input
    User,
    /// Generated terminal output
    Assistant,
}

/// A role-tagged message sent to the provider
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message author
    pub role: MessageRole,
    /// Message text
    pub content: String,
}

impl ChatMessage {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// A chat-completion request
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CompletionRequest {
    /// Model identifier (provider-specific)
    pub model: String,
    /// Ordered conversation, persona first
    pub messages: Vec<ChatMessage>,
    /// Upper bound on generated tokens
    pub max_tokens: u32,
}

impl CompletionRequest {
    /// Create an empty request for a model
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            max_tokens: 2000,
        }
    }

    /// Append a message
    #[must_use]
    pub fn with_message(mut self, message: ChatMessage) -> Self {
        self.messages.push(message);
        self
    }

    /// Replace the conversation
    #[must_use]
    pub fn with_messages(mut self, messages: Vec<ChatMessage>) -> Self {
        self.messages = messages;
        self
    }

    /// Set max tokens
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Token usage reported by the provider
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens in the prompt
    pub prompt: u32,
    /// Tokens in the reply
    pub completion: u32,
    /// Prompt plus reply
    pub total: u32,
}

/// A completed reply
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Completion {
    /// Generated text
    pub content: String,
    /// Token usage (zeros when unavailable)
    pub usage: TokenUsage,
}

/// Completion provider trait
///
/// Implement this to plug in a different chat-completion endpoint.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Provider name for diagnostics
    fn name(&self) -> &str;

    /// Send the conversation and wait for the full reply
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, ProviderError>;
}
