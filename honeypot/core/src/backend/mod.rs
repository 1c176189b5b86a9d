//! Completion Provider Integration
//!
//! Abstracted access to hosted chat-completion endpoints through a common
//! trait interface.
//!
//! # Available Backends
//!
//! - **OpenRouter**: any OpenAI-compatible `/chat/completions` endpoint
//!
//! # Usage
//!
//! ```ignore
//! use honeypot_core::backend::{ChatMessage, CompletionProvider, CompletionRequest, OpenRouterBackend};
//!
//! let backend = OpenRouterBackend::new(DEFAULT_API_URL, Some(key), Duration::from_secs(120))?;
//! let request = CompletionRequest::new("openai/gpt-4o").with_message(ChatMessage::user("ls"));
//! let reply = backend.complete(&request).await?;
//! ```

mod error;
mod openrouter;
mod traits;

pub use error::ProviderError;
pub use openrouter::{parse_completion, OpenRouterBackend, DEFAULT_API_URL};
pub use traits::{
    ChatMessage, Completion, CompletionProvider, CompletionRequest, MessageRole, TokenUsage,
};
