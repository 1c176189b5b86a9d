//! Honeypot Core - Session Pipeline for an LLM-backed Terminal Honeypot
//!
//! This crate impersonates a remote Linux shell. Operator input is read line
//! by line, screened by a command filter, and forwarded to a hosted
//! chat-completion model wrapped in an opaque persona instruction. The model's
//! fabricated transcript is printed back and every turn is written to an
//! append-only audit log. Nothing is ever executed.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                       SessionController                          │
//! │   stdin line ──▶ CommandFilter ──blocked──▶ "operation not allowed"│
//! │                       │                                          │
//! │                    allowed                                       │
//! │                       ▼                                          │
//! │  ┌────────────────────────────────────────────────────────────┐  │
//! │  │                    SessionPipeline                          │  │
//! │  │   VecDeque<PendingInput> + Notify ──▶ worker task           │  │
//! │  │                                        │                    │  │
//! │  │                          CompletionProvider (HTTP)          │  │
//! │  └────────────────────────────────────────┼───────────────────┘  │
//! │                                           ▼                      │
//! │                   Console (stdout)   +   EventLog (app / metrics) │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`SessionController`]: read loop and shutdown sequencing
//! - [`SessionPipeline`]: input queue, wake signal, and the single worker
//! - [`CompletionProvider`]: chat-completion backend trait
//! - [`EventLog`]: message and metric sinks
//! - [`Turn`]: one finalized input/response exchange
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use honeypot_core::{
//!     load_config, Console, EventLog, OpenRouterBackend, Session, SessionController,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config()?;
//!     let session = Session::new();
//!     let log = Arc::new(EventLog::new(
//!         &config.log_dir,
//!         session.id.clone(),
//!         &config.log_discriminator(&session.id),
//!     ));
//!     let backend = OpenRouterBackend::new(&config.api_url, config.api_key.clone(), config.request_timeout)?;
//!
//!     let stdin = tokio::io::BufReader::new(tokio::io::stdin());
//!     let summary = SessionController::new(
//!         session,
//!         config.pipeline_config(),
//!         Arc::new(backend),
//!         log,
//!         Console::stdout(),
//!     )
//!     .run(stdin)
//!     .await;
//!     println!("{} messages", summary.total_messages);
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`backend`]: completion provider trait and the OpenRouter client
//! - [`config`]: TOML, environment, and CLI configuration
//! - [`console`]: shared terminal writer
//! - [`controller`]: session state machine
//! - [`event_log`]: append-only audit trail
//! - [`filter`]: file-transfer command filter
//! - [`pipeline`]: queue, wake signal, worker
//! - [`session`]: session identity and conversation history
//! - [`turn`]: turn records

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod config;
pub mod console;
pub mod controller;
pub mod event_log;
pub mod filter;
pub mod pipeline;
pub mod session;
pub mod turn;

// Re-exports for convenience
pub use backend::{
    ChatMessage, Completion, CompletionProvider, CompletionRequest, MessageRole,
    OpenRouterBackend, ProviderError, TokenUsage,
};
pub use config::{
    default_config_path, load_config, load_config_from_path, ConfigError, ConfigOverrides,
    ConfigSource, HoneypotConfig, HoneypotToml,
};
pub use console::Console;
pub use controller::{ControllerState, SessionController, SessionSummary, TerminationReason};
pub use event_log::{EventKind, EventLog};
pub use filter::{classify, Classification};
pub use pipeline::{PipelineConfig, RunningFlag, SessionPipeline};
pub use session::{ConversationHistory, Session, SessionId};
pub use turn::{PendingInput, Turn, TurnOutcome};
