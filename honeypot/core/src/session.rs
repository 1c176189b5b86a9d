//! Session Management
//!
//! A session lives for the lifetime of the process: one identifier, one start
//! timestamp, one running message counter. The optional conversation history
//! is kept here too, but it is owned by the pipeline worker alone.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::backend::ChatMessage;

/// Session identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    /// Generate a new random session ID
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Short prefix used to keep log file names apart
    #[must_use]
    pub fn discriminator(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(8)
            .map_or(self.0.len(), |(idx, _)| idx);
        &self.0[..end]
    }

    /// Borrow as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One honeypot session
#[derive(Clone, Debug)]
pub struct Session {
    /// Unique session ID
    pub id: SessionId,
    /// When the session started
    pub started_at: DateTime<Utc>,
    /// Accepted input lines so far
    message_count: u64,
}

impl Session {
    /// Start a new session
    #[must_use]
    pub fn new() -> Self {
        Self::with_id(SessionId::new())
    }

    /// Start a session with a specific ID
    #[must_use]
    pub fn with_id(id: SessionId) -> Self {
        Self {
            id,
            started_at: Utc::now(),
            message_count: 0,
        }
    }

    /// Count one accepted input line and return the new total
    pub fn record_message(&mut self) -> u64 {
        self.message_count += 1;
        self.message_count
    }

    /// Accepted input lines so far
    #[must_use]
    pub fn message_count(&self) -> u64 {
        self.message_count
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Ordered, append-only record of the exchange sent back to the provider
/// when multi-turn context is enabled.
#[derive(Clone, Debug, Default)]
pub struct ConversationHistory {
    messages: Vec<ChatMessage>,
}

impl ConversationHistory {
    /// Create an empty history
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed exchange
    pub fn record_exchange(&mut self, input: &str, reply: &str) {
        self.messages.push(ChatMessage::user(input));
        self.messages.push(ChatMessage::assistant(reply));
    }

    /// Messages recorded so far
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Number of recorded messages
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if nothing has been recorded yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Build the conversation for one request: persona, optional history, input.
#[must_use]
pub fn build_conversation(
    persona: &str,
    history: Option<&ConversationHistory>,
    input: &str,
) -> Vec<ChatMessage> {
    let prior = history.map_or(0, ConversationHistory::len);
    let mut messages = Vec::with_capacity(prior + 2);
    messages.push(ChatMessage::system(persona));
    if let Some(history) = history {
        messages.extend_from_slice(history.messages());
    }
    messages.push(ChatMessage::user(input));
    messages
}
