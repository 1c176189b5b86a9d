//! Turns
//!
//! A turn pairs one input line with at most one generated reply. It is built
//! once the outcome is known, written to the event log, printed, and dropped.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::backend::{Completion, TokenUsage};
use crate::event_log::{EventKind, EventLog};
use crate::filter::{Classification, BLOCK_REASON, REJECTION_MESSAGE};

/// Context tag recorded when a queued input fails
pub const WORKER_ERROR_CONTEXT: &str = "ProcessInputQueue";

/// An accepted input waiting in the pipeline queue
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingInput {
    /// Session message counter value for this line
    pub message_number: u64,
    /// Trimmed input text
    pub text: String,
    /// When the line was read
    pub received_at: DateTime<Utc>,
}

impl PendingInput {
    /// Wrap an accepted line
    pub fn new(message_number: u64, text: impl Into<String>) -> Self {
        Self {
            message_number,
            text: text.into(),
            received_at: Utc::now(),
        }
    }
}

/// How a turn ended
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Rejected by the command filter; no provider call
    Blocked,
    /// Provider produced a reply
    Answered {
        /// Generated text
        reply: String,
        /// Token usage
        usage: TokenUsage,
    },
    /// Provider call failed
    Failed {
        /// Failure description
        reason: String,
    },
}

/// One finalized input/response exchange
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Turn {
    /// Session message counter value
    pub message_number: u64,
    /// Raw input text
    pub input: String,
    /// When the input was read
    pub received_at: DateTime<Utc>,
    /// Filter verdict
    pub classification: Classification,
    /// Result
    pub outcome: TurnOutcome,
    /// Time spent waiting on the provider
    pub duration: Duration,
}

impl Turn {
    /// A turn the command filter rejected
    pub fn blocked(message_number: u64, input: impl Into<String>) -> Self {
        Self {
            message_number,
            input: input.into(),
            received_at: Utc::now(),
            classification: Classification::Blocked,
            outcome: TurnOutcome::Blocked,
            duration: Duration::ZERO,
        }
    }

    /// A turn the provider answered
    #[must_use]
    pub fn answered(pending: PendingInput, completion: Completion, duration: Duration) -> Self {
        Self {
            message_number: pending.message_number,
            input: pending.text,
            received_at: pending.received_at,
            classification: Classification::Allowed,
            outcome: TurnOutcome::Answered {
                reply: completion.content,
                usage: completion.usage,
            },
            duration,
        }
    }

    /// A turn whose provider call failed
    pub fn failed(pending: PendingInput, reason: impl Into<String>, duration: Duration) -> Self {
        Self {
            message_number: pending.message_number,
            input: pending.text,
            received_at: pending.received_at,
            classification: Classification::Allowed,
            outcome: TurnOutcome::Failed {
                reason: reason.into(),
            },
            duration,
        }
    }

    /// Generated reply, if any
    #[must_use]
    pub fn reply(&self) -> Option<&str> {
        match &self.outcome {
            TurnOutcome::Answered { reply, .. } => Some(reply),
            _ => None,
        }
    }

    /// Token usage (zeros unless answered)
    #[must_use]
    pub fn usage(&self) -> TokenUsage {
        match &self.outcome {
            TurnOutcome::Answered { usage, .. } => *usage,
            _ => TokenUsage::default(),
        }
    }

    /// Text shown in the terminal for this turn
    #[must_use]
    pub fn terminal_text(&self, prompt: &str) -> String {
        match &self.outcome {
            TurnOutcome::Blocked => REJECTION_MESSAGE.to_string(),
            TurnOutcome::Answered { reply, .. } => format!("{reply}\n{prompt}"),
            TurnOutcome::Failed { reason } => {
                format!("Error processing input '{}': {reason}", self.input)
            }
        }
    }

    /// Line for the message sink
    #[must_use]
    pub fn log_line(&self, prompt: &str) -> String {
        match &self.outcome {
            TurnOutcome::Answered { reply, .. } => format!("LLM response: {reply}"),
            _ => self.terminal_text(prompt),
        }
    }

    /// Event type and payload for the metric sink
    #[must_use]
    pub fn metric(&self) -> (EventKind, Value) {
        match &self.outcome {
            TurnOutcome::Blocked => (
                EventKind::BlockedOperation,
                json!({
                    "Command": self.input,
                    "Reason": BLOCK_REASON,
                    "MessageNumber": self.message_number,
                }),
            ),
            TurnOutcome::Answered { reply, usage } => (
                EventKind::LlmInteraction,
                json!({
                    "Input": self.input,
                    "Response": reply,
                    "PromptTokens": usage.prompt,
                    "CompletionTokens": usage.completion,
                    "TotalTokens": usage.total,
                    "DurationMs": duration_ms(self.duration),
                    "MessageNumber": self.message_number,
                }),
            ),
            TurnOutcome::Failed { reason } => (
                EventKind::Error,
                json!({
                    "Context": WORKER_ERROR_CONTEXT,
                    "Input": self.input,
                    "Message": reason,
                    "MessageNumber": self.message_number,
                }),
            ),
        }
    }

    /// Write this turn to both event log sinks
    pub fn record(&self, log: &EventLog, prompt: &str) {
        log.log_message(&self.log_line(prompt));
        let (kind, payload) = self.metric();
        log.log_metric(kind, &payload);
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
