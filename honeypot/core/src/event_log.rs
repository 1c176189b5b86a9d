//! Event Log
//!
//! Append-only audit trail for a session, written to two independent files:
//!
//! - **message sink** `app-<discriminator>-<YYYYMMDD>.log`:
//!   `<YYYY-MM-DD HH:MM:SSZ> [<session-id>] - <message>`
//! - **metric sink** `metrics-<discriminator>-<YYYYMMDD>.log`:
//!   `<RFC 3339 UTC>|<session-id>|<event-type>|<compact JSON payload>`
//!
//! The line formats are the on-disk contract for downstream tooling.
//!
//! Each sink has its own lock, so message and metric writes never contend
//! with each other and concurrent writers never interleave partial lines.
//! The date in the file name is evaluated on every write, so a session that
//! crosses midnight continues in a new file. Every write failure is
//! swallowed here: logging never affects the session.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDate, SecondsFormat, Utc};
use parking_lot::Mutex;
use serde_json::Value;

use crate::session::SessionId;

/// Typed session events recorded in the metric sink
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Session created
    SessionStart,
    /// Operator-level action (exit, end of input, interrupt)
    UserAction,
    /// Accepted input line
    UserInput,
    /// Input rejected by the command filter
    BlockedOperation,
    /// Successful provider round trip
    LlmInteraction,
    /// Failure in the read loop or while processing a turn
    Error,
    /// Session finished draining
    SessionEnd,
}

impl EventKind {
    /// Name written to the metric sink
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SessionStart => "SessionStart",
            Self::UserAction => "UserAction",
            Self::UserInput => "UserInput",
            Self::BlockedOperation => "BlockedOperation",
            Self::LlmInteraction => "LLMInteraction",
            Self::Error => "Error",
            Self::SessionEnd => "SessionEnd",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One append-only file family (`<prefix>-<discriminator>-<date>.log`)
struct Sink {
    /// `None` when logging is disabled
    stem: Option<PathBuf>,
}

impl Sink {
    fn new(dir: Option<&Path>, prefix: &str, discriminator: &str) -> Self {
        Self {
            stem: dir.map(|d| d.join(format!("{prefix}-{discriminator}"))),
        }
    }

    fn path_for(&self, date: NaiveDate) -> Option<PathBuf> {
        let stem = self.stem.as_ref()?;
        let mut name = stem.file_name()?.to_os_string();
        name.push(format!("-{}.log", date.format("%Y%m%d")));
        Some(stem.with_file_name(name))
    }

    fn append(&self, line: &str) {
        let Some(path) = self.path_for(Local::now().date_naive()) else {
            return;
        };

        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .and_then(|mut file| file.write_all(format!("{line}\n").as_bytes()));

        if let Err(e) = result {
            tracing::debug!(error = %e, path = ?path, "Event log write failed");
        }
    }
}

/// Session event log with independent message and metric sinks
pub struct EventLog {
    session_id: SessionId,
    messages: Mutex<Sink>,
    metrics: Mutex<Sink>,
}

impl EventLog {
    /// Create a log writing into `dir`.
    ///
    /// `discriminator` keeps concurrent sessions apart in file names; it is
    /// normally the session-name override or the short session ID.
    pub fn new(dir: impl Into<PathBuf>, session_id: SessionId, discriminator: &str) -> Self {
        let dir = dir.into();
        if let Err(e) = fs::create_dir_all(&dir) {
            tracing::warn!(error = %e, path = ?dir, "Could not create log directory");
        }

        Self {
            messages: Mutex::new(Sink::new(Some(&dir), "app", discriminator)),
            metrics: Mutex::new(Sink::new(Some(&dir), "metrics", discriminator)),
            session_id,
        }
    }

    /// Create a log that drops every record
    #[must_use]
    pub fn disabled(session_id: SessionId) -> Self {
        Self {
            messages: Mutex::new(Sink::new(None, "app", "")),
            metrics: Mutex::new(Sink::new(None, "metrics", "")),
            session_id,
        }
    }

    /// Session this log belongs to
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Append a human-readable line to the message sink
    pub fn log_message(&self, message: &str) {
        let line = format_message_line(Local::now(), &self.session_id, message);
        self.messages.lock().append(&line);
    }

    /// Append a structured event to the metric sink
    pub fn log_metric(&self, kind: EventKind, payload: &Value) {
        tracing::trace!(event = %kind, session_id = %self.session_id, "Recording event");
        let line = format_metric_line(Utc::now(), &self.session_id, kind, payload);
        self.metrics.lock().append(&line);
    }

    /// Current message sink file, if logging is enabled
    #[must_use]
    pub fn message_log_path(&self) -> Option<PathBuf> {
        self.messages.lock().path_for(Local::now().date_naive())
    }

    /// Current metric sink file, if logging is enabled
    #[must_use]
    pub fn metric_log_path(&self) -> Option<PathBuf> {
        self.metrics.lock().path_for(Local::now().date_naive())
    }
}

/// Format a message-sink line
#[must_use]
pub fn format_message_line(at: DateTime<Local>, session_id: &SessionId, message: &str) -> String {
    format!("{} [{}] - {}", at.format("%Y-%m-%d %H:%M:%SZ"), session_id, message)
}

/// Format a metric-sink line
#[must_use]
pub fn format_metric_line(
    at: DateTime<Utc>,
    session_id: &SessionId,
    kind: EventKind,
    payload: &Value,
) -> String {
    format!(
        "{}|{}|{}|{}",
        at.to_rfc3339_opts(SecondsFormat::Micros, true),
        session_id,
        kind,
        payload
    )
}
