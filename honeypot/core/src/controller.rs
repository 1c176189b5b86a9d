//! Session Controller
//!
//! Top-level read loop. It owns the session counter, applies the command
//! filter, feeds the pipeline, and sequences shutdown:
//!
//! ```text
//! Starting ──▶ Running ──(exit | EOF | interrupt | read error)──▶ Draining ──▶ Stopped
//!                 │ ▲
//!                 └─┘ empty line / blocked / submitted
//! ```
//!
//! Draining always waits for the worker to finish every queued input before
//! `SessionEnd` is written.
//!
//! Input bytes that are not valid UTF-8 are replaced, not rejected; only a
//! failing reader ends the session with an input error.

use std::sync::Arc;

use chrono::{Local, Utc};
use serde_json::json;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::Notify;

use crate::backend::CompletionProvider;
use crate::console::Console;
use crate::event_log::{EventKind, EventLog};
use crate::filter::{classify, Classification};
use crate::pipeline::{PipelineConfig, RunningFlag, SessionPipeline};
use crate::session::{Session, SessionId};
use crate::turn::{PendingInput, Turn};

/// Command that ends the session (case-insensitive)
pub const EXIT_COMMAND: &str = "exit";

/// Context tag recorded when the read loop fails
pub const MAIN_LOOP_CONTEXT: &str = "MainLoop";

/// Controller lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControllerState {
    /// Session created, nothing read yet
    Starting,
    /// Reading and dispatching input
    Running,
    /// Waiting for the worker to empty the queue
    Draining,
    /// Session over
    Stopped,
}

/// Why the read loop ended
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TerminationReason {
    /// Operator typed `exit`
    ExitCommand,
    /// Input stream closed
    EndOfInput,
    /// Interrupt signal
    Interrupted,
    /// Reading input failed
    InputError(String),
}

impl TerminationReason {
    /// Whether the session ended because of a failure
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::InputError(_))
    }
}

/// Result of a finished session
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionSummary {
    /// Session identifier
    pub session_id: SessionId,
    /// Accepted input lines
    pub total_messages: u64,
    /// Why the session ended
    pub termination: TerminationReason,
}

enum ReadEvent {
    Line(std::io::Result<Option<String>>),
    Interrupt,
}

/// Drives one session from banner to `SessionEnd`
pub struct SessionController {
    session: Session,
    config: PipelineConfig,
    provider: Arc<dyn CompletionProvider>,
    log: Arc<EventLog>,
    console: Console,
    interrupt: Option<Arc<Notify>>,
    state: ControllerState,
}

impl SessionController {
    /// Create a controller for a fresh session
    pub fn new(
        session: Session,
        config: PipelineConfig,
        provider: Arc<dyn CompletionProvider>,
        log: Arc<EventLog>,
        console: Console,
    ) -> Self {
        Self {
            session,
            config,
            provider,
            log,
            console,
            interrupt: None,
            state: ControllerState::Starting,
        }
    }

    /// Stop reading and drain when `notify` fires (Ctrl+C)
    #[must_use]
    pub fn with_interrupt(mut self, notify: Arc<Notify>) -> Self {
        self.interrupt = Some(notify);
        self
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Run the session until exit, end of input, interrupt, or read error.
    ///
    /// Must be called inside a tokio runtime; the pipeline worker is spawned
    /// on it.
    pub async fn run<R>(mut self, mut input: R) -> SessionSummary
    where
        R: AsyncBufRead + Unpin,
    {
        self.announce();

        let pipeline = SessionPipeline::start(
            self.config.clone(),
            Arc::clone(&self.provider),
            Arc::clone(&self.log),
            self.console.clone(),
            RunningFlag::new(),
        );
        self.state = ControllerState::Running;

        let interrupt = self.interrupt.clone();
        let mut buf = Vec::new();

        let termination = loop {
            let event = match interrupt.as_deref() {
                Some(notify) => tokio::select! {
                    line = read_line(&mut input, &mut buf) => ReadEvent::Line(line),
                    () = notify.notified() => ReadEvent::Interrupt,
                },
                None => ReadEvent::Line(read_line(&mut input, &mut buf).await),
            };

            match event {
                ReadEvent::Line(Ok(Some(line))) => {
                    if let Some(reason) = self.dispatch(&line, &pipeline) {
                        break reason;
                    }
                }
                ReadEvent::Line(Ok(None)) => {
                    self.record_action("EndOfInput");
                    break TerminationReason::EndOfInput;
                }
                ReadEvent::Interrupt => {
                    self.record_action("Interrupt");
                    break TerminationReason::Interrupted;
                }
                ReadEvent::Line(Err(e)) => {
                    let message = format!("Error: {e}");
                    self.console.print_line(&message);
                    self.log.log_message(&message);
                    self.log.log_metric(
                        EventKind::Error,
                        &json!({ "Context": MAIN_LOOP_CONTEXT, "Message": e.to_string() }),
                    );
                    tracing::error!(error = %e, "Input loop failed");
                    break TerminationReason::InputError(e.to_string());
                }
            }
        };

        self.state = ControllerState::Draining;
        tracing::info!(reason = ?termination, pending = pipeline.pending(), "Draining session");
        pipeline.shutdown().await;

        self.log.log_metric(
            EventKind::SessionEnd,
            &json!({
                "Timestamp": Utc::now().to_rfc3339(),
                "TotalMessages": self.session.message_count(),
            }),
        );
        self.log.log_message("Application shutting down.");
        self.state = ControllerState::Stopped;

        tracing::info!(
            session_id = %self.session.id,
            total_messages = self.session.message_count(),
            "Session stopped"
        );

        SessionSummary {
            session_id: self.session.id.clone(),
            total_messages: self.session.message_count(),
            termination,
        }
    }

    /// Starting: record the session and print the first prompt
    fn announce(&self) {
        self.log.log_metric(
            EventKind::SessionStart,
            &json!({ "Timestamp": self.session.started_at.to_rfc3339() }),
        );
        self.log.log_message(&format!(
            "Application starting at {}",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        ));
        self.log.log_message(&format!("Session ID: {}", self.session.id));
        self.log.log_message(&format!(
            "Machine: {}, OS: {} {}",
            machine_name(),
            std::env::consts::OS,
            std::env::consts::ARCH
        ));

        tracing::info!(session_id = %self.session.id, "Session started");
        self.console.print_line(&self.config.prompt);
    }

    /// Handle one line; returns a reason when the loop should end
    fn dispatch(&mut self, line: &str, pipeline: &SessionPipeline) -> Option<TerminationReason> {
        let input = line.trim();
        if input.is_empty() {
            return None;
        }

        if input.eq_ignore_ascii_case(EXIT_COMMAND) {
            self.console.print_line("Goodbye!");
            self.log.log_message("User initiated exit.");
            self.record_action("ExitCommand");
            return Some(TerminationReason::ExitCommand);
        }

        let message_number = self.session.record_message();
        self.log.log_message(&format!("User input: {input}"));
        self.log.log_metric(
            EventKind::UserInput,
            &json!({ "Input": input, "MessageNumber": message_number }),
        );

        match classify(input) {
            Classification::Blocked => {
                tracing::info!(input = %input, "Blocked file-transfer command");
                let turn = Turn::blocked(message_number, input);
                self.console.print_line(&turn.terminal_text(&self.config.prompt));
                turn.record(&self.log, &self.config.prompt);
            }
            Classification::Allowed => {
                pipeline.submit(PendingInput::new(message_number, input));
            }
        }

        None
    }

    fn record_action(&self, action: &str) {
        self.log.log_metric(
            EventKind::UserAction,
            &json!({ "Action": action, "MessageNumber": self.session.message_count() }),
        );
    }
}

/// Host name of the machine running the session
fn machine_name() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Read one line, decoding invalid UTF-8 lossily.
///
/// Returns `None` at end of input. Only I/O failures are errors; undecodable
/// bytes are operator data and come back as U+FFFD. `buf` keeps any partial
/// line if the read is cancelled.
async fn read_line<R>(input: &mut R, buf: &mut Vec<u8>) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let read = input.read_until(b'\n', buf).await?;
    if read == 0 && buf.is_empty() {
        return Ok(None);
    }

    let mut end = buf.len();
    if buf[..end].ends_with(b"\n") {
        end -= 1;
    }
    if buf[..end].ends_with(b"\r") {
        end -= 1;
    }
    let line = String::from_utf8_lossy(&buf[..end]).into_owned();
    buf.clear();
    Ok(Some(line))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_termination_reason_is_error() {
        assert!(!TerminationReason::ExitCommand.is_error());
        assert!(!TerminationReason::EndOfInput.is_error());
        assert!(!TerminationReason::Interrupted.is_error());
        assert!(TerminationReason::InputError("boom".into()).is_error());
    }

    #[tokio::test]
    async fn test_read_line_decodes_lossily_and_strips_endings() {
        let mut input: &[u8] = b"whoami\r\necho caf\xe9\npartial";
        let mut buf = Vec::new();

        let first = read_line(&mut input, &mut buf).await.unwrap();
        assert_eq!(first.as_deref(), Some("whoami"));
        let second = read_line(&mut input, &mut buf).await.unwrap();
        assert_eq!(second.as_deref(), Some("echo caf\u{FFFD}"));
        let third = read_line(&mut input, &mut buf).await.unwrap();
        assert_eq!(third.as_deref(), Some("partial"));
        assert_eq!(read_line(&mut input, &mut buf).await.unwrap(), None);
    }

    #[test]
    fn test_machine_name_is_never_empty() {
        let name = machine_name();
        assert!(!name.is_empty());
        assert!(!name.contains('\n'));
    }

    #[tokio::test]
    async fn test_read_line_keeps_blank_lines() {
        let mut input: &[u8] = b"\n\n";
        let mut buf = Vec::new();
        assert_eq!(read_line(&mut input, &mut buf).await.unwrap().as_deref(), Some(""));
        assert_eq!(read_line(&mut input, &mut buf).await.unwrap().as_deref(), Some(""));
        assert_eq!(read_line(&mut input, &mut buf).await.unwrap(), None);
    }
}
