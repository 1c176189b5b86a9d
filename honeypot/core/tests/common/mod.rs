//! Shared helpers for honeypot-core integration tests
//!
//! - `Capture`: in-memory console writer
//! - `ScriptedProvider`: completion provider with canned replies
//! - `run_session`: drive a full controller session over a string script

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use honeypot_core::{
    Completion, CompletionProvider, CompletionRequest, Console, EventLog, PipelineConfig,
    ProviderError, Session, SessionController, SessionSummary, TokenUsage,
};

/// Console writer that keeps everything printed
#[derive(Clone, Default)]
pub struct Capture(Arc<Mutex<Vec<u8>>>);

impl Capture {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// One canned provider outcome
pub enum Reply {
    Text(&'static str),
    Fail(u16, &'static str),
    Panic(&'static str),
}

/// Provider that answers from a script, then echoes
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Reply>>,
    seen: Mutex<Vec<String>>,
    delay: Duration,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            seen: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
        }
    }

    pub fn echo() -> Self {
        Self::new(Vec::new())
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// User inputs received, in call order
    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "Scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, ProviderError> {
        let input = request
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        self.seen.lock().push(input.clone());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let next = self.replies.lock().pop_front();
        match next {
            Some(Reply::Text(text)) => Ok(Completion {
                content: text.to_string(),
                usage: TokenUsage {
                    prompt: 20,
                    completion: 5,
                    total: 25,
                },
            }),
            Some(Reply::Fail(status, body)) => Err(ProviderError::Status {
                status,
                body: body.to_string(),
            }),
            Some(Reply::Panic(message)) => panic!("{message}"),
            None => Ok(Completion {
                content: format!("output of {input}"),
                usage: TokenUsage::default(),
            }),
        }
    }
}

/// A parsed metric-sink line
#[derive(Clone, Debug)]
pub struct MetricRecord {
    pub timestamp: String,
    pub session_id: String,
    pub kind: String,
    pub payload: Value,
}

pub fn read_metrics(path: &Path) -> Vec<MetricRecord> {
    let contents = std::fs::read_to_string(path).unwrap_or_default();
    contents
        .lines()
        .map(|line| {
            let mut fields = line.splitn(4, '|');
            MetricRecord {
                timestamp: fields.next().unwrap().to_string(),
                session_id: fields.next().unwrap().to_string(),
                kind: fields.next().unwrap().to_string(),
                payload: serde_json::from_str(fields.next().unwrap()).unwrap(),
            }
        })
        .collect()
}

/// Everything observable after a session
pub struct SessionRun {
    pub summary: SessionSummary,
    pub output: String,
    pub metrics: Vec<MetricRecord>,
    pub messages: String,
    _dir: tempfile::TempDir,
}

impl SessionRun {
    pub fn kinds(&self) -> Vec<&str> {
        self.metrics.iter().map(|m| m.kind.as_str()).collect()
    }

    pub fn of_kind(&self, kind: &str) -> Vec<&MetricRecord> {
        self.metrics.iter().filter(|m| m.kind == kind).collect()
    }
}

pub fn test_config() -> PipelineConfig {
    PipelineConfig {
        persona: "You are a Linux server.".to_string(),
        poll_interval: Duration::from_millis(50),
        ..PipelineConfig::default()
    }
}

/// Run a full session over `script` and collect its outputs
pub async fn run_session(script: &str, provider: Arc<dyn CompletionProvider>) -> SessionRun {
    run_session_with(script, provider, test_config()).await
}

pub async fn run_session_with(
    script: &str,
    provider: Arc<dyn CompletionProvider>,
    config: PipelineConfig,
) -> SessionRun {
    run_session_bytes(script.as_bytes(), provider, config).await
}

/// Like [`run_session_with`] but over raw bytes, for undecodable input
pub async fn run_session_bytes(
    script: &[u8],
    provider: Arc<dyn CompletionProvider>,
    config: PipelineConfig,
) -> SessionRun {
    let dir = tempfile::tempdir().unwrap();
    let session = Session::new();
    let log = Arc::new(EventLog::new(
        dir.path(),
        session.id.clone(),
        session.id.discriminator(),
    ));
    let capture = Capture::default();

    let controller = SessionController::new(
        session,
        config,
        provider,
        Arc::clone(&log),
        Console::new(capture.clone()),
    );
    let summary = controller.run(script).await;

    SessionRun {
        summary,
        output: capture.contents(),
        metrics: read_metrics(&log.metric_log_path().unwrap()),
        messages: std::fs::read_to_string(log.message_log_path().unwrap()).unwrap_or_default(),
        _dir: dir,
    }
}
