//! Session Pipeline
//!
//! Single-producer/single-consumer hand-off between the input loop and the
//! response worker.
//!
//! ```text
//!   controller ──submit──▶ [ VecDeque<PendingInput> ] ──pop──▶ worker
//!        │                          ▲                           │
//!        └──────── wake (Notify) ───┘             provider ◀────┤
//!                                                 console  ◀────┤
//!                                                 event log◀────┘
//! ```
//!
//! - `submit` never blocks and never fails; the queue is unbounded
//! - The worker waits for a wake-up or `poll_interval`, whichever comes
//!   first, then drains every queued item in FIFO order
//! - Exactly one provider call is in flight, so replies and log records
//!   follow submission order
//! - Provider failures, panics included, end the turn, not the worker
//! - On shutdown the worker keeps draining until the queue is empty

use std::any::Any;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::backend::{CompletionProvider, CompletionRequest, ProviderError};
use crate::console::Console;
use crate::event_log::EventLog;
use crate::session::{build_conversation, ConversationHistory};
use crate::turn::{PendingInput, Turn};

/// Shared running flag for cooperative shutdown.
///
/// The controller clears it; the worker reads it after every drain pass.
#[derive(Clone, Debug)]
pub struct RunningFlag(Arc<AtomicBool>);

impl RunningFlag {
    /// Create a flag in the running state
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    /// Check whether the session is still accepting input
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Request shutdown
    pub fn stop(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Default for RunningFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Settings the worker needs for each turn
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Model identifier sent to the provider
    pub model: String,
    /// Upper bound on generated tokens
    pub max_tokens: u32,
    /// Opaque system-role instruction
    pub persona: String,
    /// Prompt printed after each reply
    pub prompt: String,
    /// Longest the worker sleeps without a wake-up
    pub poll_interval: Duration,
    /// Send prior exchanges along with each request
    pub keep_history: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model: "openai/gpt-4o".to_string(),
            max_tokens: 2000,
            persona: String::new(),
            prompt: "remote@omegablack>$".to_string(),
            poll_interval: Duration::from_secs(1),
            keep_history: false,
        }
    }
}

/// Queue plus wake signal shared by controller and worker
struct Shared {
    queue: Mutex<VecDeque<PendingInput>>,
    wake: Notify,
}

impl Shared {
    fn pop(&self) -> Option<PendingInput> {
        self.queue.lock().pop_front()
    }

    fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}

/// Handle to the input queue and its worker task
pub struct SessionPipeline {
    shared: Arc<Shared>,
    running: RunningFlag,
    worker: Option<JoinHandle<()>>,
}

impl SessionPipeline {
    /// Spawn the worker on the current tokio runtime
    pub fn start(
        config: PipelineConfig,
        provider: Arc<dyn CompletionProvider>,
        log: Arc<EventLog>,
        console: Console,
        running: RunningFlag,
    ) -> Self {
        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::new()),
            wake: Notify::new(),
        });

        let worker = Worker {
            history: config.keep_history.then(ConversationHistory::new),
            shared: Arc::clone(&shared),
            running: running.clone(),
            provider,
            log,
            console,
            config,
        };

        tracing::debug!(provider = worker.provider.name(), "Starting pipeline worker");
        let handle = tokio::spawn(worker.run());

        Self {
            shared,
            running,
            worker: Some(handle),
        }
    }

    /// Queue an accepted input and wake the worker
    pub fn submit(&self, input: PendingInput) {
        self.shared.queue.lock().push_back(input);
        self.shared.wake.notify_one();
    }

    /// Inputs waiting for the worker
    #[must_use]
    pub fn pending(&self) -> usize {
        self.shared.queue.lock().len()
    }

    /// Stop accepting work, let the worker drain the queue, and wait for it
    pub async fn shutdown(mut self) {
        self.running.stop();
        self.shared.wake.notify_one();

        tracing::debug!(pending = self.pending(), "Draining input queue");

        if let Some(handle) = self.worker.take() {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Pipeline worker terminated abnormally");
            }
        }
    }
}

impl Drop for SessionPipeline {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.running.stop();
            self.shared.wake.notify_one();
        }
    }
}

/// The single consumer of the input queue
struct Worker {
    shared: Arc<Shared>,
    running: RunningFlag,
    provider: Arc<dyn CompletionProvider>,
    log: Arc<EventLog>,
    console: Console,
    config: PipelineConfig,
    history: Option<ConversationHistory>,
}

impl Worker {
    async fn run(mut self) {
        loop {
            // Timeout lets the worker notice shutdown without a final wake
            let _ = tokio::time::timeout(self.config.poll_interval, self.shared.wake.notified())
                .await;

            while let Some(input) = self.shared.pop() {
                self.process(input).await;
            }

            if !self.running.is_running() && self.shared.is_empty() {
                break;
            }
        }

        tracing::debug!("Pipeline worker stopped");
    }

    async fn process(&mut self, input: PendingInput) {
        let request = CompletionRequest::new(self.config.model.clone())
            .with_messages(build_conversation(
                &self.config.persona,
                self.history.as_ref(),
                &input.text,
            ))
            .with_max_tokens(self.config.max_tokens);

        let start = Instant::now();
        let result = AssertUnwindSafe(self.provider.complete(&request))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(panic_reason(&*payload)));
        let elapsed = start.elapsed();

        let turn = match result {
            Ok(completion) => {
                if let Some(history) = self.history.as_mut() {
                    history.record_exchange(&input.text, &completion.content);
                }
                Turn::answered(input, completion, elapsed)
            }
            Err(e) => {
                tracing::warn!(error = %e, input = %input.text, "Completion failed");
                Turn::failed(input, e.to_string(), elapsed)
            }
        };

        self.console.print_line(&turn.terminal_text(&self.config.prompt));
        turn.record(&self.log, &self.config.prompt);
    }
}

/// A panicking provider fails its turn; the worker keeps draining
fn panic_reason(payload: &(dyn Any + Send)) -> ProviderError {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    tracing::error!(panic = %message, "Completion provider panicked");
    ProviderError::Panicked(message)
}
