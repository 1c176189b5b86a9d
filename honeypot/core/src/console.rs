//! Console Output
//!
//! Shared handle to the impersonated terminal. The controller and the
//! pipeline worker both print through it; the lock keeps every printed block
//! whole.

use std::io::{self, Write};
use std::sync::Arc;

use parking_lot::Mutex;

/// Cloneable, thread-safe terminal writer
#[derive(Clone)]
pub struct Console {
    out: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl Console {
    /// Console backed by process stdout
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// Console backed by any writer
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            out: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// Print a block of text followed by a newline and flush.
    ///
    /// Failures (closed stdout) are ignored.
    pub fn print_line(&self, text: &str) {
        let mut out = self.out.lock();
        let result = writeln!(out, "{text}").and_then(|()| out.flush());
        if let Err(e) = result {
            tracing::debug!(error = %e, "Console write failed");
        }
    }
}

impl std::fmt::Debug for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console").finish_non_exhaustive()
    }
}
