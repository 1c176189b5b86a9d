//! Honeypot Console - Interactive entry point
//!
//! Presents the impersonated `omegablack` shell on stdin/stdout. Every line is
//! screened, answered by the configured chat-completion model, and recorded in
//! the session's event log. Diagnostics go to stderr.
//!
//! # Usage
//!
//! ```bash
//! # Start with defaults (logs in the current directory)
//! OPENROUTER_API_KEY=sk-... honeypot
//!
//! # Named session, logs elsewhere, history threaded through requests
//! honeypot --session-name decoy-01 --log-dir /var/log/honeypot --keep-history
//!
//! # Custom persona and model
//! honeypot --persona-file ./persona.txt --model anthropic/claude-3.5-sonnet
//!
//! # Verbose diagnostics
//! RUST_LOG=debug honeypot
//! ```
//!
//! # Signals
//!
//! - `SIGINT` (Ctrl+C): stop reading, drain queued input, write `SessionEnd`
//!
//! # Exit status
//!
//! `0` for `exit`, end of input, or interrupt; `1` when reading input failed.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::BufReader;
use tokio::sync::Notify;
use tracing::{info, warn};

use honeypot_core::{
    default_config_path, load_config_from_path, ConfigOverrides, Console, EventLog,
    OpenRouterBackend, Session, SessionController,
};

/// omegablack - LLM-backed terminal honeypot
#[derive(Parser, Debug)]
#[command(name = "honeypot")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, env = "HONEYPOT_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Model identifier sent to the provider
    #[arg(short = 'm', long, value_name = "MODEL")]
    model: Option<String>,

    /// Directory for the app and metrics log files
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Name used in log file names instead of the session ID prefix
    #[arg(short = 's', long, value_name = "NAME")]
    session_name: Option<String>,

    /// File holding the persona instruction
    #[arg(short = 'p', long, value_name = "FILE")]
    persona_file: Option<PathBuf>,

    /// Send prior exchanges with every request
    #[arg(long)]
    keep_history: bool,

    /// Diagnostic log level when RUST_LOG is unset
    #[arg(short = 'l', long, env = "HONEYPOT_LOG_LEVEL", default_value = "warn")]
    log_level: String,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides::new();
        if let Some(ref model) = self.model {
            overrides = overrides.with_model(model.clone());
        }
        if let Some(ref dir) = self.log_dir {
            overrides = overrides.with_log_dir(dir.clone());
        }
        if let Some(ref name) = self.session_name {
            overrides = overrides.with_session_name(name.clone());
        }
        if let Some(ref path) = self.persona_file {
            overrides = overrides.with_persona_file(path.clone());
        }
        if self.keep_history {
            overrides = overrides.with_keep_history(true);
        }
        overrides
    }
}

/// Diagnostics on stderr; stdout belongs to the impersonated terminal
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "honeypot_console={level},honeypot_core={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let config_path = args.config.clone().or_else(default_config_path);
    let mut config = load_config_from_path(config_path.clone())
        .with_context(|| format!("Failed to load configuration from {config_path:?}"))?;
    args.overrides()
        .apply(&mut config)
        .context("Failed to apply command-line options")?;
    config.validate().context("Invalid configuration")?;

    info!(
        source = %config.source(),
        model = %config.model,
        api_url = %config.api_url,
        log_dir = ?config.log_dir,
        keep_history = config.keep_history,
        "Configuration loaded"
    );
    if config.api_key.is_none() {
        warn!("OPENROUTER_API_KEY is not set; provider requests will be rejected");
    }

    let backend = OpenRouterBackend::new(
        config.api_url.clone(),
        config.api_key.clone(),
        config.request_timeout,
    )
    .context("Failed to build HTTP client")?;

    let session = Session::new();
    let log = Arc::new(EventLog::new(
        &config.log_dir,
        session.id.clone(),
        &config.log_discriminator(&session.id),
    ));

    let interrupt = Arc::new(Notify::new());
    {
        let interrupt = Arc::clone(&interrupt);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Interrupt received");
                    interrupt.notify_one();
                }
                Err(e) => warn!(error = %e, "Failed to listen for Ctrl+C"),
            }
        });
    }

    let summary = SessionController::new(
        session,
        config.pipeline_config(),
        Arc::new(backend),
        log,
        Console::stdout(),
    )
    .with_interrupt(interrupt)
    .run(BufReader::new(tokio::io::stdin()))
    .await;

    info!(
        session_id = %summary.session_id,
        total_messages = summary.total_messages,
        reason = ?summary.termination,
        "Session finished"
    );

    let code = i32::from(summary.termination.is_error());

    // A stdin read may still be parked on the blocking pool after an
    // interrupt; leaving through the runtime would wait for it.
    std::process::exit(code);
}
