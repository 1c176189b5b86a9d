//! Configuration
//!
//! Centralized configuration loading for the honeypot, with an optional TOML
//! file at `$XDG_CONFIG_HOME/honeypot/honeypot.toml`.
//!
//! # Configuration Priority
//!
//! Values are resolved with the following priority (highest first):
//! 1. CLI arguments ([`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [provider]
//! api_url = "https://openrouter.ai/api/v1/chat/completions"
//! model = "openai/gpt-4o"
//! max_tokens = 2000
//! request_timeout_secs = 120
//!
//! [session]
//! name = "lab-east"
//! persona_file = "/etc/honeypot/persona.txt"
//! prompt = "remote@omegablack>$"
//! keep_history = false
//! poll_interval_ms = 1000
//!
//! [log]
//! dir = "/var/log/honeypot"
//! ```
//!
//! The persona text is passed to the provider unchanged; it is never parsed.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::DEFAULT_API_URL;
use crate::pipeline::PipelineConfig;
use crate::session::SessionId;

/// Persona used when none is configured
pub const DEFAULT_PERSONA: &str = "You are \"Omega-Black\", a Linux server running Bash. \
Reply only with the exact output a real terminal would print for each command, \
including error messages and the prompt `remote@omegablack:~$`. \
Never explain, never break character, and never mention being an AI.";

/// Session name that means "no override"
const DEFAULT_SESSION_NAME: &str = "default";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a config or persona file
    #[error("Failed to read {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where the configuration came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// `[provider]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderToml {
    /// Chat-completion endpoint
    pub api_url: Option<String>,
    /// Model identifier
    pub model: Option<String>,
    /// Upper bound on generated tokens
    pub max_tokens: Option<u32>,
    /// Per-request timeout in seconds
    pub request_timeout_secs: Option<u64>,
}

/// `[session]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionToml {
    /// Session-name override used in log file names
    pub name: Option<String>,
    /// Inline persona text
    pub persona: Option<String>,
    /// File holding the persona text (wins over `persona`)
    pub persona_file: Option<PathBuf>,
    /// Prompt printed after replies
    pub prompt: Option<String>,
    /// Send prior exchanges with each request
    pub keep_history: Option<bool>,
    /// Worker wake-up fallback in milliseconds
    pub poll_interval_ms: Option<u64>,
}

/// `[log]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LogToml {
    /// Directory for the event log files
    pub dir: Option<PathBuf>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HoneypotToml {
    /// Provider section
    pub provider: ProviderToml,
    /// Session section
    pub session: SessionToml,
    /// Log section
    pub log: LogToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Resolved honeypot configuration
#[derive(Clone, Debug)]
pub struct HoneypotConfig {
    /// Chat-completion endpoint
    pub api_url: String,
    /// Bearer credential (environment only)
    pub api_key: Option<String>,
    /// Model identifier
    pub model: String,
    /// Upper bound on generated tokens
    pub max_tokens: u32,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Opaque persona instruction
    pub persona: String,
    /// Session-name override for log file names
    pub session_name: Option<String>,
    /// Prompt printed at start and after each reply
    pub prompt: String,
    /// Thread conversation history through requests
    pub keep_history: bool,
    /// Worker wake-up fallback
    pub poll_interval: Duration,
    /// Directory for event log files
    pub log_dir: PathBuf,
    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,
    source: ConfigSource,
}

impl Default for HoneypotConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: None,
            model: "openai/gpt-4o".to_string(),
            max_tokens: 2000,
            request_timeout: Duration::from_secs(120),
            persona: DEFAULT_PERSONA.to_string(),
            session_name: None,
            prompt: "remote@omegablack>$".to_string(),
            keep_history: false,
            poll_interval: Duration::from_secs(1),
            log_dir: PathBuf::from("."),
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl HoneypotConfig {
    /// Get the highest-priority source that contributed a value
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Discriminator for log file names: the session name, or the short ID
    #[must_use]
    pub fn log_discriminator(&self, session_id: &SessionId) -> String {
        self.session_name
            .clone()
            .unwrap_or_else(|| session_id.discriminator().to_string())
    }

    /// Settings for the pipeline worker
    #[must_use]
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            persona: self.persona.clone(),
            prompt: self.prompt.clone(),
            poll_interval: self.poll_interval,
            keep_history: self.keep_history,
        }
    }

    /// Check value ranges
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] naming the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::ValidationError("model must not be empty".into()));
        }
        if self.api_url.trim().is_empty() {
            return Err(ConfigError::ValidationError("api_url must not be empty".into()));
        }
        if self.max_tokens == 0 {
            return Err(ConfigError::ValidationError("max_tokens must be greater than 0".into()));
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::ValidationError(
                "poll_interval_ms must be greater than 0".into(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "request_timeout_secs must be greater than 0".into(),
            ));
        }
        if let Some(ref name) = self.session_name {
            // The name becomes part of a file name inside log_dir
            if name.contains(['/', '\\']) || name.contains("..") {
                return Err(ConfigError::ValidationError(format!(
                    "session name {name:?} must not contain path separators or '..'"
                )));
            }
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/honeypot/honeypot.toml` or
/// `~/.config/honeypot/honeypot.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("honeypot").join("honeypot.toml"))
}

/// Load configuration from the default path plus the process environment
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be read or parsed.
pub fn load_config() -> Result<HoneypotConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path plus the process environment
///
/// A missing file is not an error (defaults are used).
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed, or if a
/// referenced persona file cannot be read.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<HoneypotConfig, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Load configuration with a custom environment lookup
///
/// # Errors
///
/// Same as [`load_config_from_path`].
pub fn load_config_with_env(
    path: Option<PathBuf>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<HoneypotConfig, ConfigError> {
    let mut config = HoneypotConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: HoneypotToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config)?;
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(path = %config_path.display(), "Loaded configuration from file");
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config, env);

    Ok(config)
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut HoneypotConfig, toml: &HoneypotToml) -> Result<(), ConfigError> {
    if let Some(ref url) = toml.provider.api_url {
        config.api_url = url.clone();
    }
    if let Some(ref model) = toml.provider.model {
        config.model = model.clone();
    }
    if let Some(max_tokens) = toml.provider.max_tokens {
        config.max_tokens = max_tokens;
    }
    if let Some(secs) = toml.provider.request_timeout_secs {
        config.request_timeout = Duration::from_secs(secs);
    }

    if let Some(ref name) = toml.session.name {
        config.session_name = normalize_session_name(name);
    }
    if let Some(ref persona) = toml.session.persona {
        config.persona = persona.clone();
    }
    if let Some(ref persona_file) = toml.session.persona_file {
        config.persona = read_persona(persona_file)?;
    }
    if let Some(ref prompt) = toml.session.prompt {
        config.prompt = prompt.clone();
    }
    if let Some(keep) = toml.session.keep_history {
        config.keep_history = keep;
    }
    if let Some(ms) = toml.session.poll_interval_ms {
        config.poll_interval = Duration::from_millis(ms);
    }

    if let Some(ref dir) = toml.log.dir {
        config.log_dir = dir.clone();
    }

    Ok(())
}

/// Apply environment variable overrides to the config
fn apply_env_config(config: &mut HoneypotConfig, env: impl Fn(&str) -> Option<String>) {
    if let Some(key) = env("OPENROUTER_API_KEY").filter(|k| !k.trim().is_empty()) {
        config.api_key = Some(key);
        config.source = ConfigSource::Env;
    }
    if let Some(url) = env("HONEYPOT_API_URL") {
        config.api_url = url;
        config.source = ConfigSource::Env;
    }
    if let Some(model) = env("HONEYPOT_MODEL") {
        config.model = model;
        config.source = ConfigSource::Env;
    }
    if let Some(n) = env("HONEYPOT_MAX_TOKENS").and_then(|v| v.parse::<u32>().ok()) {
        config.max_tokens = n;
        config.source = ConfigSource::Env;
    }
    if let Some(secs) = env("HONEYPOT_REQUEST_TIMEOUT_SECS").and_then(|v| v.parse::<u64>().ok()) {
        config.request_timeout = Duration::from_secs(secs);
        config.source = ConfigSource::Env;
    }
    if let Some(persona) = env("HONEYPOT_PERSONA") {
        config.persona = persona;
        config.source = ConfigSource::Env;
    }
    if let Some(name) = env("SESSION_NAME") {
        config.session_name = normalize_session_name(&name);
        config.source = ConfigSource::Env;
    }
    if let Some(prompt) = env("HONEYPOT_PROMPT") {
        config.prompt = prompt;
        config.source = ConfigSource::Env;
    }
    if let Some(keep) = env("HONEYPOT_KEEP_HISTORY") {
        config.keep_history = keep == "1" || keep.eq_ignore_ascii_case("true");
        config.source = ConfigSource::Env;
    }
    if let Some(ms) = env("HONEYPOT_POLL_INTERVAL_MS").and_then(|v| v.parse::<u64>().ok()) {
        config.poll_interval = Duration::from_millis(ms);
        config.source = ConfigSource::Env;
    }
    if let Some(dir) = env("HONEYPOT_LOG_DIR") {
        config.log_dir = PathBuf::from(dir);
        config.source = ConfigSource::Env;
    }
}

fn normalize_session_name(name: &str) -> Option<String> {
    let name = name.trim();
    if name.is_empty() || name == DEFAULT_SESSION_NAME {
        None
    } else {
        Some(name.to_string())
    }
}

fn read_persona(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Model override
    pub model: Option<String>,
    /// Log directory override
    pub log_dir: Option<PathBuf>,
    /// Session-name override
    pub session_name: Option<String>,
    /// Persona file override
    pub persona_file: Option<PathBuf>,
    /// Enable conversation history
    pub keep_history: Option<bool>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set model override
    #[must_use]
    pub fn with_model(mut self, model: String) -> Self {
        self.model = Some(model);
        self
    }

    /// Set log directory override
    #[must_use]
    pub fn with_log_dir(mut self, dir: PathBuf) -> Self {
        self.log_dir = Some(dir);
        self
    }

    /// Set session-name override
    #[must_use]
    pub fn with_session_name(mut self, name: String) -> Self {
        self.session_name = Some(name);
        self
    }

    /// Set persona file override
    #[must_use]
    pub fn with_persona_file(mut self, path: PathBuf) -> Self {
        self.persona_file = Some(path);
        self
    }

    /// Set conversation history override
    #[must_use]
    pub fn with_keep_history(mut self, keep: bool) -> Self {
        self.keep_history = Some(keep);
        self
    }

    /// Apply overrides to a configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the persona file cannot be read.
    pub fn apply(&self, config: &mut HoneypotConfig) -> Result<(), ConfigError> {
        if self.model.is_some()
            || self.log_dir.is_some()
            || self.session_name.is_some()
            || self.persona_file.is_some()
            || self.keep_history.is_some()
        {
            config.source = ConfigSource::Cli;
        }

        if let Some(ref model) = self.model {
            config.model = model.clone();
        }
        if let Some(ref dir) = self.log_dir {
            config.log_dir = dir.clone();
        }
        if let Some(ref name) = self.session_name {
            config.session_name = normalize_session_name(name);
        }
        if let Some(ref path) = self.persona_file {
            config.persona = read_persona(path)?;
        }
        if let Some(keep) = self.keep_history {
            config.keep_history = keep;
        }

        Ok(())
    }
}
