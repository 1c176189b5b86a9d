//! Completion provider error types.

use thiserror::Error;

/// Errors that can occur while requesting a completion.
///
/// All of these are recoverable at turn granularity.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network failure, timeout or other transport problem
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Endpoint answered with a non-success status
    #[error("provider returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, possibly empty
        body: String,
    },

    /// Body was not valid JSON
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    /// JSON was valid but lacked an expected field
    #[error("response missing field `{0}`")]
    MissingField(&'static str),

    /// The provider panicked while producing a completion
    #[error("provider panicked: {0}")]
    Panicked(String),
}
