//! Intent resolution error types.

use thiserror::Error;

/// Errors from the embedding collaborator. Never fatal: the resolver logs
/// them and falls back to fixed-command matching.
#[derive(Debug, Error)]
pub enum IntentError {
    /// HTTP request failed.
    #[error("embedding request failed: {0}")]
    RequestFailed(String),

    /// The service answered with something other than an embedding.
    #[error("malformed embedding response: {0}")]
    Malformed(String),

    /// The call took longer than the configured budget.
    #[error("embedding request timed out after {0}ms")]
    Timeout(u64),

    /// Nothing is listening at the configured endpoint.
    #[error("embedding service unavailable: {0}")]
    Unavailable(String),

    /// Bad `[intent]` settings.
    #[error("intent configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for IntentError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            IntentError::Timeout(0)
        } else if err.is_connect() {
            IntentError::Unavailable(err.to_string())
        } else if err.is_decode() {
            IntentError::Malformed(err.to_string())
        } else {
            IntentError::RequestFailed(err.to_string())
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, IntentError>;
