//! Error types for analysis backends.

use thiserror::Error;

/// Errors that can occur when constructing or invoking a backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status
    #[error("{provider} API error (status {status}): {message}")]
    Api {
        provider: &'static str,
        status: u16,
        message: String,
    },

    /// The provider answered but produced no text
    #[error("{0} returned no content")]
    EmptyResponse(&'static str),

    /// A hosted provider was selected without an API key
    #[error("{provider} API key is required (set {env_var})")]
    MissingCredential {
        provider: &'static str,
        env_var: &'static str,
    },

    /// The configured discriminator names no known backend
    #[error("unsupported provider: {0}")]
    UnsupportedProvider(String),
}

/// Result alias for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;
