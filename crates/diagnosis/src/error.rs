//! Error types for the diagnosis pipeline.

use std::fmt;
use thiserror::Error;

use llm::BackendError;

/// Errors returned by a diagnostic data source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The source answered with a non-success status
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    /// The source rejected or failed the query
    #[error("query failed: {0}")]
    Query(String),

    /// The response could not be interpreted
    #[error("failed to parse response: {0}")]
    Parse(String),
}

/// Diagnostic data source a fetch task talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchSource {
    /// Golden-signal metrics
    Metrics,
    /// Source-control history
    Commits,
    /// Distributed traces
    Traces,
}

impl FetchSource {
    /// Get the source's name as a string.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Metrics => "metrics",
            Self::Commits => "commits",
            Self::Traces => "traces",
        }
    }
}

impl fmt::Display for FetchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a fetch task produced no contribution.
#[derive(Debug, Error)]
pub enum FetchErrorKind {
    /// The collaborator returned an error
    #[error(transparent)]
    Failed(#[from] SourceError),

    /// The caller's cancellation scope ended first
    #[error("cancelled")]
    Cancelled,

    /// The task panicked
    #[error("task panicked: {0}")]
    Panicked(String),
}

/// A non-fatal failure of one fetch during context preparation.
#[derive(Debug, Error)]
#[error("{data_source} fetch failed: {kind}")]
pub struct FetchError {
    /// Which fetch failed
    pub data_source: FetchSource,
    /// What went wrong
    #[source]
    pub kind: FetchErrorKind,
}

impl FetchError {
    /// Create a fetch error for `data_source`.
    pub fn new(data_source: FetchSource, kind: impl Into<FetchErrorKind>) -> Self {
        Self {
            data_source,
            kind: kind.into(),
        }
    }

    /// Whether the fetch was cut short by cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self.kind, FetchErrorKind::Cancelled)
    }
}

/// Errors from the analysis engine.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The backend call failed
    #[error("LLM analysis failed: {0}")]
    Backend(#[from] BackendError),

    /// The caller's cancellation scope ended first
    #[error("analysis cancelled")]
    Cancelled,
}

/// Errors from postmortem generation.
#[derive(Debug, Error)]
pub enum PostmortemError {
    /// The backend call failed
    #[error("postmortem generation failed: {0}")]
    Backend(#[from] BackendError),

    /// The caller's cancellation scope ended first
    #[error("postmortem generation cancelled")]
    Cancelled,
}

/// Errors loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid YAML for the config schema
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A value is out of range
    #[error("invalid config: {0}")]
    Invalid(String),
}
