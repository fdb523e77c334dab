//! Diagnostic data source contracts.
//!
//! The orchestrator only sees these traits; wire clients for each backend
//! system live behind them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::SourceError;
use crate::models::{CommitInfo, TraceContext};

/// Golden-signal metrics for a service.
///
/// `Ok(None)` means "no data", which is not the same as a zero reading.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// P99 latency in milliseconds.
    async fn latency_p99(
        &self,
        service: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<f64>, SourceError>;

    /// Error rate as a ratio of failed to total requests.
    async fn error_rate(
        &self,
        service: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<f64>, SourceError>;

    /// Requests per second.
    async fn rps(
        &self,
        service: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<f64>, SourceError>;
}

/// Source-control history.
#[async_trait]
pub trait CommitSource: Send + Sync {
    /// Commits on `repo` since `since`, newest first.
    async fn fetch_commits(
        &self,
        repo: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<CommitInfo>, SourceError>;
}

/// Distributed tracing backend.
#[async_trait]
pub trait TraceSource: Send + Sync {
    /// Slow and failing spans for `service` within the window.
    async fn fetch_trace_summary(
        &self,
        service: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<TraceContext, SourceError>;
}
