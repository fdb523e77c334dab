//! Context orchestration.
//!
//! Gathers metrics, commits, and traces for a service concurrently and merges
//! them into one [`AnalysisContext`]. Aggregation is best-effort: a failing
//! fetch is recorded and the others still contribute.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{AnalysisConfig, CommitsConfig, DiagnosisConfig};
use crate::error::{FetchError, FetchErrorKind, FetchSource, SourceError};
use crate::models::{AnalysisContext, CommitInfo, MetricsSummary, TimeWindow, TraceContext};
use crate::sources::{CommitSource, MetricsSource, TraceSource};

/// Number of fetch tasks spawned per preparation.
pub const FETCH_COUNT: usize = 3;

/// What one fetch task adds to the context. Each variant owns disjoint fields.
#[derive(Debug)]
enum Contribution {
    Metrics(MetricsSummary),
    Commits(Vec<CommitInfo>),
    Traces(TraceContext),
}

type Outcome = (FetchSource, Result<Contribution, FetchErrorKind>);

/// A prepared context together with every fetch that failed.
///
/// Errors are warnings: the context is still usable when some are present.
#[derive(Debug)]
pub struct PreparedContext {
    /// Whatever the fetches produced
    pub context: AnalysisContext,
    /// Failed fetches in the order they were observed
    pub errors: Vec<FetchError>,
}

impl PreparedContext {
    /// Whether every fetch succeeded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }

    /// The most recently observed fetch error.
    #[must_use]
    pub fn last_error(&self) -> Option<&FetchError> {
        self.errors.last()
    }

    /// Split into context and errors.
    #[must_use]
    pub fn into_parts(self) -> (AnalysisContext, Vec<FetchError>) {
        (self.context, self.errors)
    }
}

/// Coordinates concurrent data collection for one incident.
pub struct Orchestrator {
    metrics: Arc<dyn MetricsSource>,
    commits: Arc<dyn CommitSource>,
    traces: Option<Arc<dyn TraceSource>>,
    analysis: AnalysisConfig,
    repositories: CommitsConfig,
}

impl Orchestrator {
    /// Create an orchestrator without trace collection.
    #[must_use]
    pub fn new(
        metrics: Arc<dyn MetricsSource>,
        commits: Arc<dyn CommitSource>,
        analysis: AnalysisConfig,
    ) -> Self {
        Self {
            metrics,
            commits,
            traces: None,
            analysis,
            repositories: CommitsConfig::default(),
        }
    }

    /// Create an orchestrator from the full configuration.
    ///
    /// The trace source is dropped when tracing is disabled in `config`.
    #[must_use]
    pub fn from_config(
        metrics: Arc<dyn MetricsSource>,
        commits: Arc<dyn CommitSource>,
        traces: Option<Arc<dyn TraceSource>>,
        config: &DiagnosisConfig,
    ) -> Self {
        let mut orchestrator = Self::new(metrics, commits, config.analysis.clone())
            .with_repositories(config.commits.clone());
        if config.tracing.enabled {
            orchestrator.traces = traces;
        }
        orchestrator
    }

    /// Enable trace collection.
    #[must_use]
    pub fn with_traces(mut self, traces: Arc<dyn TraceSource>) -> Self {
        self.traces = Some(traces);
        self
    }

    /// Set the service to repository mapping.
    #[must_use]
    pub fn with_repositories(mut self, repositories: CommitsConfig) -> Self {
        self.repositories = repositories;
        self
    }

    /// Gather metrics, commits, and traces for `service` around `alert_time`.
    ///
    /// Windows are anchored to `alert_time`, never to the current time. Each
    /// fetch reports exactly once; when `cancel` fires, pending fetches
    /// report [`FetchErrorKind::Cancelled`] and the call returns.
    pub async fn prepare_context(
        &self,
        service: &str,
        alert_time: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> PreparedContext {
        info!(service = %service, alert_time = %alert_time, "Preparing context");

        let window = TimeWindow::ending_at(alert_time, self.analysis.metrics_window);
        let commits_since = TimeWindow::ending_at(alert_time, self.analysis.commits_lookback).start;

        let mut set: JoinSet<Outcome> = JoinSet::new();
        let mut task_sources = HashMap::with_capacity(FETCH_COUNT);

        let handle = set.spawn(guarded(
            cancel.clone(),
            FetchSource::Metrics,
            fetch_metrics(Arc::clone(&self.metrics), service.to_string(), window),
        ));
        task_sources.insert(handle.id(), FetchSource::Metrics);

        let handle = set.spawn(guarded(
            cancel.clone(),
            FetchSource::Commits,
            fetch_commits(
                Arc::clone(&self.commits),
                self.repositories.repository_for(service).to_string(),
                commits_since,
            ),
        ));
        task_sources.insert(handle.id(), FetchSource::Commits);

        let handle = set.spawn(guarded(
            cancel.clone(),
            FetchSource::Traces,
            fetch_traces(self.traces.clone(), service.to_string(), window),
        ));
        task_sources.insert(handle.id(), FetchSource::Traces);

        let mut context = AnalysisContext {
            service_name: service.to_string(),
            time_window: window,
            ..AnalysisContext::default()
        };
        let mut errors = Vec::new();

        while let Some(joined) = set.join_next_with_id().await {
            let (source, result) = match joined {
                Ok((_, outcome)) => outcome,
                Err(e) => {
                    // A panicking task still reports, attributed by task id.
                    let source = task_sources
                        .get(&e.id())
                        .copied()
                        .expect("every fetch task is registered at spawn");
                    (source, Err(FetchErrorKind::Panicked(e.to_string())))
                }
            };

            match result {
                Ok(Contribution::Metrics(metrics)) => context.metrics = metrics,
                Ok(Contribution::Commits(commits)) => context.recent_commits = commits,
                Ok(Contribution::Traces(traces)) => context.traces = traces,
                Err(kind) => {
                    let error = FetchError::new(source, kind);
                    warn!(service = %service, source = %source, error = %error, "Fetch failed");
                    errors.push(error);
                }
            }
        }

        info!(
            service = %service,
            commits = context.recent_commits.len(),
            traces = context.traces.trace_count,
            failed = errors.len(),
            "Context prepared"
        );

        PreparedContext { context, errors }
    }
}

/// Run `fetch` under the cancellation scope, reporting exactly one outcome.
async fn guarded<F>(cancel: CancellationToken, source: FetchSource, fetch: F) -> Outcome
where
    F: Future<Output = Result<Contribution, SourceError>>,
{
    let result = tokio::select! {
        biased;
        () = cancel.cancelled() => Err(FetchErrorKind::Cancelled),
        result = fetch => result.map_err(FetchErrorKind::from),
    };
    (source, result)
}

/// Query each golden signal independently.
///
/// A single failed query leaves its field empty; the fetch fails only when
/// every query failed.
async fn fetch_metrics(
    source: Arc<dyn MetricsSource>,
    service: String,
    window: TimeWindow,
) -> Result<Contribution, SourceError> {
    let (latency, error_rate, rps) = tokio::join!(
        source.latency_p99(&service, window.start, window.end),
        source.error_rate(&service, window.start, window.end),
        source.rps(&service, window.start, window.end),
    );

    let mut metrics = MetricsSummary::default();
    let mut failures = 0;
    let mut first_error = None;

    for (name, result, slot) in [
        ("latency_p99", latency, &mut metrics.latency_p99),
        ("error_rate", error_rate, &mut metrics.error_rate),
        ("rps", rps, &mut metrics.rps),
    ] {
        match result {
            Ok(value) => *slot = value,
            Err(e) => {
                warn!(service = %service, metric = name, error = %e, "Failed to query metric");
                failures += 1;
                first_error.get_or_insert(e);
            }
        }
    }

    match first_error {
        Some(e) if failures == 3 => Err(e),
        _ => Ok(Contribution::Metrics(metrics)),
    }
}

async fn fetch_commits(
    source: Arc<dyn CommitSource>,
    repo: String,
    since: DateTime<Utc>,
) -> Result<Contribution, SourceError> {
    let commits = source.fetch_commits(&repo, since).await?;
    debug!(repo = %repo, count = commits.len(), "Fetched commits");
    Ok(Contribution::Commits(commits))
}

async fn fetch_traces(
    source: Option<Arc<dyn TraceSource>>,
    service: String,
    window: TimeWindow,
) -> Result<Contribution, SourceError> {
    let Some(source) = source else {
        debug!(service = %service, "Tracing disabled, skipping trace fetch");
        return Ok(Contribution::Traces(TraceContext::default()));
    };
    let traces = source
        .fetch_trace_summary(&service, window.start, window.end)
        .await?;
    Ok(Contribution::Traces(traces))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FixedMetrics;

    #[async_trait]
    impl MetricsSource for FixedMetrics {
        async fn latency_p99(
            &self,
            _: &str,
            _: DateTime<Utc>,
            _: DateTime<Utc>,
        ) -> Result<Option<f64>, SourceError> {
            Ok(Some(840.0))
        }

        async fn error_rate(
            &self,
            _: &str,
            _: DateTime<Utc>,
            _: DateTime<Utc>,
        ) -> Result<Option<f64>, SourceError> {
            Err(SourceError::Query("timeout".to_string()))
        }

        async fn rps(
            &self,
            _: &str,
            _: DateTime<Utc>,
            _: DateTime<Utc>,
        ) -> Result<Option<f64>, SourceError> {
            Ok(Some(0.0))
        }
    }

    struct RecordingCommits {
        repos: std::sync::Mutex<Vec<(String, DateTime<Utc>)>>,
    }

    #[async_trait]
    impl CommitSource for RecordingCommits {
        async fn fetch_commits(
            &self,
            repo: &str,
            since: DateTime<Utc>,
        ) -> Result<Vec<CommitInfo>, SourceError> {
            self.repos.lock().unwrap().push((repo.to_string(), since));
            Ok(Vec::new())
        }
    }

    struct CountingTraces(AtomicUsize);

    #[async_trait]
    impl TraceSource for CountingTraces {
        async fn fetch_trace_summary(
            &self,
            _: &str,
            _: DateTime<Utc>,
            _: DateTime<Utc>,
        ) -> Result<TraceContext, SourceError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(TraceContext {
                trace_count: 4,
                ..TraceContext::default()
            })
        }
    }

    fn alert_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn commits() -> Arc<RecordingCommits> {
        Arc::new(RecordingCommits {
            repos: std::sync::Mutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn test_partial_metrics_are_kept() {
        let orchestrator =
            Orchestrator::new(Arc::new(FixedMetrics), commits(), AnalysisConfig::default());

        let prepared = orchestrator
            .prepare_context("checkout", alert_time(), &CancellationToken::new())
            .await;

        assert!(prepared.is_complete());
        let metrics = &prepared.context.metrics;
        assert_eq!(metrics.latency_p99, Some(840.0));
        assert_eq!(metrics.error_rate, None);
        assert_eq!(metrics.rps, Some(0.0));
    }

    #[tokio::test]
    async fn test_commit_repo_mapping_and_lookback() {
        let commits = commits();
        let orchestrator = Orchestrator::new(
            Arc::new(FixedMetrics),
            commits.clone(),
            AnalysisConfig::default(),
        )
        .with_repositories(CommitsConfig {
            repositories: HashMap::from([("checkout".to_string(), "acme/checkout".to_string())]),
        });

        orchestrator
            .prepare_context("checkout", alert_time(), &CancellationToken::new())
            .await;

        let calls = commits.repos.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "acme/checkout");
        assert_eq!(calls[0].1, alert_time() - chrono::TimeDelta::hours(24));
    }

    #[tokio::test]
    async fn test_tracing_disabled_in_config_skips_source() {
        let traces = Arc::new(CountingTraces(AtomicUsize::new(0)));
        let mut config = DiagnosisConfig::default();
        config.tracing.enabled = false;

        let orchestrator = Orchestrator::from_config(
            Arc::new(FixedMetrics),
            commits(),
            Some(traces.clone() as Arc<dyn TraceSource>),
            &config,
        );
        let prepared = orchestrator
            .prepare_context("checkout", alert_time(), &CancellationToken::new())
            .await;

        assert!(prepared.is_complete());
        assert_eq!(prepared.context.traces, TraceContext::default());
        assert_eq!(traces.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_enabled_traces_contribute() {
        let traces = Arc::new(CountingTraces(AtomicUsize::new(0)));
        let orchestrator =
            Orchestrator::new(Arc::new(FixedMetrics), commits(), AnalysisConfig::default())
                .with_traces(traces.clone());

        let prepared = orchestrator
            .prepare_context("checkout", alert_time(), &CancellationToken::new())
            .await;

        assert_eq!(prepared.context.traces.trace_count, 4);
        assert_eq!(traces.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_window_uses_configured_duration() {
        let analysis = AnalysisConfig {
            metrics_window: Duration::from_secs(5 * 60),
            ..AnalysisConfig::default()
        };
        let orchestrator = Orchestrator::new(Arc::new(FixedMetrics), commits(), analysis);

        let prepared = orchestrator
            .prepare_context("checkout", alert_time(), &CancellationToken::new())
            .await;

        let window = prepared.context.time_window;
        assert_eq!(window.end, alert_time());
        assert_eq!(window.start, alert_time() - chrono::TimeDelta::minutes(5));
        assert_eq!(window.duration, Duration::from_secs(300));
    }
}
