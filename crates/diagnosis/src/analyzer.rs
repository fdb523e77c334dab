//! Root-cause analysis.
//!
//! Turns an alert (rapid triage) or a prepared [`AnalysisContext`] (deep
//! analysis) into a prompt, sends it to the configured backend, and shapes
//! the narrative into an [`AnalysisResult`].

use chrono::Utc;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use llm::AnalysisBackend;

use crate::error::AnalysisError;
use crate::models::{Alert, AnalysisContext, AnalysisResult, CommitInfo, Confidence, MetricsSummary};
use crate::prompt;

/// Root-cause analyzer bound to one backend.
pub struct Analyzer {
    backend: Arc<dyn AnalysisBackend>,
}

impl Analyzer {
    /// Create an analyzer for the given backend.
    #[must_use]
    pub fn new(backend: Arc<dyn AnalysisBackend>) -> Self {
        Self { backend }
    }

    /// Name of the backend this analyzer calls.
    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Rapid triage from the alert alone.
    pub async fn analyze(
        &self,
        alert: &Alert,
        cancel: &CancellationToken,
    ) -> Result<AnalysisResult, AnalysisError> {
        info!(
            alert = %alert.name(),
            service = %alert.service_name(),
            backend = self.backend.name(),
            "Running triage analysis"
        );

        let narrative = self.call(&prompt::triage_prompt(alert), cancel).await?;

        Ok(self.shape(
            alert.service_name(),
            alert.name(),
            alert.severity(),
            alert.summary(),
            narrative,
            MetricsSummary::default(),
            Vec::new(),
        ))
    }

    /// Deep analysis over metrics, commits, and traces.
    pub async fn analyze_with_context(
        &self,
        ctx: &AnalysisContext,
        cancel: &CancellationToken,
    ) -> Result<AnalysisResult, AnalysisError> {
        info!(
            alert = %ctx.alert.name,
            service = %ctx.service_name,
            commits = ctx.recent_commits.len(),
            backend = self.backend.name(),
            "Running context analysis"
        );

        let narrative = self.call(&prompt::context_prompt(ctx), cancel).await?;

        Ok(self.shape(
            &ctx.service_name,
            &ctx.alert.name,
            &ctx.alert.severity,
            &ctx.alert.summary,
            narrative,
            ctx.metrics.clone(),
            ctx.recent_commits.clone(),
        ))
    }

    async fn call(&self, prompt: &str, cancel: &CancellationToken) -> Result<String, AnalysisError> {
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(AnalysisError::Cancelled),
            result = self.backend.analyze(prompt) => result,
        };

        result.map_err(|e| {
            warn!(backend = self.backend.name(), error = %e, "Analysis backend failed");
            AnalysisError::from(e)
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn shape(
        &self,
        service_name: &str,
        alert_name: &str,
        severity: &str,
        summary: &str,
        narrative: String,
        metrics: MetricsSummary,
        commits: Vec<CommitInfo>,
    ) -> AnalysisResult {
        AnalysisResult {
            id: uuid::Uuid::new_v4().to_string(),
            service_name: service_name.to_string(),
            alert_name: alert_name.to_string(),
            severity: severity.to_string(),
            summary: summary.to_string(),
            root_cause: narrative,
            confidence: Confidence::Medium,
            next_steps: Vec::new(),
            metrics,
            commits,
            backend: self.backend.name().to_string(),
            analyzed_at: Utc::now(),
        }
    }
}
