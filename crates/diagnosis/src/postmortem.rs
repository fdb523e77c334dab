//! Postmortem composition for resolved incidents.
//!
//! The backend writes the narrative; the remediation rules contribute a
//! deterministic "Suggested Fixes" section appended after it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use llm::AnalysisBackend;

use crate::error::PostmortemError;
use crate::models::AnalysisContext;
use crate::prompt;
use crate::remediation::{RuleEngine, Suggestion};

/// Suggestions rendered into the markdown document.
pub const RENDERED_SUGGESTION_LIMIT: usize = 3;

/// A finished postmortem document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Postmortem {
    /// Unique postmortem ID
    pub id: String,
    /// Incident title, `Incident: <alert> on <service>`
    pub incident_name: String,
    /// Resolution time
    pub date: DateTime<Utc>,
    /// Time from first firing to resolution
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
    /// Rendered markdown document
    pub markdown: String,
    /// Every matched suggestion, including ones not rendered
    pub suggestions: Vec<Suggestion>,
}

/// Writes postmortems from a backend narrative plus rule suggestions.
pub struct PostmortemGenerator {
    backend: Arc<dyn AnalysisBackend>,
    rules: RuleEngine,
}

impl PostmortemGenerator {
    /// Create a generator.
    #[must_use]
    pub fn new(backend: Arc<dyn AnalysisBackend>, rules: RuleEngine) -> Self {
        Self { backend, rules }
    }

    /// Compose a postmortem for an incident resolved now.
    pub async fn generate(
        &self,
        ctx: &AnalysisContext,
        cancel: &CancellationToken,
    ) -> Result<Postmortem, PostmortemError> {
        self.generate_at(ctx, Utc::now(), cancel).await
    }

    /// Compose a postmortem for an incident resolved at `resolved_at`.
    ///
    /// Nothing is produced when the backend call fails.
    pub async fn generate_at(
        &self,
        ctx: &AnalysisContext,
        resolved_at: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<Postmortem, PostmortemError> {
        let duration = incident_duration(ctx.alert.started_at, resolved_at);
        info!(
            alert = %ctx.alert.name,
            service = %ctx.service_name,
            duration = %prompt::format_duration(duration),
            "Generating postmortem"
        );

        let request = prompt::postmortem_prompt(ctx, resolved_at, duration);
        let narrative = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(PostmortemError::Cancelled),
            result = self.backend.analyze(&request) => result.map_err(|e| {
                warn!(backend = self.backend.name(), error = %e, "Postmortem backend failed");
                PostmortemError::from(e)
            })?,
        };

        let incident_name = incident_name(ctx);
        let suggestions = self.rules.suggestions(&ctx.alert);
        let markdown = render_markdown(
            &incident_name,
            resolved_at,
            duration,
            &narrative,
            &suggestions,
        );

        Ok(Postmortem {
            id: uuid::Uuid::new_v4().to_string(),
            incident_name,
            date: resolved_at,
            duration,
            markdown,
            suggestions,
        })
    }
}

/// Time between `started_at` and `resolved_at`, zero if resolution came first.
#[must_use]
pub fn incident_duration(started_at: DateTime<Utc>, resolved_at: DateTime<Utc>) -> Duration {
    (resolved_at - started_at).to_std().unwrap_or(Duration::ZERO)
}

/// Title of the incident, e.g. `Incident: HighLatency on checkout`.
#[must_use]
pub fn incident_name(ctx: &AnalysisContext) -> String {
    format!("Incident: {} on {}", ctx.alert.name, ctx.service_name)
}

fn render_markdown(
    incident_name: &str,
    resolved_at: DateTime<Utc>,
    duration: Duration,
    narrative: &str,
    suggestions: &[Suggestion],
) -> String {
    let mut md = format!(
        "# {}\n\n**Date:** {}\n**Duration:** {}\n\n{}\n\n## Suggested Fixes\n\n",
        incident_name,
        resolved_at.format("%Y-%m-%d %H:%M:%S"),
        prompt::format_duration(duration),
        narrative.trim_end(),
    );

    if suggestions.is_empty() {
        md.push_str("No remediation rules matched this alert.\n");
        return md;
    }

    for s in suggestions.iter().take(RENDERED_SUGGESTION_LIMIT) {
        let _ = write!(
            md,
            "### {}\n{}\n\n```bash\n{}\n```\n\n",
            s.title, s.description, s.action
        );
    }
    md
}
