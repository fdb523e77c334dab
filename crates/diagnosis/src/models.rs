//! Core data structures shared by the diagnosis pipeline.
//!
//! This module defines:
//! - Alertmanager alerts and the immutable [`AlertInfo`] snapshot
//! - Diagnostic signals (metrics, commits, traces) and their time window
//! - The aggregated [`AnalysisContext`] and the [`AnalysisResult`] record

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::Duration;

/// Alertmanager webhook payload.
///
/// Reference: <https://prometheus.io/docs/alerting/latest/configuration/#webhook_config>
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertmanagerPayload {
    /// Version of the payload format
    #[serde(default)]
    pub version: String,
    /// Unique identifier for this group of alerts
    #[serde(default)]
    pub group_key: String,
    /// Status: "firing" or "resolved"
    pub status: String,
    /// Receiver that matched this alert
    #[serde(default)]
    pub receiver: String,
    /// Labels common to all alerts
    #[serde(default)]
    pub common_labels: HashMap<String, String>,
    /// List of alerts in this notification
    pub alerts: Vec<Alert>,
}

/// Individual alert from Alertmanager.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    /// Status: "firing" or "resolved"
    pub status: String,
    /// Alert labels
    #[serde(default)]
    pub labels: HashMap<String, String>,
    /// Alert annotations
    #[serde(default)]
    pub annotations: HashMap<String, String>,
    /// When the alert started firing
    pub starts_at: DateTime<Utc>,
    /// When the alert was resolved (if resolved)
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
    /// URL to the alert's source expression
    #[serde(default, rename = "generatorURL")]
    pub generator_url: String,
    /// Unique fingerprint for this alert
    #[serde(default)]
    pub fingerprint: String,
}

impl Alert {
    /// Get the alert name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.labels.get("alertname").map_or("unknown", String::as_str)
    }

    /// Get the severity.
    #[must_use]
    pub fn severity(&self) -> &str {
        self.labels.get("severity").map_or("unknown", String::as_str)
    }

    /// Get a label, empty if missing.
    #[must_use]
    pub fn label(&self, key: &str) -> &str {
        self.labels.get(key).map_or("", String::as_str)
    }

    /// Get an annotation, empty if missing.
    #[must_use]
    pub fn annotation(&self, key: &str) -> &str {
        self.annotations.get(key).map_or("", String::as_str)
    }

    /// Get the `service_name` label.
    #[must_use]
    pub fn service_name(&self) -> &str {
        self.label("service_name")
    }

    /// Get the summary annotation.
    #[must_use]
    pub fn summary(&self) -> &str {
        self.annotation("summary")
    }

    /// Check if this is a firing alert.
    #[must_use]
    pub fn is_firing(&self) -> bool {
        self.status == "firing"
    }

    /// Check if this alert has resolved.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.status == "resolved"
    }
}

/// Immutable alert snapshot taken at ingestion time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertInfo {
    /// Alert name (`alertname` label)
    pub name: String,
    /// Severity label
    pub severity: String,
    /// Summary annotation
    pub summary: String,
    /// All alert labels
    pub labels: BTreeMap<String, String>,
    /// When the alert started firing
    pub started_at: DateTime<Utc>,
}

impl AlertInfo {
    /// Get a label, empty if missing.
    #[must_use]
    pub fn label(&self, key: &str) -> &str {
        self.labels.get(key).map_or("", String::as_str)
    }
}

impl From<&Alert> for AlertInfo {
    fn from(alert: &Alert) -> Self {
        Self {
            name: alert.name().to_string(),
            severity: alert.severity().to_string(),
            summary: alert.summary().to_string(),
            labels: alert
                .labels
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            started_at: alert.starts_at,
        }
    }
}

/// Golden-signal metrics for a service over the analysis window.
///
/// `None` means the value could not be fetched; `Some(0.0)` is a real
/// zero reading.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    /// P99 latency in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_p99: Option<f64>,
    /// Average latency in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_avg: Option<f64>,
    /// Error rate as a ratio (0.0 - 1.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_rate: Option<f64>,
    /// Requests per second
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rps: Option<f64>,
    /// Memory usage in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_usage: Option<f64>,

    /// Baseline latency for comparison
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline_latency: Option<f64>,
    /// Baseline error rate for comparison
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline_error_rate: Option<f64>,
    /// Baseline requests per second for comparison
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline_rps: Option<f64>,
}

impl MetricsSummary {
    /// Whether no metric at all was populated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A commit from the service's source history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    /// Commit SHA
    pub sha: String,
    /// Commit message
    pub message: String,
    /// Author name
    pub author: String,
    /// Author email
    pub email: String,
    /// Link to the commit
    pub url: String,
    /// Authored at
    pub timestamp: DateTime<Utc>,
    /// Associated pull request, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pr_number: Option<u64>,
}

impl CommitInfo {
    /// Abbreviated SHA (first 7 characters).
    #[must_use]
    pub fn short_sha(&self) -> &str {
        self.sha.get(..7).unwrap_or(&self.sha)
    }
}

/// A single timed operation within a distributed trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    /// Span ID
    #[serde(rename = "spanID")]
    pub span_id: String,
    /// Trace ID
    #[serde(rename = "traceID")]
    pub trace_id: String,
    /// Service that emitted the span
    pub service_name: String,
    /// Operation name
    pub operation_name: String,
    /// Start time
    pub start_time: DateTime<Utc>,
    /// Duration in milliseconds
    pub duration_ms: u64,
    /// Status, e.g. "ok" or "error"
    pub status: String,
}

/// Trace summary for the analysis window.
///
/// The default value stands for "tracing disabled" and is not an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceContext {
    /// Spans above the slow threshold
    #[serde(default)]
    pub slow_spans: Vec<Span>,
    /// Spans with error status
    #[serde(default)]
    pub error_spans: Vec<Span>,
    /// Number of traces found
    #[serde(default)]
    pub trace_count: usize,
    /// P99 latency across traces in milliseconds
    #[serde(default)]
    pub p99_latency: f64,
}

/// Time range for diagnostic queries, anchored to the alert time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Window start
    pub start: DateTime<Utc>,
    /// Window end
    pub end: DateTime<Utc>,
    /// Window length
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
}

impl TimeWindow {
    /// Window of `duration` ending at `end`.
    ///
    /// Saturates at the earliest representable time for absurd durations.
    #[must_use]
    pub fn ending_at(end: DateTime<Utc>, duration: Duration) -> Self {
        let start = TimeDelta::from_std(duration)
            .ok()
            .and_then(|d| end.checked_sub_signed(d))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self {
            start,
            end,
            duration,
        }
    }
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self::ending_at(DateTime::<Utc>::UNIX_EPOCH, Duration::ZERO)
    }
}

/// Aggregated diagnostic snapshot for one incident.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisContext {
    /// Service under investigation
    pub service_name: String,
    /// Alert snapshot
    pub alert: AlertInfo,
    /// Golden-signal metrics
    pub metrics: MetricsSummary,
    /// Commits, newest first
    pub recent_commits: Vec<CommitInfo>,
    /// Trace summary
    #[serde(default)]
    pub traces: TraceContext,
    /// Metrics window
    pub time_window: TimeWindow,
}

impl AnalysisContext {
    /// Attach the alert snapshot.
    #[must_use]
    pub fn with_alert(mut self, alert: AlertInfo) -> Self {
        self.alert = alert;
        self
    }
}

/// Confidence level reported with an analysis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// Strong evidence for the root cause
    High,
    /// Default when the backend does not report one
    #[default]
    Medium,
    /// Speculative
    Low,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        })
    }
}

/// Result of a root-cause analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Unique analysis ID
    pub id: String,
    /// Service name
    pub service_name: String,
    /// Alert name
    pub alert_name: String,
    /// Alert severity
    pub severity: String,
    /// Alert summary
    pub summary: String,
    /// Verbatim backend narrative
    pub root_cause: String,
    /// Confidence level
    pub confidence: Confidence,
    /// Suggested next steps (not extracted from the narrative)
    #[serde(default)]
    pub next_steps: Vec<String>,
    /// Metrics the analysis saw
    #[serde(default)]
    pub metrics: MetricsSummary,
    /// Commits the analysis saw
    #[serde(default)]
    pub commits: Vec<CommitInfo>,
    /// Backend that produced the narrative
    pub backend: String,
    /// When the analysis completed
    pub analyzed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn alert(labels: &[(&str, &str)]) -> Alert {
        Alert {
            status: "firing".to_string(),
            labels: labels
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            annotations: HashMap::from([(
                "summary".to_string(),
                "High latency detected".to_string(),
            )]),
            starts_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
            ends_at: None,
            generator_url: String::new(),
            fingerprint: "abc".to_string(),
        }
    }

    #[test]
    fn test_alert_accessors() {
        let alert = alert(&[("alertname", "HighLatency"), ("service_name", "checkout")]);
        assert!(alert.is_firing());
        assert!(!alert.is_resolved());
        assert_eq!(alert.name(), "HighLatency");
        assert_eq!(alert.severity(), "unknown");
        assert_eq!(alert.service_name(), "checkout");
        assert_eq!(alert.label("nonexistent"), "");
        assert_eq!(alert.summary(), "High latency detected");
        assert_eq!(alert.annotation("runbook"), "");
    }

    #[test]
    fn test_alert_info_snapshot() {
        let alert = alert(&[
            ("alertname", "OOMKilled"),
            ("severity", "critical"),
            ("service_name", "cart"),
        ]);
        let info = AlertInfo::from(&alert);
        assert_eq!(info.name, "OOMKilled");
        assert_eq!(info.severity, "critical");
        assert_eq!(info.label("service_name"), "cart");
        assert_eq!(info.started_at, alert.starts_at);
    }

    #[test]
    fn test_decode_alertmanager_payload() {
        let body = serde_json::json!({
            "version": "4",
            "groupKey": "{}:{alertname=\"HighLatency\"}",
            "status": "resolved",
            "receiver": "diagnosis",
            "alerts": [{
                "status": "resolved",
                "labels": {"alertname": "HighLatency", "service_name": "checkout"},
                "annotations": {"summary": "p99 above 2s"},
                "startsAt": "2026-03-01T12:00:00Z",
                "endsAt": "2026-03-01T12:45:00Z",
                "generatorURL": "http://prometheus/graph",
                "fingerprint": "f00d"
            }]
        });
        let payload: AlertmanagerPayload = serde_json::from_value(body).unwrap();
        assert_eq!(payload.alerts.len(), 1);
        let alert = &payload.alerts[0];
        assert!(alert.is_resolved());
        assert_eq!(alert.generator_url, "http://prometheus/graph");
        assert_eq!(
            alert.ends_at,
            Some(Utc.with_ymd_and_hms(2026, 3, 1, 12, 45, 0).unwrap())
        );
    }

    #[test]
    fn test_time_window_anchored_to_end() {
        let end = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let window = TimeWindow::ending_at(end, Duration::from_secs(15 * 60));
        assert_eq!(window.end, end);
        assert_eq!(window.start, Utc.with_ymd_and_hms(2026, 3, 1, 11, 45, 0).unwrap());
    }

    #[test]
    fn test_short_sha_tolerates_short_input() {
        let mut commit = CommitInfo {
            sha: "0123456789abcdef".to_string(),
            message: String::new(),
            author: String::new(),
            email: String::new(),
            url: String::new(),
            timestamp: Utc::now(),
            pr_number: None,
        };
        assert_eq!(commit.short_sha(), "0123456");
        commit.sha = "abc".to_string();
        assert_eq!(commit.short_sha(), "abc");
    }

    #[test]
    fn test_metrics_zero_is_not_missing() {
        let mut metrics = MetricsSummary::default();
        assert!(metrics.is_empty());
        metrics.error_rate = Some(0.0);
        assert!(!metrics.is_empty());
    }
}
