//! Prompt construction.
//!
//! Every function here is pure: the same input always renders byte-identical
//! text. Nothing reads the clock; callers pass in any timestamps.

use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt::Write as _;
use std::time::Duration;

use crate::models::{Alert, AnalysisContext, CommitInfo, Span};

/// Commits rendered into an analysis prompt.
pub const ANALYSIS_COMMIT_LIMIT: usize = 10;
/// Commits rendered into a summary (postmortem) prompt.
pub const SUMMARY_COMMIT_LIMIT: usize = 5;
/// Slow spans rendered into an analysis prompt.
pub const SPAN_LIMIT: usize = 10;
/// Characters of a commit subject kept before the ellipsis.
pub const COMMIT_MESSAGE_LIMIT: usize = 50;

const ELLIPSIS: &str = "...";

const RESPONSE_INSTRUCTIONS: &str = r#"Based on this data, provide:
1. Most likely root cause (2-3 sentences)
2. Confidence level (high/medium/low)
3. Suggested next steps (3 bullet points)

Respond in JSON format:
{
  "root_cause": "...",
  "confidence": "...",
  "next_steps": ["...", "...", "..."]
}
"#;

const POSTMORTEM_SECTIONS: &str = "## 1. Summary
## 2. Impact
## 3. Root Cause Analysis
## 4. Resolution and Recovery
## 5. What went well & What went wrong
## 6. Action Items
";

/// Rapid-triage prompt built from the alert alone.
#[must_use]
pub fn triage_prompt(alert: &Alert) -> String {
    format!(
        "You are an SRE analyzing an incident. Given the following alert data, identify the most likely root cause.

ALERT:
- Service: {service}
- Alert Name: {name}
- Severity: {severity}
- Started: {started}
- Summary: {summary}

{RESPONSE_INSTRUCTIONS}",
        service = alert.service_name(),
        name = alert.name(),
        severity = alert.severity(),
        started = rfc3339(alert.starts_at),
        summary = alert.summary(),
    )
}

/// Deep-analysis prompt built from the full context.
#[must_use]
pub fn context_prompt(ctx: &AnalysisContext) -> String {
    let metrics = &ctx.metrics;
    let traces = &ctx.traces;

    format!(
        "You are an SRE analyzing an incident. Given the following data, identify the most likely root cause.

ALERT:
- Service: {service}
- Alert Name: {name}
- Severity: {severity}
- Started: {started}
- Summary: {summary}

METRICS:
- Latency P99: {latency}
- Error Rate: {error_rate}
- Requests/sec: {rps}

BASELINE:
- Latency: {baseline_latency}
- Error Rate: {baseline_error_rate}
- Requests/sec: {baseline_rps}

DISTRIBUTED TRACES:
- Traces: {trace_count}
- P99 Latency: {trace_p99:.2}ms
- Slow Spans: {slow}
- Error Spans: {errors}
{spans}
RECENT COMMITS ({commit_count} commits):
{commits}
{RESPONSE_INSTRUCTIONS}",
        service = ctx.service_name,
        name = ctx.alert.name,
        severity = ctx.alert.severity,
        started = rfc3339(ctx.alert.started_at),
        summary = ctx.alert.summary,
        latency = millis(metrics.latency_p99),
        error_rate = percent(metrics.error_rate),
        rps = number(metrics.rps),
        baseline_latency = millis(metrics.baseline_latency),
        baseline_error_rate = percent(metrics.baseline_error_rate),
        baseline_rps = number(metrics.baseline_rps),
        trace_count = traces.trace_count,
        trace_p99 = traces.p99_latency,
        slow = traces.slow_spans.len(),
        errors = traces.error_spans.len(),
        spans = format_spans(&traces.slow_spans),
        commit_count = ctx.recent_commits.len(),
        commits = format_commits(&ctx.recent_commits, ANALYSIS_COMMIT_LIMIT),
    )
}

/// Postmortem prompt for a resolved alert.
#[must_use]
pub fn postmortem_prompt(
    ctx: &AnalysisContext,
    resolved_at: DateTime<Utc>,
    duration: Duration,
) -> String {
    format!(
        "You are an expert SRE writing a formal incident postmortem.
An alert that was previously firing has now RESOLVED.

INCIDENT DETAILS:
- Service: {service}
- Alert: {name}
- Severity: {severity}
- Started: {started}
- Resolved: {resolved}
- Total Duration: {duration}

Please write a structured postmortem with the following sections in Markdown:
{POSTMORTEM_SECTIONS}
Use this alert context to inform your writeup:
- Alert Summary: {summary}
- Commits found during window: {commit_count}
{commits}",
        service = ctx.service_name,
        name = ctx.alert.name,
        severity = ctx.alert.severity,
        started = rfc3339(ctx.alert.started_at),
        resolved = rfc3339(resolved_at),
        duration = format_duration(duration),
        summary = ctx.alert.summary,
        commit_count = ctx.recent_commits.len(),
        commits = format_commits(&ctx.recent_commits, SUMMARY_COMMIT_LIMIT),
    )
}

/// Render up to `limit` commits, newest first, one per line.
#[must_use]
pub fn format_commits(commits: &[CommitInfo], limit: usize) -> String {
    if commits.is_empty() {
        return "No recent commits found.\n".to_string();
    }

    commits.iter().take(limit).fold(String::new(), |mut out, c| {
        let subject = c.message.lines().next().unwrap_or_default();
        let _ = writeln!(
            out,
            "- {}: {} (by {})",
            c.short_sha(),
            truncate(subject, COMMIT_MESSAGE_LIMIT),
            c.author
        );
        out
    })
}

fn format_spans(spans: &[Span]) -> String {
    spans.iter().take(SPAN_LIMIT).fold(String::new(), |mut out, s| {
        let _ = writeln!(
            out,
            "- Service: {}\n  Operation: {}\n  Duration: {}ms\n  Status: {}",
            s.service_name, s.operation_name, s.duration_ms, s.status
        );
        out
    })
}

/// Keep the first `max_chars` characters, marking the cut with an ellipsis.
#[must_use]
pub fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}{ELLIPSIS}", &s[..idx]),
        None => s.to_string(),
    }
}

/// Human-readable duration at whole-second precision, e.g. `1h 2m 3s`.
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    humantime::format_duration(Duration::from_secs(duration.as_secs())).to_string()
}

fn rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn millis(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}ms"))
}

fn percent(ratio: Option<f64>) -> String {
    ratio.map_or_else(|| "n/a".to_string(), |v| format!("{:.2}%", v * 100.0))
}

fn number(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AlertInfo, MetricsSummary, TraceContext};
    use chrono::TimeZone;

    fn commit(sha: &str, message: &str) -> CommitInfo {
        CommitInfo {
            sha: sha.to_string(),
            message: message.to_string(),
            author: "dana".to_string(),
            email: "dana@example.com".to_string(),
            url: String::new(),
            timestamp: Utc.with_ymd_and_hms(2026, 3, 1, 11, 0, 0).unwrap(),
            pr_number: None,
        }
    }

    fn context() -> AnalysisContext {
        AnalysisContext {
            service_name: "checkout".to_string(),
            alert: AlertInfo {
                name: "HighLatency".to_string(),
                severity: "critical".to_string(),
                summary: "p99 above 2s".to_string(),
                started_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
                ..AlertInfo::default()
            },
            metrics: MetricsSummary {
                latency_p99: Some(2150.0),
                error_rate: Some(0.034),
                rps: Some(0.0),
                ..MetricsSummary::default()
            },
            recent_commits: vec![commit("9f8e7d6c5b4a", "Bump connection pool size")],
            traces: TraceContext::default(),
            ..AnalysisContext::default()
        }
    }

    #[test]
    fn test_truncate_counts_characters() {
        assert_eq!(truncate("short", 50), "short");
        assert_eq!(truncate(&"a".repeat(50), 50), "a".repeat(50));
        assert_eq!(truncate(&"a".repeat(60), 50), format!("{}...", "a".repeat(50)));
        assert_eq!(truncate("ééééé", 3), "ééé...");
    }

    #[test]
    fn test_commit_lines_and_limits() {
        let commits: Vec<_> = (0..15)
            .map(|i| commit(&format!("{i:02}aaaaaaaaaa"), &"x".repeat(60)))
            .collect();

        let rendered = format_commits(&commits, ANALYSIS_COMMIT_LIMIT);
        assert_eq!(rendered.lines().count(), 10);
        assert!(rendered.starts_with(&format!("- 00aaaaa: {}... (by dana)\n", "x".repeat(50))));
        assert!(!rendered.contains("10aaaaa"));

        assert_eq!(format_commits(&commits, SUMMARY_COMMIT_LIMIT).lines().count(), 5);
        assert_eq!(format_commits(&[], 10), "No recent commits found.\n");
    }

    #[test]
    fn test_only_commit_subject_is_rendered() {
        let rendered = format_commits(&[commit("abcdef0123", "Fix retry\n\nLong body")], 10);
        assert_eq!(rendered, "- abcdef0: Fix retry (by dana)\n");
    }

    #[test]
    fn test_context_prompt_is_deterministic() {
        let ctx = context();
        assert_eq!(context_prompt(&ctx), context_prompt(&ctx.clone()));
    }

    #[test]
    fn test_context_prompt_renders_present_and_missing_metrics() {
        let prompt = context_prompt(&context());
        assert!(prompt.contains("- Service: checkout\n"));
        assert!(prompt.contains("- Started: 2026-03-01T12:00:00Z\n"));
        assert!(prompt.contains("- Latency P99: 2150.00ms\n"));
        assert!(prompt.contains("- Error Rate: 3.40%\n"));
        assert!(prompt.contains("- Requests/sec: 0.00\n"));
        assert!(prompt.contains("BASELINE:\n- Latency: n/a\n"));
        assert!(prompt.contains("RECENT COMMITS (1 commits):\n- 9f8e7d6: Bump connection pool size (by dana)\n"));
        assert!(prompt.contains("\"root_cause\""));
    }

    #[test]
    fn test_spans_are_capped() {
        let span = Span {
            span_id: "s".to_string(),
            trace_id: "t".to_string(),
            service_name: "checkout".to_string(),
            operation_name: "SELECT orders".to_string(),
            start_time: Utc.with_ymd_and_hms(2026, 3, 1, 11, 55, 0).unwrap(),
            duration_ms: 1200,
            status: "ok".to_string(),
        };
        let mut ctx = context();
        ctx.traces.slow_spans = vec![span.clone(); 12];
        ctx.traces.error_spans = vec![span; 2];

        let prompt = context_prompt(&ctx);
        assert!(prompt.contains("- Slow Spans: 12\n- Error Spans: 2\n"));
        assert_eq!(prompt.matches("Operation: SELECT orders").count(), SPAN_LIMIT);
    }

    #[test]
    fn test_postmortem_prompt() {
        let ctx = context();
        let resolved = Utc.with_ymd_and_hms(2026, 3, 1, 13, 2, 3).unwrap();
        let prompt = postmortem_prompt(&ctx, resolved, Duration::from_secs(3723));

        assert!(prompt.contains("- Resolved: 2026-03-01T13:02:03Z\n"));
        assert!(prompt.contains("- Total Duration: 1h 2m 3s\n"));
        assert!(prompt.contains("## 3. Root Cause Analysis\n"));
        assert!(prompt.contains("- Commits found during window: 1\n"));
        assert_ne!(prompt, context_prompt(&ctx));
    }

    #[test]
    fn test_triage_prompt_uses_alert_labels() {
        use std::collections::HashMap;

        let alert = Alert {
            status: "firing".to_string(),
            labels: HashMap::from([
                ("alertname".to_string(), "HighErrorRate".to_string()),
                ("severity".to_string(), "warning".to_string()),
                ("service_name".to_string(), "cart".to_string()),
            ]),
            annotations: HashMap::new(),
            starts_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
            ends_at: None,
            generator_url: String::new(),
            fingerprint: String::new(),
        };

        let prompt = triage_prompt(&alert);
        assert!(prompt.contains("- Service: cart\n- Alert Name: HighErrorRate\n- Severity: warning\n"));
        assert!(!prompt.contains("METRICS:"));
    }
}
