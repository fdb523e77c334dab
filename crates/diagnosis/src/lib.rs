//! Incident diagnosis core.
//!
//! When an alert fires, the [`Orchestrator`] gathers metrics, commits, and
//! traces for the affected service concurrently into an [`AnalysisContext`].
//! The [`Analyzer`] sends that context to an analysis backend for a
//! root-cause narrative. On resolution, the [`PostmortemGenerator`] writes a
//! postmortem that pairs the backend narrative with deterministic
//! [`RuleEngine`] suggestions.
//!
//! Wire clients for commits and traces are supplied by the embedding service
//! through the [`sources`] traits; [`PrometheusMetrics`] covers metrics.

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod analyzer;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod postmortem;
pub mod prometheus;
pub mod prompt;
pub mod remediation;
pub mod sources;

pub use analyzer::Analyzer;
pub use config::{AnalysisConfig, CommitsConfig, DiagnosisConfig, PrometheusConfig, TraceConfig};
pub use error::{
    AnalysisError, ConfigError, FetchError, FetchErrorKind, FetchSource, PostmortemError,
    SourceError,
};
pub use models::{
    Alert, AlertInfo, AlertmanagerPayload, AnalysisContext, AnalysisResult, CommitInfo,
    Confidence, MetricsSummary, Span, TimeWindow, TraceContext,
};
pub use orchestrator::{Orchestrator, PreparedContext};
pub use postmortem::{Postmortem, PostmortemGenerator};
pub use prometheus::PrometheusMetrics;
pub use remediation::{Category, RuleEngine, Suggestion};
pub use sources::{CommitSource, MetricsSource, TraceSource};
