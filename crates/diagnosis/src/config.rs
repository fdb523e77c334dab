//! Configuration for the diagnosis pipeline.
//!
//! Loaded from a YAML file ([`DiagnosisConfig::from_path`]) or from
//! environment variables over the defaults ([`DiagnosisConfig::from_env`]).
//! Durations use humantime notation (`"15m"`, `"24h"`).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

use llm::LlmConfig;

use crate::error::ConfigError;

/// Default Prometheus URL when `PROMETHEUS_URL` is unset.
const DEFAULT_PROMETHEUS_URL: &str = "http://localhost:9090";

const ENV_PROMETHEUS_URL: &str = "PROMETHEUS_URL";
const ENV_METRICS_WINDOW: &str = "METRICS_WINDOW";
const ENV_COMMITS_LOOKBACK: &str = "COMMITS_LOOKBACK";
const ENV_TRACING_ENABLED: &str = "TRACING_ENABLED";

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosisConfig {
    /// Time windows for data collection
    pub analysis: AnalysisConfig,
    /// Prometheus connection
    pub prometheus: PrometheusConfig,
    /// Service to repository mapping
    pub commits: CommitsConfig,
    /// Trace collection
    pub tracing: TraceConfig,
    /// Analysis backend
    pub llm: LlmConfig,
}

/// Time boundaries for fetching diagnostic data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Metrics and traces window ending at the alert time
    #[serde(with = "humantime_serde")]
    pub metrics_window: Duration,
    /// How far back to look for commits
    #[serde(with = "humantime_serde")]
    pub commits_lookback: Duration,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            metrics_window: Duration::from_secs(15 * 60),
            commits_lookback: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// Connection settings for Prometheus.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrometheusConfig {
    /// Base URL for the Prometheus API
    pub url: String,
    /// Request timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            url: std::env::var(ENV_PROMETHEUS_URL)
                .unwrap_or_else(|_| DEFAULT_PROMETHEUS_URL.to_string()),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Maps services to the repositories their commits live in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CommitsConfig {
    /// Service name -> repository identifier (e.g. "acme/checkout")
    pub repositories: HashMap<String, String>,
}

impl CommitsConfig {
    /// Repository for `service`, falling back to the service name.
    #[must_use]
    pub fn repository_for<'a>(&'a self, service: &'a str) -> &'a str {
        self.repositories.get(service).map_or(service, String::as_str)
    }
}

/// Trace collection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Whether traces are collected at all
    pub enabled: bool,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl DiagnosisConfig {
    /// Load configuration from a YAML file.
    ///
    /// Missing sections take their defaults; the backend API key is read
    /// from the provider's environment variable.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let mut config: Self = serde_yaml::from_str(&raw)?;
        config.llm.load_api_key();
        config.validate()?;
        Ok(config)
    }

    /// Build configuration from environment variables over the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self {
            llm: LlmConfig::from_env(),
            ..Self::default()
        };

        if let Some(window) = env_duration(ENV_METRICS_WINDOW)? {
            config.analysis.metrics_window = window;
        }
        if let Some(lookback) = env_duration(ENV_COMMITS_LOOKBACK)? {
            config.analysis.commits_lookback = lookback;
        }
        if let Ok(enabled) = std::env::var(ENV_TRACING_ENABLED) {
            config.tracing.enabled = !(enabled.eq_ignore_ascii_case("false") || enabled == "0");
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject windows that cannot produce a meaningful query range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.analysis.metrics_window.is_zero() {
            return Err(ConfigError::Invalid(
                "analysis.metrics_window must be greater than zero".to_string(),
            ));
        }
        if self.analysis.commits_lookback.is_zero() {
            return Err(ConfigError::Invalid(
                "analysis.commits_lookback must be greater than zero".to_string(),
            ));
        }
        if self.analysis.metrics_window > self.analysis.commits_lookback {
            warn!(
                metrics_window = %humantime::format_duration(self.analysis.metrics_window),
                commits_lookback = %humantime::format_duration(self.analysis.commits_lookback),
                "Metrics window is longer than the commit lookback"
            );
        }
        Ok(())
    }
}

fn env_duration(var: &str) -> Result<Option<Duration>, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => humantime::parse_duration(&raw)
            .map(Some)
            .map_err(|e| ConfigError::Invalid(format!("{var}={raw}: {e}"))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = DiagnosisConfig::default();
        assert_eq!(config.analysis.metrics_window, Duration::from_secs(900));
        assert_eq!(config.analysis.commits_lookback, Duration::from_secs(86_400));
        assert_eq!(config.prometheus.timeout, Duration::from_secs(30));
        assert!(config.tracing.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_path_parses_humantime_and_partial_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "analysis:\n  metrics_window: 30m\n  commits_lookback: 2days\n\
             commits:\n  repositories:\n    checkout: acme/checkout-api\n\
             tracing:\n  enabled: false\n\
             llm:\n  provider: ollama\n  ollama_model: mistral\n"
        )
        .unwrap();

        let config = DiagnosisConfig::from_path(file.path()).unwrap();
        assert_eq!(config.analysis.metrics_window, Duration::from_secs(1800));
        assert_eq!(config.analysis.commits_lookback, Duration::from_secs(172_800));
        assert!(!config.tracing.enabled);
        assert_eq!(config.llm.provider, "ollama");
        assert_eq!(config.llm.ollama_model, "mistral");
        assert_eq!(config.commits.repository_for("checkout"), "acme/checkout-api");
        assert_eq!(config.commits.repository_for("cart"), "cart");
    }

    #[test]
    fn test_unused_analysis_keys_are_ignored() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "analysis:\n  logs_lookback: 1h\n  metrics_window: 5m\n").unwrap();

        let config = DiagnosisConfig::from_path(file.path()).unwrap();
        assert_eq!(config.analysis.metrics_window, Duration::from_secs(300));
        assert_eq!(config.analysis.commits_lookback, Duration::from_secs(86_400));
    }

    #[test]
    fn test_zero_window_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "analysis:\n  metrics_window: 0s\n").unwrap();

        assert!(matches!(
            DiagnosisConfig::from_path(file.path()),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            DiagnosisConfig::from_path("/nonexistent/diagnosis.yaml"),
            Err(ConfigError::Read { .. })
        ));
    }
}
