//! Prometheus-backed [`MetricsSource`].
//!
//! Golden signals are read with instant queries evaluated at the window end,
//! with the range selector spanning the whole window, so the same alert
//! always produces the same queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt::Write as _;
use tracing::debug;

use crate::config::PrometheusConfig;
use crate::error::SourceError;
use crate::sources::MetricsSource;

/// Prometheus query response
#[derive(Debug, Deserialize)]
struct PrometheusResponse {
    status: String,
    #[serde(default)]
    error: Option<String>,
    data: Option<PrometheusData>,
}

#[derive(Debug, Deserialize)]
struct PrometheusData {
    #[serde(default)]
    result: Vec<PrometheusResult>,
}

#[derive(Debug, Deserialize)]
struct PrometheusResult {
    #[serde(default)]
    #[allow(dead_code)]
    metric: HashMap<String, String>,
    value: Option<(f64, String)>,
}

/// Prometheus client for golden-signal queries.
#[derive(Debug, Clone)]
pub struct PrometheusMetrics {
    base_url: String,
    client: reqwest::Client,
}

impl PrometheusMetrics {
    /// Create a new client with the given configuration.
    pub fn new(config: &PrometheusConfig) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Execute an instant query at `time` and return the first sample.
    ///
    /// An empty result vector or a non-finite sample means "no data".
    pub async fn query_scalar(
        &self,
        query: &str,
        time: DateTime<Utc>,
    ) -> Result<Option<f64>, SourceError> {
        let url = format!("{}/api/v1/query", self.base_url);

        debug!(query = %query, time = %time, "Executing Prometheus query");

        let response = self
            .client
            .get(&url)
            .query(&[("query", query), ("time", &time.timestamp().to_string())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Status { status, body });
        }

        let prom_response: PrometheusResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(e.to_string()))?;

        if prom_response.status != "success" {
            return Err(SourceError::Query(
                prom_response.error.unwrap_or(prom_response.status),
            ));
        }

        let Some((_, raw)) = prom_response
            .data
            .and_then(|d| d.result.into_iter().next())
            .and_then(|r| r.value)
        else {
            return Ok(None);
        };

        let value: f64 = raw
            .parse()
            .map_err(|_| SourceError::Parse(format!("invalid sample value: {raw}")))?;

        Ok(value.is_finite().then_some(value))
    }
}

/// Range selector covering the window in PromQL units, e.g. `1d12h` (at least 1m).
fn range_selector(start: DateTime<Utc>, end: DateTime<Utc>) -> String {
    let mut secs = (end - start).num_seconds().max(60).unsigned_abs();
    let mut range = String::new();
    for (unit, size) in [("d", 86_400), ("h", 3_600), ("m", 60), ("s", 1)] {
        if secs >= size {
            let _ = write!(range, "{}{unit}", secs / size);
            secs %= size;
        }
    }
    range
}

#[async_trait]
impl MetricsSource for PrometheusMetrics {
    async fn latency_p99(
        &self,
        service: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<f64>, SourceError> {
        let range = range_selector(start, end);
        let query = format!(
            r#"histogram_quantile(0.99, sum(rate(http_request_duration_seconds_bucket{{service="{service}"}}[{range}])) by (le))"#
        );
        // Histogram buckets are in seconds; the pipeline reports milliseconds.
        Ok(self.query_scalar(&query, end).await?.map(|s| s * 1000.0))
    }

    async fn error_rate(
        &self,
        service: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<f64>, SourceError> {
        let range = range_selector(start, end);
        let query = format!(
            r#"sum(rate(http_requests_total{{service="{service}",status=~"5.."}}[{range}])) / sum(rate(http_requests_total{{service="{service}"}}[{range}]))"#
        );
        self.query_scalar(&query, end).await
    }

    async fn rps(
        &self,
        service: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<f64>, SourceError> {
        let range = range_selector(start, end);
        let query = format!(r#"sum(rate(http_requests_total{{service="{service}"}}[{range}]))"#);
        self.query_scalar(&query, end).await
    }
}
