//! Matomo reporting API client.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::NaiveDate;
use importer_core::{format_day, Error, Metric, Result};
use serde_json::Value;
use telemetry::metrics;
use tracing::{debug, info};

use crate::config::MatomoConfig;

/// Body Matomo sends instead of JSON when a day has no data.
pub const NO_DATA_AVAILABLE: &str = "No data available";

/// Outcome of fetching one (metric, day).
#[derive(Debug, Clone, PartialEq)]
pub enum DayFetch {
    Data(Vec<Value>),
    Failed(String),
}

impl DayFetch {
    /// Entries of the day; a failed day has none.
    pub fn into_entries(self) -> Vec<Value> {
        match self {
            Self::Data(entries) => entries,
            Self::Failed(_) => Vec::new(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Source of per-day aggregate analytics.
///
/// Implementations never return an error: failures are reported as
/// [`DayFetch::Failed`] so one bad day cannot abort a batch.
#[async_trait]
pub trait AnalyticsProvider: Send + Sync {
    async fn fetch(&self, metric: Metric, day: NaiveDate) -> DayFetch;
}

/// Interpret a successful response body.
pub fn parse_body(body: &str) -> Result<Vec<Value>> {
    if body.trim() == NO_DATA_AVAILABLE {
        return Ok(Vec::new());
    }

    let value: Value = serde_json::from_str(body).map_err(|e| {
        let preview: String = body.chars().take(200).collect();
        Error::provider_response(format!("body is not JSON ({e}): {preview}"))
    })?;

    match value {
        Value::Array(entries) => Ok(entries),
        Value::Object(ref obj) if obj.get("result").and_then(Value::as_str) == Some("error") => {
            let message = obj
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            Err(Error::provider_response(format!("matomo error: {message}")))
        }
        other => Err(Error::provider_response(format!(
            "expected a JSON array, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// HTTP client for the Matomo reporting API.
#[derive(Clone)]
pub struct MatomoClient {
    http: reqwest::Client,
    config: MatomoConfig,
}

impl MatomoClient {
    /// Creates a new Matomo client.
    pub fn new(config: MatomoConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {e}")))?;

        info!(
            base_url = %config.base_url,
            site_id = config.site_id,
            "Created Matomo client"
        );

        Ok(Self { http, config })
    }

    /// Query parameters of the request for one (metric, day).
    pub fn query_params(&self, metric: Metric, day: NaiveDate) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("module", "API".to_string()),
            ("format", "json".to_string()),
            ("idSite", self.config.site_id.to_string()),
            ("period", "day".to_string()),
            ("date", format_day(day)),
            ("method", metric.provider_method().to_string()),
            ("flat", "1".to_string()),
            ("showMetadata", "0".to_string()),
            ("filter_limit", self.config.filter_limit.to_string()),
        ];

        if metric == Metric::Views {
            if let Some(ref pattern) = self.config.view_filter_pattern {
                params.push(("filter_pattern", pattern.clone()));
            }
        }

        params
    }

    async fn request(&self, metric: Metric, day: NaiveDate) -> Result<String> {
        let response = self
            .http
            .post(&self.config.base_url)
            .query(&self.query_params(metric, day))
            .form(&[("token_auth", self.config.token_auth.as_str())])
            .send()
            .await
            .map_err(|e| Error::transport(e.to_string()))?;

        let response = response
            .error_for_status()
            .map_err(|e| Error::transport(e.to_string()))?;

        response
            .text()
            .await
            .map_err(|e| Error::transport(format!("failed to read body: {e}")))
    }

    async fn try_fetch(&self, metric: Metric, day: NaiveDate) -> Result<Vec<Value>> {
        let body = self.request(metric, day).await?;
        parse_body(&body)
    }
}

#[async_trait]
impl AnalyticsProvider for MatomoClient {
    async fn fetch(&self, metric: Metric, day: NaiveDate) -> DayFetch {
        let start = Instant::now();
        metrics().provider_requests.inc();

        let result = self.try_fetch(metric, day).await;
        metrics()
            .provider_latency_ms
            .observe(start.elapsed().as_millis() as u64);

        match result {
            Ok(entries) => {
                debug!(metric = %metric, day = %day, count = entries.len(), "Fetched day");
                DayFetch::Data(entries)
            }
            Err(e) => {
                debug!(
                    metric = %metric,
                    day = %day,
                    category = e.category().as_str(),
                    error = %e,
                    "Provider request failed"
                );
                DayFetch::Failed(e.to_string())
            }
        }
    }
}
