//! OpenSearch `_bulk` client.

use std::time::Duration;

use async_trait::async_trait;
use importer_core::{Error, Result, StatisticsDocument};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::config::SearchConfig;

/// Rejection reasons kept per batch for logging.
const MAX_ERROR_SAMPLES: usize = 5;

/// Aggregate result of one bulk request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub success: usize,
    pub failed: usize,
    /// A few rejection reasons, for logs only.
    pub error_samples: Vec<String>,
}

/// Backend accepting batches of documents.
///
/// Individual rejections are counted in the outcome. An `Err` means the
/// whole batch could not be submitted.
#[async_trait]
pub trait BulkIndexer: Send + Sync {
    async fn bulk(&self, documents: &[StatisticsDocument]) -> Result<BatchOutcome>;
}

/// Encode documents as a `_bulk` NDJSON body of index actions.
pub fn encode_bulk_body(documents: &[StatisticsDocument]) -> Result<String> {
    let mut body = String::new();
    for doc in documents {
        let action = json!({ "index": { "_index": doc.index, "_id": doc.id } });
        body.push_str(&serde_json::to_string(&action)?);
        body.push('\n');
        body.push_str(&serde_json::to_string(&doc.source)?);
        body.push('\n');
    }
    Ok(body)
}

/// Count successes and failures in a `_bulk` response for `sent` documents.
pub fn parse_bulk_response(response: &Value, sent: usize) -> BatchOutcome {
    let Some(items) = response.get("items").and_then(Value::as_array) else {
        let errors = response.get("errors").and_then(Value::as_bool).unwrap_or(false);
        return if errors {
            BatchOutcome {
                success: 0,
                failed: sent,
                error_samples: vec!["bulk response reported errors without items".into()],
            }
        } else {
            BatchOutcome {
                success: sent,
                ..BatchOutcome::default()
            }
        };
    };

    let mut failed = 0;
    let mut error_samples = Vec::new();
    for item in items {
        // Each item is `{ "<action>": { "status": .., "error": .. } }`.
        let Some(result) = item.as_object().and_then(|o| o.values().next()) else {
            continue;
        };
        let status = result.get("status").and_then(Value::as_u64).unwrap_or(0);
        let error = result.get("error");

        if error.is_some() || status >= 300 {
            failed += 1;
            if error_samples.len() < MAX_ERROR_SAMPLES {
                let reason = error
                    .and_then(|e| e.get("reason").or_else(|| e.get("type")))
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("status {status}"));
                error_samples.push(reason);
            }
        }
    }

    BatchOutcome {
        success: sent.saturating_sub(failed),
        failed,
        error_samples,
    }
}

/// HTTP client for the search cluster.
#[derive(Clone)]
pub struct SearchClient {
    http: reqwest::Client,
    config: SearchConfig,
}

impl SearchClient {
    /// Creates a new search client.
    pub fn new(config: SearchConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {e}")))?;

        info!(url = %config.url, "Created search client");

        Ok(Self { http, config })
    }

    fn bulk_url(&self) -> String {
        format!("{}/_bulk", self.config.url.trim_end_matches('/'))
    }
}

#[async_trait]
impl BulkIndexer for SearchClient {
    async fn bulk(&self, documents: &[StatisticsDocument]) -> Result<BatchOutcome> {
        if documents.is_empty() {
            return Ok(BatchOutcome::default());
        }

        let body = encode_bulk_body(documents)?;

        let mut request = self
            .http
            .post(self.bulk_url())
            .query(&[("filter_path", "errors,items.*.status,items.*.error")])
            .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
            .body(body);
        if let Some(ref user) = self.config.username {
            request = request.basic_auth(user, self.config.password.as_ref());
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::index(format!("bulk request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let preview: String = text.chars().take(500).collect();
            return Err(Error::index(format!("bulk request returned {status}: {preview}")));
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| Error::index(format!("unreadable bulk response: {e}")))?;

        let outcome = parse_bulk_response(&value, documents.len());
        debug!(
            sent = documents.len(),
            success = outcome.success,
            failed = outcome.failed,
            "Bulk request complete"
        );
        Ok(outcome)
    }
}
