//! Record store backed by the InvenioRDM REST API.

use std::time::Duration;

use async_trait::async_trait;
use importer_core::{Error, Result};
use reqwest::StatusCode;
use serde::Deserialize;
use telemetry::metrics;
use tracing::{debug, info};
use url::Url;

use crate::config::RecordStoreConfig;
use crate::store::{FileInfo, RecordInfo, RecordStore};

#[derive(Debug, Deserialize)]
struct RecordResponse {
    parent: ParentRef,
}

#[derive(Debug, Deserialize)]
struct ParentRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct FileEntryResponse {
    file_id: String,
    bucket_id: String,
    size: u64,
}

/// [`RecordStore`] that queries `/api/records`.
#[derive(Clone)]
pub struct InvenioRecordStore {
    http: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl InvenioRecordStore {
    pub fn new(config: RecordStoreConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| Error::config(format!("invalid records base_url {}: {e}", config.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::config(format!("records base_url cannot be a base: {base_url}")));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {e}")))?;

        info!(base_url = %base_url, "Created InvenioRDM record store");

        Ok(Self {
            http,
            base_url,
            token: config.token,
        })
    }

    /// `{base}/api/records/<segments...>`, each segment percent-encoded.
    pub fn records_url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("api").push("records").extend(segments);
        }
        url
    }

    async fn get<T: for<'de> Deserialize<'de>>(&self, url: Url, what: &str) -> Result<T> {
        metrics().store_lookups.inc();
        debug!(url = %url, "Record store lookup");

        let mut request = self.http.get(url.clone());
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::record_store(format!("{what}: {e}")))?;

        match response.status() {
            status if status.is_success() => response
                .json::<T>()
                .await
                .map_err(|e| Error::record_store(format!("{what}: unexpected response: {e}"))),
            StatusCode::NOT_FOUND => Err(Error::record_store(format!("{what} not found"))),
            status => Err(Error::record_store(format!("{what}: HTTP {status} from {url}"))),
        }
    }
}

#[async_trait]
impl RecordStore for InvenioRecordStore {
    async fn record(&self, record_id: &str) -> Result<RecordInfo> {
        let url = self.records_url(&[record_id]);
        let record: RecordResponse = self.get(url, &format!("record {record_id}")).await?;

        Ok(RecordInfo {
            parent_id: record.parent.id,
        })
    }

    async fn file(&self, record_id: &str, file_key: &str) -> Result<FileInfo> {
        let url = self.records_url(&[record_id, "files", file_key]);
        let entry: FileEntryResponse = self
            .get(url, &format!("file {file_key:?} of record {record_id}"))
            .await?;

        Ok(FileInfo {
            file_id: entry.file_id,
            bucket_id: entry.bucket_id,
            size: entry.size,
        })
    }
}
