//! Record store configuration.

use serde::{Deserialize, Serialize};

/// InvenioRDM REST API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordStoreConfig {
    /// Instance base URL, e.g. `https://repository.example.org`
    pub base_url: String,
    /// Personal access token (needed for restricted records)
    pub token: Option<String>,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for RecordStoreConfig {
    fn default() -> Self {
        Self {
            base_url: "https://127.0.0.1:5000".to_string(),
            token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}
