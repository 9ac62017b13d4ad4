//! Search backend configuration.

use serde::{Deserialize, Serialize};

/// OpenSearch / Elasticsearch configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Cluster URL
    pub url: String,
    /// Username (optional)
    pub username: Option<String>,
    /// Password (optional)
    pub password: Option<String>,
    /// Prefix prepended to every index name
    #[serde(default)]
    pub index_prefix: String,
    /// Documents per bulk request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_batch_size() -> usize {
    50
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9200".to_string(),
            username: None,
            password: None,
            index_prefix: String::new(),
            batch_size: default_batch_size(),
            timeout_secs: default_timeout_secs(),
        }
    }
}
