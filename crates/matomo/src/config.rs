//! Matomo configuration.

use serde::{Deserialize, Serialize};

/// Matomo API client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatomoConfig {
    /// API endpoint, e.g. `https://matomo.example.org/index.php`
    pub base_url: String,
    /// Site id (`idSite`)
    #[serde(default = "default_site_id")]
    pub site_id: u32,
    /// Auth token sent in the request body
    #[serde(default)]
    pub token_auth: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Row limit per report; Matomo returns only 100 rows by default
    #[serde(default = "default_filter_limit")]
    pub filter_limit: i64,
    /// Label filter sent with page-view requests (Matomo `filter_pattern`)
    #[serde(default = "default_view_filter_pattern")]
    pub view_filter_pattern: Option<String>,
}

fn default_site_id() -> u32 {
    1
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_filter_limit() -> i64 {
    -1
}

fn default_view_filter_pattern() -> Option<String> {
    Some("records/[^/?#]+$".to_string())
}

impl Default for MatomoConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost/index.php".to_string(),
            site_id: default_site_id(),
            token_auth: String::new(),
            timeout_secs: default_timeout_secs(),
            filter_limit: default_filter_limit(),
            view_filter_pattern: default_view_filter_pattern(),
        }
    }
}
