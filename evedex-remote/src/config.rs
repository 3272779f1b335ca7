//! Remote API configuration.

use serde::{Deserialize, Serialize};

/// Connection settings for the static data API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL, without a trailing `/api`.
    pub base_url: String,
    /// Whole-request timeout in seconds.
    pub timeout_secs: u64,
    /// Accept self-signed certificates (local development servers).
    pub accept_invalid_certs: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://localhost:7017".to_string(),
            timeout_secs: 60,
            accept_invalid_certs: false,
        }
    }
}

impl ApiConfig {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}
