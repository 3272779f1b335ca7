//! Session configuration.

use evedex_query::DEFAULT_QUERY_LIMIT;
use evedex_remote::ApiConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::SessionResult;

/// Everything a [`Session`](crate::Session) needs to start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub api: ApiConfig,
    /// SQLite file for the local store; `None` keeps everything in memory.
    pub store_path: Option<PathBuf>,
    /// Fill empty collections from the API during `init`.
    pub seed_on_init: bool,
    /// Fetch the market-group tree during `init`.
    pub load_tree_on_init: bool,
    /// Row limit used by `query_default`.
    pub default_limit: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            store_path: None,
            seed_on_init: true,
            load_tree_on_init: true,
            default_limit: DEFAULT_QUERY_LIMIT,
        }
    }
}

impl SessionConfig {
    /// Parses a config document; missing keys take their defaults.
    pub fn from_json(json: &str) -> SessionResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// A config that starts with empty, in-memory state and no network calls.
    pub fn offline() -> Self {
        Self {
            seed_on_init: false,
            load_tree_on_init: false,
            ..Self::default()
        }
    }
}
