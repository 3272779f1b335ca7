//! HTTP client for the static data API.

use async_trait::async_trait;
use evedex_model::Record;
use evedex_tree::{MarketGroupNode, TreeResult, TreeSource};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use crate::{ApiConfig, Endpoint, RemoteError, RemoteResult};

/// A source of collection contents.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Fetches every row served by `endpoint`.
    async fn fetch_collection(&self, endpoint: Endpoint) -> RemoteResult<Vec<Record>>;
}

/// reqwest-backed client for the static data API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    config: ApiConfig,
    client: Client,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> RemoteResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| RemoteError::Client(e.to_string()))?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Fetches the market-group forest.
    pub async fn fetch_market_groups(&self) -> RemoteResult<Vec<MarketGroupNode>> {
        self.get_json(Endpoint::MarketGroupTree).await
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: Endpoint) -> RemoteResult<T> {
        let url = self.config.url(endpoint.path());
        debug!(%url, "GET");

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| RemoteError::Fetch {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await.map_err(|e| RemoteError::Fetch {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&body).map_err(|e| RemoteError::Decode {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl RemoteSource for ApiClient {
    async fn fetch_collection(&self, endpoint: Endpoint) -> RemoteResult<Vec<Record>> {
        self.get_json(endpoint).await
    }
}

#[async_trait]
impl TreeSource for ApiClient {
    async fn fetch_tree(&self) -> TreeResult<Vec<MarketGroupNode>> {
        Ok(self.fetch_market_groups().await?)
    }
}
