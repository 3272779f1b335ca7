//! Where the market-group forest comes from.

use async_trait::async_trait;

use crate::{MarketGroupNode, TreeResult};

/// A provider of the market-group forest, typically the remote API.
#[async_trait]
pub trait TreeSource: Send + Sync {
    /// Fetches the full forest. Failures map to [`TreeError::Fetch`] or
    /// [`TreeError::Parse`].
    ///
    /// [`TreeError::Fetch`]: crate::TreeError::Fetch
    /// [`TreeError::Parse`]: crate::TreeError::Parse
    async fn fetch_tree(&self) -> TreeResult<Vec<MarketGroupNode>>;
}
