//! API endpoints.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One GET endpoint of the static data API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Endpoint {
    TypeNames,
    Blueprints,
    InvCategories,
    InvGroups,
    InvTypes,
    MarketGroupTree,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::TypeNames => "/api/TypeNames",
            Endpoint::Blueprints => "/api/Blueprints",
            Endpoint::InvCategories => "/api/InvCategories",
            Endpoint::InvGroups => "/api/InvGroups",
            Endpoint::InvTypes => "/api/InvTypes",
            Endpoint::MarketGroupTree => "/api/MarketGroups/tree",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}
