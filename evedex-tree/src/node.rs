//! Market-group tree nodes.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::TreeResult;

/// One market group and its subgroups.
///
/// On the wire the id is `marketGroupId` and `children` may be null or
/// missing. Every other field is kept in `attributes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketGroupNode {
    #[serde(rename = "marketGroupId", alias = "id")]
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub children: Vec<Arc<MarketGroupNode>>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl MarketGroupNode {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            children: Vec::new(),
            attributes: Map::new(),
        }
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = MarketGroupNode>) -> Self {
        self.children.extend(children.into_iter().map(Arc::new));
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Display name (`marketGroupName`), if present.
    pub fn name(&self) -> Option<&str> {
        self.attributes.get("marketGroupName").and_then(Value::as_str)
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn child_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.children.iter().map(|c| c.id)
    }

    /// Decodes a forest from its JSON document (an array of root nodes).
    pub fn forest_from_json(json: &str) -> TreeResult<Vec<MarketGroupNode>> {
        Ok(serde_json::from_str(json)?)
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Arc<MarketGroupNode>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Arc<MarketGroupNode>>>::deserialize(deserializer)?.unwrap_or_default())
}
