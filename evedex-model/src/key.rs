use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::FieldValue;

/// An ordered index key.
///
/// All numbers sort before all text. Numbers use IEEE total ordering with
/// `-0.0` folded into `0.0`; text sorts by bytes. Booleans are not indexable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IndexKey {
    Number(f64),
    Text(String),
}

impl IndexKey {
    pub fn number(n: f64) -> Self {
        // -0.0 + 0.0 == +0.0
        IndexKey::Number(n + 0.0)
    }

    pub fn text(s: impl Into<String>) -> Self {
        IndexKey::Text(s.into())
    }

    /// The smallest text key; every text key is `>=` this.
    pub fn min_text() -> Self {
        IndexKey::Text(String::new())
    }

    pub fn from_field(value: FieldValue<'_>) -> Option<Self> {
        match value {
            FieldValue::Number(n) => Some(Self::number(n)),
            FieldValue::Text(s) => Some(Self::text(s)),
            FieldValue::Bool(_) => None,
        }
    }

    pub fn from_json(value: &Value) -> Option<Self> {
        FieldValue::from_json(value).and_then(Self::from_field)
    }

    pub fn is_number(&self) -> bool {
        matches!(self, IndexKey::Number(_))
    }

    /// True when both keys are numbers or both are text.
    pub fn same_kind(&self, other: &IndexKey) -> bool {
        self.is_number() == other.is_number()
    }

    fn rank(&self) -> u8 {
        match self {
            IndexKey::Number(_) => 0,
            IndexKey::Text(_) => 1,
        }
    }
}

impl PartialEq for IndexKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for IndexKey {}

impl PartialOrd for IndexKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for IndexKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (IndexKey::Number(a), IndexKey::Number(b)) => (a + 0.0).total_cmp(&(b + 0.0)),
            (IndexKey::Text(a), IndexKey::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Hash for IndexKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            IndexKey::Number(n) => (n + 0.0).to_bits().hash(state),
            IndexKey::Text(s) => s.hash(state),
        }
    }
}

impl fmt::Display for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexKey::Number(n) => write!(f, "{n}"),
            IndexKey::Text(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<i64> for IndexKey {
    fn from(n: i64) -> Self {
        IndexKey::number(n as f64)
    }
}

impl From<f64> for IndexKey {
    fn from(n: f64) -> Self {
        IndexKey::number(n)
    }
}

impl From<&str> for IndexKey {
    fn from(s: &str) -> Self {
        IndexKey::text(s)
    }
}

impl From<String> for IndexKey {
    fn from(s: String) -> Self {
        IndexKey::Text(s)
    }
}
