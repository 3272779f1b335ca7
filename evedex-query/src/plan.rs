//! Query plan reporting.

use serde::Serialize;

/// How the engine produced its candidate rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AccessPath {
    /// No filters; rows in natural order.
    Natural,
    /// Linear scan of the whole collection.
    FullScan,
    /// Point lookup on an indexed field.
    IndexEquals { field: String },
    /// Case-folded prefix range on an indexed field.
    IndexPrefix { field: String },
    /// Bounded key range on an indexed field.
    IndexRange { field: String },
}

impl AccessPath {
    pub fn is_indexed(&self) -> bool {
        matches!(
            self,
            AccessPath::IndexEquals { .. } | AccessPath::IndexPrefix { .. } | AccessPath::IndexRange { .. }
        )
    }
}

/// Why the first filter could not use an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FallbackReason {
    /// The field has no index in this collection.
    NotIndexed,
    /// The operator has no indexed form (`contains`).
    OperatorNotIndexable,
    /// The filter value cannot be an index key (booleans).
    ValueNotIndexable,
}

/// What a query did, so callers and tests can see which path ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryPlan {
    pub access: AccessPath,
    /// Set when the first filter wanted an index but fell back to a scan.
    pub fallback: Option<FallbackReason>,
    /// Filters evaluated only as in-memory predicates.
    pub linear_filters: usize,
}

impl QueryPlan {
    pub(crate) fn natural() -> Self {
        Self {
            access: AccessPath::Natural,
            fallback: None,
            linear_filters: 0,
        }
    }

    pub(crate) fn scan(filters: usize, fallback: Option<FallbackReason>) -> Self {
        Self {
            access: AccessPath::FullScan,
            fallback,
            linear_filters: filters,
        }
    }

    pub(crate) fn indexed(access: AccessPath, filters: usize) -> Self {
        Self {
            access,
            fallback: None,
            linear_filters: filters.saturating_sub(1),
        }
    }
}
