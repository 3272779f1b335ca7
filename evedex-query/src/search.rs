//! Single-field search helpers used by the search box.

use evedex_model::Record;
use evedex_store::Collection;
use std::sync::Arc;

use crate::{Filter, QueryResult, run_query};

/// Rows whose `field` starts with `search`, ignoring case.
pub fn search_starts_with(
    collection: &Collection,
    field: &str,
    search: &str,
    limit: usize,
) -> QueryResult<Vec<Arc<Record>>> {
    Ok(run_query(collection, &[Filter::starts_with(field, search)], limit)?.records)
}

/// Rows whose `field` contains `search`, ignoring case. Always a full scan.
pub fn search_contains(
    collection: &Collection,
    field: &str,
    search: &str,
    limit: usize,
) -> QueryResult<Vec<Arc<Record>>> {
    Ok(run_query(collection, &[Filter::contains(field, search)], limit)?.records)
}
