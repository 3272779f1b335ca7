//! The local query engine.
//!
//! Filters run left to right. The first filter may be served by an index;
//! index candidates are always rechecked against every filter, so the
//! indexed path returns exactly the rows a linear scan would, only in index
//! order instead of natural order.

use evedex_model::{IndexKey, Record, fold_case};
use evedex_store::{Collection, IndexScan, StorageError};
use std::ops::Bound;
use std::sync::Arc;
use tracing::debug;

use crate::filter::{CompiledFilter, Operand, Predicate};
use crate::{AccessPath, FallbackReason, Filter, QueryError, QueryPlan, QueryResult};

/// Rows returned by a query along with the plan that produced them.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub records: Vec<Arc<Record>>,
    pub plan: QueryPlan,
}

impl QueryOutcome {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Runs `filters` against `collection`, returning at most `limit` rows.
///
/// With no filters the first `limit` rows in natural order are returned.
/// Otherwise the first filter is served by an index when its field is
/// indexed and its operator has an indexed form; any other case scans.
pub fn run_query(collection: &Collection, filters: &[Filter], limit: usize) -> QueryResult<QueryOutcome> {
    if limit == 0 {
        return Err(QueryError::InvalidLimit);
    }
    let compiled = compile_all(filters)?;

    let Some(first) = compiled.first() else {
        return Ok(QueryOutcome {
            records: collection.iter().take(limit).cloned().collect(),
            plan: QueryPlan::natural(),
        });
    };

    let indexed = match access_for(collection, first) {
        Ok((access, scan)) => match collection.index_scan(first.field, &scan) {
            Ok(rows) => Some((access, rows)),
            Err(StorageError::IndexUnavailable { .. }) => None,
            Err(e) => return Err(e.into()),
        },
        Err(reason) => {
            debug!(
                collection = collection.name(),
                field = first.field,
                ?reason,
                "first filter not indexable, scanning"
            );
            None
        }
    };

    let (plan, records) = match indexed {
        Some((access, rows)) => {
            let records = collect(rows.into_iter(), &compiled, limit);
            (QueryPlan::indexed(access, compiled.len()), records)
        }
        None => {
            let reason = fallback_reason(collection, first);
            let records = collect(collection.iter(), &compiled, limit);
            (QueryPlan::scan(compiled.len(), Some(reason)), records)
        }
    };

    debug!(
        collection = collection.name(),
        filters = compiled.len(),
        limit,
        returned = records.len(),
        access = ?plan.access,
        "query complete"
    );
    Ok(QueryOutcome { records, plan })
}

/// Runs every filter as a linear predicate over the natural order.
///
/// This is the reference behaviour the indexed path must agree with.
pub fn run_scan_query(
    collection: &Collection,
    filters: &[Filter],
    limit: usize,
) -> QueryResult<QueryOutcome> {
    if limit == 0 {
        return Err(QueryError::InvalidLimit);
    }
    let compiled = compile_all(filters)?;
    Ok(QueryOutcome {
        records: collect(collection.iter(), &compiled, limit),
        plan: QueryPlan::scan(compiled.len(), None),
    })
}

/// Reports the plan `run_query` would choose without running it.
pub fn explain(collection: &Collection, filters: &[Filter]) -> QueryResult<QueryPlan> {
    let compiled = compile_all(filters)?;
    Ok(match compiled.first() {
        None => QueryPlan::natural(),
        Some(first) => match access_for(collection, first) {
            Ok((access, _)) => QueryPlan::indexed(access, compiled.len()),
            Err(reason) => QueryPlan::scan(compiled.len(), Some(reason)),
        },
    })
}

fn compile_all(filters: &[Filter]) -> QueryResult<Vec<CompiledFilter<'_>>> {
    filters.iter().map(Filter::compile).collect()
}

fn collect<'a>(
    rows: impl Iterator<Item = &'a Arc<Record>>,
    filters: &[CompiledFilter<'_>],
    limit: usize,
) -> Vec<Arc<Record>> {
    rows.filter(|record| filters.iter().all(|f| f.matches(record)))
        .take(limit)
        .cloned()
        .collect()
}

fn fallback_reason(collection: &Collection, first: &CompiledFilter<'_>) -> FallbackReason {
    match access_for(collection, first) {
        Err(reason) => reason,
        // The index vanished between planning and scanning.
        Ok(_) => FallbackReason::NotIndexed,
    }
}

/// Maps the first filter onto an index scan.
fn access_for(
    collection: &Collection,
    filter: &CompiledFilter<'_>,
) -> Result<(AccessPath, IndexScan), FallbackReason> {
    if !collection.is_indexed(filter.field) {
        return Err(FallbackReason::NotIndexed);
    }
    let field = filter.field.to_string();

    match &filter.predicate {
        Predicate::Equals { operand, ignore_case } => {
            let scan = match operand {
                Operand::Number(n) => IndexScan::Equals(IndexKey::number(*n)),
                // Operand text is already folded.
                Operand::Text(t) if *ignore_case => IndexScan::EqualsIgnoreCase(t.clone()),
                Operand::Text(t) => IndexScan::Equals(IndexKey::text(t.as_str())),
                Operand::Bool(_) => return Err(FallbackReason::ValueNotIndexable),
            };
            Ok((AccessPath::IndexEquals { field }, scan))
        }
        Predicate::StartsWith { needle, ignore_case } => {
            let prefix = if *ignore_case { needle.clone() } else { fold_case(needle) };
            Ok((AccessPath::IndexPrefix { field }, IndexScan::PrefixIgnoreCase(prefix)))
        }
        Predicate::Contains { .. } => Err(FallbackReason::OperatorNotIndexable),
        Predicate::GreaterThan(key) => Ok((
            AccessPath::IndexRange { field },
            IndexScan::Range {
                lower: Bound::Excluded(key.clone()),
                upper: Bound::Unbounded,
            },
        )),
        Predicate::LessThan(key) => Ok((
            AccessPath::IndexRange { field },
            IndexScan::Range {
                lower: Bound::Unbounded,
                upper: Bound::Excluded(key.clone()),
            },
        )),
        Predicate::Between(low, high) => Ok((
            AccessPath::IndexRange { field },
            IndexScan::Range {
                lower: Bound::Included(low.clone()),
                upper: Bound::Included(high.clone()),
            },
        )),
    }
}
