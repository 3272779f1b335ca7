//! Local query engine for evedex collections.
//!
//! Translates an ordered list of declarative [`Filter`]s into index scans
//! and in-memory predicates over an `evedex-store` [`Collection`]:
//!
//! - [`run_query`] — the optimized path: first filter through an index when possible
//! - [`run_scan_query`] — every filter as a linear predicate
//! - [`explain`] — the [`QueryPlan`] `run_query` would pick
//! - [`search_starts_with`] / [`search_contains`] — single-field search helpers
//!
//! [`Collection`]: evedex_store::Collection

mod engine;
mod error;
mod filter;
mod plan;
mod search;

pub use engine::{QueryOutcome, explain, run_query, run_scan_query};
pub use error::{QueryError, QueryResult};
pub use filter::{Filter, Operator};
pub use plan::{AccessPath, FallbackReason, QueryPlan};
pub use search::{search_contains, search_starts_with};

/// Default row limit for optimized queries.
pub const DEFAULT_QUERY_LIMIT: usize = 500;

/// Default row limit for scan-only queries and search helpers.
pub const DEFAULT_SCAN_LIMIT: usize = 100;
