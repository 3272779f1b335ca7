//! Market-group tree index for evedex.
//!
//! Holds the market-group forest fetched from a [`TreeSource`] and answers
//! point, parent, children, descendant and batch lookups over it:
//!
//! - [`GroupTreeIndex::load`] — single-flight fetch; concurrent callers share one result
//! - [`GroupTreeIndex::find_by_id`] / [`GroupTreeIndex::find_by_ids`] — point and batch lookup
//! - [`GroupTreeIndex::find_parent_of`] / [`GroupTreeIndex::find_children_of`]
//! - [`GroupTreeIndex::find_all_descendant_ids`]

mod error;
mod index;
mod node;
mod source;

pub use error::{TreeError, TreeResult};
pub use index::GroupTreeIndex;
pub use node::MarketGroupNode;
pub use source::TreeSource;
