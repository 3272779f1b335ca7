//! Local record store for evedex.
//!
//! Holds the collections seeded from the remote API so the browser can
//! query them offline.
//!
//! # Architecture
//!
//! - Rows are persisted in SQLite as JSON bodies keyed by `(collection, pk)`
//! - Each collection is served from an immutable in-memory [`Collection`]
//!   snapshot carrying one sorted index per declared field
//! - Writers build a new snapshot and swap it in; readers keep whatever
//!   snapshot they were handed, so every read is atomic but there is no
//!   isolation across separate calls

mod collection;
mod error;
mod store;

pub use collection::{Collection, IndexScan};
pub use error::{StorageError, StorageResult};
pub use store::LocalStore;
