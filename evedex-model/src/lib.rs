//! Core record model for evedex.
//!
//! Defines the types every other evedex crate depends on:
//! - [`Record`] — one cached row (item type, blueprint, category...) as a JSON object
//! - [`FieldValue`] — the typed view of a scalar field read off a record
//! - [`IndexKey`] — a totally ordered key used by primary and secondary indexes
//! - [`CollectionSchema`] — declares a collection's primary key and indexed fields
//!
//! Records are produced by the remote API, persisted by `evedex-store` and
//! only ever read by the query engine.

mod error;
mod key;
mod record;
mod schema;

pub use error::{ModelError, ModelResult};
pub use key::IndexKey;
pub use record::{FieldValue, Record, fold_case};
pub use schema::{CollectionSchema, builtin};
