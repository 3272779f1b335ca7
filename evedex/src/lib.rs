//! evedex: offline search over EVE Online static data.
//!
//! A [`Session`] wires the pieces together for one application run:
//!
//! - `evedex-store` holds the seeded collections locally
//! - `evedex-query` runs declarative filters over them
//! - `evedex-tree` answers market-group hierarchy lookups
//! - `evedex-remote` fetches collections and the tree from the API
//!
//! ```no_run
//! # async fn run() -> evedex::SessionResult<()> {
//! use evedex::{Filter, Session, SessionConfig};
//!
//! let session = Session::init(SessionConfig::default()).await?;
//! let rifters = session.query_default("typeNames", &[Filter::starts_with("typeName", "rif")])?;
//! println!("{} matches via {:?}", rifters.len(), rifters.plan.access);
//! session.dispose();
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod session;
mod staging;

pub use config::SessionConfig;
pub use error::{SessionError, SessionResult};
pub use session::Session;

pub use evedex_model::{CollectionSchema, Record, builtin};
pub use evedex_query::{AccessPath, FallbackReason, Filter, Operator, QueryOutcome, QueryPlan};
pub use evedex_remote::{ApiConfig, SeedReport};
pub use evedex_tree::{GroupTreeIndex, MarketGroupNode};
