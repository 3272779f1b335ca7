//! Remote data source for evedex.
//!
//! [`ApiClient`] fetches collection rows and the market-group tree from the
//! static data REST API. [`Seeder`] uses any [`RemoteSource`] to fill empty
//! local collections at startup.

mod client;
mod config;
mod endpoint;
mod error;
mod seed;

pub use client::{ApiClient, RemoteSource};
pub use config::ApiConfig;
pub use endpoint::Endpoint;
pub use error::{RemoteError, RemoteResult};
pub use seed::{FailedTable, SeedConfig, SeedReport, SeededTable, Seeder, default_seed_configs};
