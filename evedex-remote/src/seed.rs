//! Seeding local collections from the API.

use evedex_model::builtin;
use evedex_store::LocalStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{Endpoint, RemoteResult, RemoteSource};

/// Which endpoint fills which local collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedConfig {
    pub collection: String,
    pub endpoint: Endpoint,
    /// Name used in log lines; defaults to the collection name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl SeedConfig {
    pub fn new(collection: impl Into<String>, endpoint: Endpoint) -> Self {
        Self {
            collection: collection.into(),
            endpoint,
            display_name: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.collection)
    }
}

/// The five built-in collections, in seeding order.
pub fn default_seed_configs() -> Vec<SeedConfig> {
    vec![
        SeedConfig::new(builtin::TYPE_NAMES, Endpoint::TypeNames).with_display_name("TypeNames"),
        SeedConfig::new(builtin::BLUEPRINTS, Endpoint::Blueprints).with_display_name("Blueprints"),
        SeedConfig::new(builtin::INV_CATEGORIES, Endpoint::InvCategories)
            .with_display_name("InvCategories"),
        SeedConfig::new(builtin::INV_GROUPS, Endpoint::InvGroups).with_display_name("InvGroups"),
        SeedConfig::new(builtin::INV_TYPES, Endpoint::InvTypes).with_display_name("InvTypes"),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeededTable {
    pub collection: String,
    pub rows: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedTable {
    pub collection: String,
    pub error: String,
}

/// Outcome of one seeding pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub seeded: Vec<SeededTable>,
    /// Collections that already had rows.
    pub skipped: Vec<String>,
    pub failed: Vec<FailedTable>,
}

impl SeedReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn rows_seeded(&self) -> usize {
        self.seeded.iter().map(|t| t.rows).sum()
    }
}

/// Fills local collections from a [`RemoteSource`].
pub struct Seeder {
    source: Arc<dyn RemoteSource>,
    configs: Vec<SeedConfig>,
}

impl Seeder {
    /// A seeder for the built-in collections.
    pub fn new(source: Arc<dyn RemoteSource>) -> Self {
        Self::with_configs(source, default_seed_configs())
    }

    pub fn with_configs(source: Arc<dyn RemoteSource>, configs: Vec<SeedConfig>) -> Self {
        Self { source, configs }
    }

    pub fn configs(&self) -> &[SeedConfig] {
        &self.configs
    }

    /// Seeds every configured collection that is still empty.
    ///
    /// A failing table is logged and recorded in the report; the remaining
    /// tables are still seeded and existing rows are never touched.
    pub async fn seed(&self, store: &LocalStore) -> SeedReport {
        self.run(store, false).await
    }

    /// Refetches every configured collection and replaces its rows.
    ///
    /// Each table is swapped in one write once its new rows have been
    /// fetched and validated, so a failed fetch or a bad row keeps the old
    /// rows. Tables are replaced one after another, not together.
    pub async fn reseed(&self, store: &LocalStore) -> SeedReport {
        self.run(store, true).await
    }

    async fn run(&self, store: &LocalStore, replace: bool) -> SeedReport {
        let mut report = SeedReport::default();
        for config in &self.configs {
            let name = config.display_name();
            match self.seed_table(store, config, replace).await {
                Ok(Some(rows)) => {
                    info!(collection = %config.collection, rows, "{name} seeded");
                    report.seeded.push(SeededTable {
                        collection: config.collection.clone(),
                        rows,
                    });
                }
                Ok(None) => {
                    debug!(collection = %config.collection, "{name} exists, skipping seed");
                    report.skipped.push(config.collection.clone());
                }
                Err(e) => {
                    warn!(collection = %config.collection, error = %e, "error seeding {name}");
                    report.failed.push(FailedTable {
                        collection: config.collection.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }
        info!(
            seeded = report.seeded.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "seeding finished"
        );
        report
    }

    /// Returns the stored row count, or `None` when the table was skipped.
    async fn seed_table(
        &self,
        store: &LocalStore,
        config: &SeedConfig,
        replace: bool,
    ) -> RemoteResult<Option<usize>> {
        if !replace && store.count(&config.collection)? > 0 {
            return Ok(None);
        }
        let rows = self.source.fetch_collection(config.endpoint).await?;
        if replace {
            store.replace_all(&config.collection, rows)?;
        } else {
            store.bulk_put(&config.collection, rows)?;
        }
        Ok(Some(store.count(&config.collection)?))
    }
}
