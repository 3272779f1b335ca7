//! The per-application session.

use evedex_model::{Record, builtin};
use evedex_query::{DEFAULT_SCAN_LIMIT, Filter, QueryOutcome, run_query, search_starts_with};
use evedex_remote::{ApiClient, RemoteSource, SeedReport, Seeder};
use evedex_store::LocalStore;
use evedex_tree::{GroupTreeIndex, TreeSource};
use std::sync::Arc;
use tracing::{info, warn};

use crate::staging;
use crate::{SessionConfig, SessionResult};

/// Owns the local store, the seeder and the market-group tree for one
/// application run.
///
/// Lifecycle is `init` → use → `dispose`. Nothing is shared between sessions.
pub struct Session {
    config: SessionConfig,
    store: Arc<LocalStore>,
    seeder: Seeder,
    groups: GroupTreeIndex,
    seed_report: Option<SeedReport>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("groups", &self.groups)
            .field("seed_report", &self.seed_report)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Opens the configured store and talks to the configured API.
    pub async fn init(config: SessionConfig) -> SessionResult<Self> {
        let store = match &config.store_path {
            Some(path) => LocalStore::open(path)?,
            None => LocalStore::open_in_memory()?,
        };
        let client = Arc::new(ApiClient::new(config.api.clone())?);
        Self::with_parts(Arc::new(store), client.clone(), client, config).await
    }

    /// Builds a session from explicit parts.
    ///
    /// Defines the built-in collections, then seeds and loads the tree as
    /// configured. Seed failures end up in [`seed_report`](Self::seed_report);
    /// a failed tree load is logged and leaves the tree empty.
    pub async fn with_parts(
        store: Arc<LocalStore>,
        remote: Arc<dyn RemoteSource>,
        tree_source: Arc<dyn TreeSource>,
        config: SessionConfig,
    ) -> SessionResult<Self> {
        for schema in builtin::all()? {
            store.define(schema)?;
        }

        let mut session = Self {
            seeder: Seeder::new(remote),
            groups: GroupTreeIndex::with_source(tree_source),
            seed_report: None,
            store,
            config,
        };

        if session.config.seed_on_init {
            session.seed_report = Some(session.seeder.seed(&session.store).await);
        }
        if session.config.load_tree_on_init
            && let Err(e) = session.groups.load().await
        {
            warn!(error = %e, "market group tree unavailable");
        }

        info!(
            collections = session.store.names()?.len(),
            tree_nodes = session.groups.node_count(),
            "session ready"
        );
        Ok(session)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn groups(&self) -> &GroupTreeIndex {
        &self.groups
    }

    /// Report of the seeding pass run by `init`, if one ran.
    pub fn seed_report(&self) -> Option<&SeedReport> {
        self.seed_report.as_ref()
    }

    /// Runs `filters` against the current snapshot of `collection`.
    pub fn query(
        &self,
        collection: &str,
        filters: &[Filter],
        limit: usize,
    ) -> SessionResult<QueryOutcome> {
        let snapshot = self.store.collection(collection)?;
        Ok(run_query(&snapshot, filters, limit)?)
    }

    /// [`query`](Self::query) with the configured default limit.
    pub fn query_default(&self, collection: &str, filters: &[Filter]) -> SessionResult<QueryOutcome> {
        self.query(collection, filters, self.config.default_limit)
    }

    /// Type names starting with `search`, ignoring case, capped at
    /// [`DEFAULT_SCAN_LIMIT`] rows.
    pub fn search_type_names(&self, search: &str) -> SessionResult<Vec<Arc<Record>>> {
        let snapshot = self.store.collection(builtin::TYPE_NAMES)?;
        Ok(search_starts_with(&snapshot, "typeName", search, DEFAULT_SCAN_LIMIT)?)
    }

    /// `invTypes` rows under the selected market groups, optionally with
    /// every descendant group, narrowed to type names containing `search`.
    pub fn staged_items(
        &self,
        group_ids: &[i64],
        search: Option<&str>,
        include_descendants: bool,
    ) -> SessionResult<Vec<Arc<Record>>> {
        staging::staged_items(&self.store, &self.groups, group_ids, search, include_descendants)
    }

    /// Refetches the market-group tree. A failure keeps the current tree.
    pub async fn reload_tree(&self) -> SessionResult<u64> {
        Ok(self.groups.load().await?)
    }

    /// Refetches and replaces every built-in collection.
    ///
    /// Not isolated from concurrent queries: each table is swapped
    /// atomically, but separate queries can see different generations of
    /// different tables.
    pub async fn reseed(&self) -> SeedReport {
        self.seeder.reseed(&self.store).await
    }

    /// Clears the tree and releases the store.
    pub fn dispose(self) {
        self.groups.clear();
        info!("session disposed");
    }
}
