use async_trait::async_trait;
use evedex::{
    AccessPath, Filter, MarketGroupNode, Session, SessionConfig, SessionError, builtin,
};
use evedex_model::Record;
use evedex_query::DEFAULT_SCAN_LIMIT;
use evedex_remote::{Endpoint, RemoteError, RemoteResult, RemoteSource};
use evedex_store::{LocalStore, StorageError};
use evedex_tree::{TreeError, TreeResult, TreeSource};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Serves fixed rows per endpoint; unknown endpoints answer 404.
#[derive(Default)]
struct FixtureRemote {
    rows: Mutex<HashMap<Endpoint, Vec<Value>>>,
    fetches: AtomicUsize,
}

impl FixtureRemote {
    fn with(self, endpoint: Endpoint, rows: Value) -> Self {
        let rows = rows.as_array().cloned().unwrap_or_default();
        self.rows.lock().unwrap().insert(endpoint, rows);
        self
    }

    fn set(&self, endpoint: Endpoint, rows: Value) {
        let rows = rows.as_array().cloned().unwrap_or_default();
        self.rows.lock().unwrap().insert(endpoint, rows);
    }
}

#[async_trait]
impl RemoteSource for FixtureRemote {
    async fn fetch_collection(&self, endpoint: Endpoint) -> RemoteResult<Vec<Record>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let rows = self.rows.lock().unwrap().get(&endpoint).cloned();
        match rows {
            Some(rows) => Ok(rows
                .into_iter()
                .map(|v| Record::from_value(v).unwrap())
                .collect()),
            None => Err(RemoteError::Status {
                endpoint: endpoint.to_string(),
                status: 404,
                body: String::new(),
            }),
        }
    }
}

/// Hands out scripted tree responses in order.
struct FixtureTree(Mutex<VecDeque<TreeResult<Vec<MarketGroupNode>>>>);

impl FixtureTree {
    fn new(responses: Vec<TreeResult<Vec<MarketGroupNode>>>) -> Arc<Self> {
        Arc::new(Self(Mutex::new(responses.into())))
    }
}

#[async_trait]
impl TreeSource for FixtureTree {
    async fn fetch_tree(&self) -> TreeResult<Vec<MarketGroupNode>> {
        self.0
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TreeError::Fetch("no more responses".into())))
    }
}

fn remote() -> FixtureRemote {
    FixtureRemote::default()
        .with(Endpoint::TypeNames, json!([
            {"typeId": 587, "typeName": "Rifter"},
            {"typeId": 2, "typeName": "rifle"},
            {"typeId": 11190, "typeName": "Scout Drone"}
        ]))
        .with(Endpoint::Blueprints, json!([]))
        .with(Endpoint::InvCategories, json!([{"categoryId": 6, "categoryName": "Ship"}]))
        .with(Endpoint::InvGroups, json!([{"groupId": 25, "groupName": "Frigate"}]))
        .with(Endpoint::InvTypes, json!([
            {"typeId": 587, "typeName": "Rifter", "marketGroupId": 64},
            {"typeId": 603, "typeName": "Merlin", "marketGroupId": 61},
            {"typeId": 598, "typeName": "Breacher", "marketGroupId": 64},
            {"typeId": 34, "typeName": "Tritanium", "marketGroupId": 1857},
            {"typeId": 999, "typeName": "Unlisted", "marketGroupId": null}
        ]))
}

/// Ships(4) -> Frigates(1361) -> [Caldari(61), Minmatar(64)]; Minerals(1857).
fn market_tree() -> Vec<MarketGroupNode> {
    vec![
        MarketGroupNode::new(4)
            .with_attribute("marketGroupName", "Ships")
            .with_children([MarketGroupNode::new(1361)
                .with_attribute("marketGroupName", "Frigates")
                .with_children([MarketGroupNode::new(61), MarketGroupNode::new(64)])]),
        MarketGroupNode::new(1857).with_attribute("marketGroupName", "Minerals"),
    ]
}

async fn session_with(
    remote: Arc<FixtureRemote>,
    tree: Arc<FixtureTree>,
    config: SessionConfig,
) -> Session {
    init_tracing();
    let store = Arc::new(LocalStore::open_in_memory().unwrap());
    Session::with_parts(store, remote, tree, config).await.unwrap()
}

async fn seeded_session() -> Session {
    session_with(
        Arc::new(remote()),
        FixtureTree::new(vec![Ok(market_tree())]),
        SessionConfig::default(),
    )
    .await
}

fn type_ids(records: &[Arc<Record>]) -> Vec<i64> {
    records
        .iter()
        .filter_map(|r| r.number("typeId"))
        .map(|n| n as i64)
        .collect()
}

// ── Config ───────────────────────────────────────────────────────

#[test]
fn session_config_default() {
    let cfg = SessionConfig::default();
    assert_eq!(cfg.api.base_url, "https://localhost:7017");
    assert_eq!(cfg.store_path, None);
    assert!(cfg.seed_on_init);
    assert!(cfg.load_tree_on_init);
    assert_eq!(cfg.default_limit, 500);
}

#[test]
fn session_config_from_partial_json() {
    let cfg = SessionConfig::from_json(
        r#"{"api": {"base_url": "http://127.0.0.1:5000"}, "default_limit": 25, "store_path": "/tmp/evedex.db"}"#,
    )
    .unwrap();
    assert_eq!(cfg.api.base_url, "http://127.0.0.1:5000");
    assert_eq!(cfg.api.timeout_secs, 60);
    assert_eq!(cfg.default_limit, 25);
    assert_eq!(cfg.store_path.as_deref(), Some(std::path::Path::new("/tmp/evedex.db")));
    assert!(cfg.seed_on_init);
}

#[test]
fn session_config_rejects_malformed_json() {
    let err = SessionConfig::from_json("{default_limit: 3}").unwrap_err();
    assert!(matches!(err, SessionError::Config(_)));
}

// ── Init ─────────────────────────────────────────────────────────

#[tokio::test]
async fn init_seeds_and_loads_tree() {
    let session = seeded_session().await;

    let report = session.seed_report().unwrap();
    assert!(report.is_complete());
    assert_eq!(report.seeded.len(), 5);
    assert_eq!(session.store().count(builtin::INV_TYPES).unwrap(), 5);
    assert!(session.groups().is_loaded());
    assert_eq!(session.groups().node_count(), 5);
}

#[tokio::test]
async fn offline_config_touches_nothing() {
    let remote = Arc::new(remote());
    let session = session_with(remote.clone(), FixtureTree::new(vec![]), SessionConfig::offline()).await;

    assert!(session.seed_report().is_none());
    assert_eq!(remote.fetches.load(Ordering::SeqCst), 0);
    assert!(!session.groups().is_loaded());
    assert_eq!(
        session.store().names().unwrap(),
        vec!["blueprints", "invCategories", "invGroups", "invTypes", "typeNames"]
    );
}

#[tokio::test]
async fn seed_failures_are_reported_not_fatal() {
    let remote = Arc::new(
        FixtureRemote::default().with(Endpoint::TypeNames, json!([{"typeId": 1, "typeName": "A"}])),
    );
    let session = session_with(remote, FixtureTree::new(vec![Ok(market_tree())]), SessionConfig::default()).await;

    let report = session.seed_report().unwrap();
    assert_eq!(report.seeded.len(), 1);
    assert_eq!(report.failed.len(), 4);
    assert_eq!(session.store().count(builtin::TYPE_NAMES).unwrap(), 1);
}

#[tokio::test]
async fn tree_failure_leaves_tree_empty_until_reload() {
    let session = session_with(
        Arc::new(remote()),
        FixtureTree::new(vec![Err(TreeError::Fetch("connection refused".into())), Ok(market_tree())]),
        SessionConfig::default(),
    )
    .await;

    assert!(!session.groups().is_loaded());
    assert!(session.groups().find_by_id(4).is_none());
    assert!(session.staged_items(&[4], None, true).unwrap().is_empty());

    assert_eq!(session.reload_tree().await.unwrap(), 1);
    assert_eq!(session.groups().find_parent_of(64).unwrap().name(), Some("Frigates"));
}

#[tokio::test]
async fn failed_reload_keeps_current_tree() {
    let session = seeded_session().await;
    let err = session.reload_tree().await.unwrap_err();
    assert!(matches!(err, SessionError::Tree(TreeError::Fetch(_))));
    assert_eq!(session.groups().generation(), 1);
    assert_eq!(session.groups().node_count(), 5);
}

// ── Queries ──────────────────────────────────────────────────────

#[tokio::test]
async fn query_runs_against_seeded_collection() {
    let session = seeded_session().await;
    let outcome = session
        .query(builtin::TYPE_NAMES, &[Filter::starts_with("typeName", "rif")], 10)
        .unwrap();
    let mut ids = type_ids(&outcome.records);
    ids.sort();
    assert_eq!(ids, vec![2, 587]);
    assert_eq!(outcome.plan.access, AccessPath::IndexPrefix { field: "typeName".into() });
}

#[tokio::test]
async fn query_default_uses_configured_limit() {
    let config = SessionConfig {
        default_limit: 2,
        ..SessionConfig::default()
    };
    let session = session_with(Arc::new(remote()), FixtureTree::new(vec![Ok(market_tree())]), config).await;
    assert_eq!(session.query_default(builtin::INV_TYPES, &[]).unwrap().len(), 2);
}

#[tokio::test]
async fn query_errors_surface() {
    let session = seeded_session().await;

    let err = session.query("ships", &[], 10).unwrap_err();
    assert!(matches!(err, SessionError::Storage(StorageError::UnknownCollection(_))));

    let err = session.query(builtin::TYPE_NAMES, &[], 0).unwrap_err();
    assert!(matches!(err, SessionError::Query(_)));
}

#[tokio::test]
async fn type_name_search_is_capped_at_the_scan_limit() {
    let many: Vec<Value> = (1..=DEFAULT_SCAN_LIMIT as i64 + 20)
        .map(|id| json!({"typeId": id, "typeName": format!("Scout {id}")}))
        .collect();
    let remote = remote().with(Endpoint::TypeNames, Value::Array(many));
    let session = session_with(
        Arc::new(remote),
        FixtureTree::new(vec![Ok(market_tree())]),
        SessionConfig::default(),
    )
    .await;

    assert_eq!(session.search_type_names("scout").unwrap().len(), DEFAULT_SCAN_LIMIT);
    assert!(session.search_type_names("rifter").unwrap().is_empty());
}

#[tokio::test]
async fn type_name_search_ignores_case() {
    let session = seeded_session().await;
    let mut ids = type_ids(&session.search_type_names("RIF").unwrap());
    ids.sort();
    assert_eq!(ids, vec![2, 587]);
}

// ── Staging ──────────────────────────────────────────────────────

#[tokio::test]
async fn staged_items_for_direct_groups() {
    let session = seeded_session().await;
    let items = session.staged_items(&[64, 61], None, false).unwrap();
    assert_eq!(type_ids(&items), vec![603, 587, 598]);
}

#[tokio::test]
async fn staged_items_include_descendant_groups() {
    let session = seeded_session().await;
    assert!(session.staged_items(&[4], None, false).unwrap().is_empty());
    let items = session.staged_items(&[4], None, true).unwrap();
    assert_eq!(type_ids(&items), vec![603, 587, 598]);
    let items = session.staged_items(&[4, 1857], None, true).unwrap();
    assert_eq!(type_ids(&items), vec![603, 587, 598, 34]);
}

#[tokio::test]
async fn staged_items_narrowed_by_search() {
    let session = seeded_session().await;
    let items = session.staged_items(&[4], Some("RIF"), true).unwrap();
    assert_eq!(type_ids(&items), vec![587]);
    let items = session.staged_items(&[64], Some(""), false).unwrap();
    assert_eq!(type_ids(&items), vec![587, 598]);
    assert!(session.staged_items(&[], Some("rif"), true).unwrap().is_empty());
}

// ── Reseed ───────────────────────────────────────────────────────

#[tokio::test]
async fn reseed_replaces_rows() {
    let remote = Arc::new(remote());
    let session = session_with(remote.clone(), FixtureTree::new(vec![Ok(market_tree())]), SessionConfig::default()).await;

    remote.set(Endpoint::TypeNames, json!([{"typeId": 1, "typeName": "Rifter Navy Issue"}]));
    let report = session.reseed().await;

    assert!(report.is_complete());
    let outcome = session.query(builtin::TYPE_NAMES, &[], 10).unwrap();
    assert_eq!(type_ids(&outcome.records), vec![1]);
}

/// Reads are atomic per call but not isolated across calls: a query holding
/// a snapshot from before a reseed keeps seeing the old rows, while a later
/// query sees the new ones.
#[tokio::test]
async fn reads_are_not_isolated_across_reseed() {
    let remote = Arc::new(remote());
    let session = session_with(remote.clone(), FixtureTree::new(vec![Ok(market_tree())]), SessionConfig::default()).await;

    let before = session.store().collection(builtin::TYPE_NAMES).unwrap();
    remote.set(Endpoint::TypeNames, json!([{"typeId": 1, "typeName": "Rifter Navy Issue"}]));
    remote.set(
        Endpoint::InvTypes,
        json!([{"typeId": 1, "typeName": "Rifter Navy Issue", "marketGroupId": 64}]),
    );
    session.reseed().await;
    let after = session.store().collection(builtin::INV_TYPES).unwrap();

    assert_eq!(before.len(), 3);
    assert_eq!(after.len(), 1);
    assert_eq!(session.store().count(builtin::TYPE_NAMES).unwrap(), 1);
}

// ── Dispose ──────────────────────────────────────────────────────

#[tokio::test]
async fn dispose_clears_the_tree() {
    let session = seeded_session().await;
    let groups = session.groups().clone();
    session.dispose();
    assert!(!groups.is_loaded());
    assert!(groups.find_by_id(4).is_none());
}

#[tokio::test]
async fn on_disk_store_survives_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let config = SessionConfig {
        store_path: Some(dir.path().join("evedex.db")),
        load_tree_on_init: false,
        ..SessionConfig::default()
    };

    let store = Arc::new(LocalStore::open(config.store_path.as_deref().unwrap()).unwrap());
    let first = Session::with_parts(store, Arc::new(remote()), FixtureTree::new(vec![]), config.clone())
        .await
        .unwrap();
    assert_eq!(first.seed_report().unwrap().seeded.len(), 5);
    first.dispose();

    let offline = Arc::new(FixtureRemote::default());
    let store = Arc::new(LocalStore::open(config.store_path.as_deref().unwrap()).unwrap());
    let second = Session::with_parts(store, offline.clone(), FixtureTree::new(vec![]), config)
        .await
        .unwrap();
    assert_eq!(second.seed_report().unwrap().skipped.len(), 4);
    assert_eq!(second.store().count(builtin::INV_TYPES).unwrap(), 5);
    assert_eq!(offline.fetches.load(Ordering::SeqCst), 1);
}
