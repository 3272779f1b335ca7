use async_trait::async_trait;
use evedex_tree::{GroupTreeIndex, MarketGroupNode, TreeError, TreeResult, TreeSource};
use pretty_assertions::assert_eq;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Serves scripted responses after a delay, counting fetches.
struct ScriptedSource {
    responses: Mutex<VecDeque<TreeResult<Vec<MarketGroupNode>>>>,
    delay: Duration,
    fetches: AtomicUsize,
}

impl ScriptedSource {
    fn new(responses: Vec<TreeResult<Vec<MarketGroupNode>>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            delay: Duration::from_millis(50),
            fetches: AtomicUsize::new(0),
        })
    }

    fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TreeSource for ScriptedSource {
    async fn fetch_tree(&self) -> TreeResult<Vec<MarketGroupNode>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TreeError::Fetch("script exhausted".into())))
    }
}

fn tree_v1() -> Vec<MarketGroupNode> {
    vec![MarketGroupNode::new(1).with_children([
        MarketGroupNode::new(2).with_children([MarketGroupNode::new(4)]),
        MarketGroupNode::new(3),
    ])]
}

fn tree_v2() -> Vec<MarketGroupNode> {
    vec![MarketGroupNode::new(1).with_children([MarketGroupNode::new(4)])]
}

// ── Loading ──────────────────────────────────────────────────────

#[tokio::test]
async fn load_installs_fetched_forest() {
    let source = ScriptedSource::new(vec![Ok(tree_v1())]);
    let index = GroupTreeIndex::with_source(source.clone());

    assert_eq!(index.load().await, Ok(1));
    assert!(index.is_loaded());
    assert_eq!(index.node_count(), 4);
    assert_eq!(index.find_parent_of(4).unwrap().id, 2);
    assert_eq!(source.fetches(), 1);
}

#[tokio::test]
async fn concurrent_loads_share_one_fetch() {
    let source = ScriptedSource::new(vec![Ok(tree_v1()), Ok(tree_v2())]);
    let index = GroupTreeIndex::with_source(source.clone());

    let (a, b, c) = tokio::join!(index.load(), index.load(), index.load());

    assert_eq!(source.fetches(), 1);
    assert_eq!(index.fetch_count(), 1);
    assert_eq!((a, b, c), (Ok(1), Ok(1), Ok(1)));
    assert_eq!(index.node_count(), 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_loads_across_tasks_share_one_fetch() {
    let source = ScriptedSource::new(vec![Ok(tree_v1()), Ok(tree_v2())]);
    let index = GroupTreeIndex::with_source(source.clone());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let index = index.clone();
            tokio::spawn(async move { index.load().await })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.await.unwrap(), Ok(1));
    }

    assert_eq!(source.fetches(), 1);
    assert_eq!(index.find_all_descendant_ids(1).len(), 3);
}

#[tokio::test]
async fn sequential_loads_fetch_again_and_invalidate() {
    let source = ScriptedSource::new(vec![Ok(tree_v1()), Ok(tree_v2())]);
    let index = GroupTreeIndex::with_source(source.clone());

    index.load().await.unwrap();
    assert_eq!(index.find_parent_of(4).unwrap().id, 2);

    assert_eq!(index.load().await, Ok(2));
    assert_eq!(source.fetches(), 2);
    assert_eq!(index.find_parent_of(4).unwrap().id, 1);
    assert!(index.find_by_id(2).is_none());
}

// ── Failures ─────────────────────────────────────────────────────

#[tokio::test]
async fn failed_load_keeps_previous_tree() {
    let source = ScriptedSource::new(vec![
        Ok(tree_v1()),
        Err(TreeError::Fetch("503 Service Unavailable".into())),
    ]);
    let index = GroupTreeIndex::with_source(source.clone());
    index.load().await.unwrap();
    index.find_by_id(3);

    let err = index.load().await.unwrap_err();
    assert_eq!(err, TreeError::Fetch("503 Service Unavailable".into()));
    assert_eq!(index.generation(), 1);
    assert_eq!(index.node_count(), 4);
    assert_eq!(index.find_by_id(3).unwrap().id, 3);
}

#[tokio::test]
async fn failed_first_load_leaves_tree_empty() {
    let source = ScriptedSource::new(vec![Err(TreeError::Parse("expected array".into()))]);
    let index = GroupTreeIndex::with_source(source);

    assert!(matches!(index.load().await, Err(TreeError::Parse(_))));
    assert!(!index.is_loaded());
    assert!(index.find_by_id(1).is_none());
    assert!(index.find_children_of(1).is_empty());
}

#[tokio::test]
async fn concurrent_waiters_share_the_failure() {
    let source = ScriptedSource::new(vec![Err(TreeError::Fetch("timeout".into()))]);
    let index = GroupTreeIndex::with_source(source.clone());

    let (a, b) = tokio::join!(index.load(), index.load());
    assert_eq!(a, Err(TreeError::Fetch("timeout".into())));
    assert_eq!(a, b);
    assert_eq!(source.fetches(), 1);
}

#[tokio::test]
async fn duplicate_ids_from_source_fail_the_load() {
    let source = ScriptedSource::new(vec![
        Ok(tree_v1()),
        Ok(vec![MarketGroupNode::new(1), MarketGroupNode::new(1)]),
    ]);
    let index = GroupTreeIndex::with_source(source);
    index.load().await.unwrap();

    assert_eq!(index.load().await, Err(TreeError::DuplicateId(1)));
    assert_eq!(index.node_count(), 4);
}

#[tokio::test]
async fn retry_after_failure_fetches_again() {
    let source = ScriptedSource::new(vec![Err(TreeError::Fetch("reset".into())), Ok(tree_v2())]);
    let index = GroupTreeIndex::with_source(source.clone());

    assert!(index.load().await.is_err());
    assert_eq!(index.load().await, Ok(1));
    assert_eq!(source.fetches(), 2);
    assert_eq!(index.node_count(), 2);
}
