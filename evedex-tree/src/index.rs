//! The market-group tree index.
//!
//! All lookups walk the forest breadth-first from the roots with an explicit
//! work queue. Results are memoized per key in a cache tagged with the tree
//! generation; every load bumps the generation, which drops the cache
//! wholesale.

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tracing::{debug, info, warn};

use crate::{MarketGroupNode, TreeError, TreeResult, TreeSource};

type Node = Arc<MarketGroupNode>;
type PendingLoad = Shared<BoxFuture<'static, TreeResult<u64>>>;

/// An immutable loaded forest.
#[derive(Debug, Default)]
struct Forest {
    roots: Vec<Node>,
    generation: u64,
    node_count: usize,
    loaded: bool,
}

impl Forest {
    fn queue(&self) -> VecDeque<&Node> {
        self.roots.iter().collect()
    }

    fn find(&self, id: i64) -> Option<Node> {
        let mut queue = self.queue();
        while let Some(node) = queue.pop_front() {
            if node.id == id {
                return Some(Arc::clone(node));
            }
            queue.extend(node.children.iter());
        }
        None
    }

    fn parent_of(&self, id: i64) -> Option<Node> {
        let mut queue: VecDeque<(&Node, Option<&Node>)> =
            self.roots.iter().map(|root| (root, None)).collect();
        while let Some((node, parent)) = queue.pop_front() {
            if node.id == id {
                return parent.cloned();
            }
            queue.extend(node.children.iter().map(|child| (child, Some(node))));
        }
        None
    }

    fn descendant_ids(&self, id: i64) -> Vec<i64> {
        let Some(target) = self.find(id) else {
            return Vec::new();
        };
        let mut ids = Vec::new();
        let mut queue: VecDeque<&Node> = target.children.iter().collect();
        while let Some(node) = queue.pop_front() {
            ids.push(node.id);
            queue.extend(node.children.iter());
        }
        ids
    }

    fn find_many(&self, ids: &[i64]) -> Vec<Node> {
        let mut remaining: HashSet<i64> = ids.iter().copied().collect();
        let mut found = Vec::with_capacity(remaining.len());
        let mut queue = self.queue();
        while let Some(node) = queue.pop_front() {
            if remaining.remove(&node.id) {
                found.push(Arc::clone(node));
                if remaining.is_empty() {
                    break;
                }
            }
            queue.extend(node.children.iter());
        }
        found
    }
}

/// Builds a forest, rejecting duplicate ids.
fn build_forest(nodes: Vec<MarketGroupNode>, generation: u64) -> TreeResult<Forest> {
    let roots: Vec<Node> = nodes.into_iter().map(Arc::new).collect();
    let mut seen = HashSet::new();
    let mut queue: VecDeque<&Node> = roots.iter().collect();
    while let Some(node) = queue.pop_front() {
        if !seen.insert(node.id) {
            return Err(TreeError::DuplicateId(node.id));
        }
        queue.extend(node.children.iter());
    }
    let node_count = seen.len();
    Ok(Forest {
        roots,
        generation,
        node_count,
        loaded: true,
    })
}

/// Memoized lookups for one tree generation.
#[derive(Debug, Default)]
struct LookupCache {
    generation: u64,
    by_id: HashMap<i64, Option<Node>>,
    parents: HashMap<i64, Option<Node>>,
    children: HashMap<i64, Arc<[Node]>>,
    descendants: HashMap<i64, Arc<[i64]>>,
    batches: HashMap<Vec<i64>, Arc<[Node]>>,
}

impl LookupCache {
    fn for_generation(generation: u64) -> Self {
        Self {
            generation,
            ..Self::default()
        }
    }

    fn len(&self) -> usize {
        self.by_id.len()
            + self.parents.len()
            + self.children.len()
            + self.descendants.len()
            + self.batches.len()
    }
}

struct InFlight {
    ticket: u64,
    pending: PendingLoad,
}

struct Inner {
    forest: RwLock<Arc<Forest>>,
    cache: Mutex<LookupCache>,
    in_flight: Mutex<Option<InFlight>>,
    tickets: AtomicU64,
    fetches: AtomicU64,
}

impl Inner {
    fn snapshot(&self) -> Arc<Forest> {
        Arc::clone(&self.forest.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn cache(&self) -> MutexGuard<'_, LookupCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn flight(&self) -> MutexGuard<'_, Option<InFlight>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Swaps in a new forest built from `nodes`. The old forest stays when
    /// validation fails.
    fn install(&self, nodes: Vec<MarketGroupNode>) -> TreeResult<u64> {
        let mut slot = self.forest.write().unwrap_or_else(PoisonError::into_inner);
        let generation = slot.generation + 1;
        let forest = build_forest(nodes, generation)?;
        info!(
            generation,
            roots = forest.roots.len(),
            nodes = forest.node_count,
            "market group tree loaded"
        );
        *slot = Arc::new(forest);
        drop(slot);
        *self.cache() = LookupCache::for_generation(generation);
        Ok(generation)
    }

    fn finish_flight(&self, ticket: u64) {
        let mut flight = self.flight();
        if flight.as_ref().is_some_and(|f| f.ticket == ticket) {
            *flight = None;
        }
    }
}

/// Breadth-first index over the market-group forest.
///
/// Cloning is cheap; clones share the forest, the cache and any pending load.
#[derive(Clone)]
pub struct GroupTreeIndex {
    inner: Arc<Inner>,
    source: Option<Arc<dyn TreeSource>>,
}

impl std::fmt::Debug for GroupTreeIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupTreeIndex")
            .field("generation", &self.generation())
            .field("nodes", &self.node_count())
            .field("has_source", &self.source.is_some())
            .finish()
    }
}

impl Default for GroupTreeIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl GroupTreeIndex {
    /// An empty index with no source; only [`replace`](Self::replace) loads it.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                forest: RwLock::new(Arc::new(Forest::default())),
                cache: Mutex::new(LookupCache::default()),
                in_flight: Mutex::new(None),
                tickets: AtomicU64::new(0),
                fetches: AtomicU64::new(0),
            }),
            source: None,
        }
    }

    pub fn with_source(source: Arc<dyn TreeSource>) -> Self {
        Self {
            source: Some(source),
            ..Self::new()
        }
    }

    /// Replaces the forest with `nodes` and returns the new generation.
    ///
    /// Fails with [`TreeError::DuplicateId`] if two nodes share an id, in
    /// which case the previous forest is kept.
    pub fn replace(&self, nodes: Vec<MarketGroupNode>) -> TreeResult<u64> {
        self.inner.install(nodes)
    }

    /// Fetches the forest from the source and installs it.
    ///
    /// Calls made while a load is pending join it instead of fetching again,
    /// and every caller receives the same result. On failure the previous
    /// forest is kept.
    pub async fn load(&self) -> TreeResult<u64> {
        let source = self.source.clone().ok_or(TreeError::NoSource)?;

        let pending = {
            let mut flight = self.inner.flight();
            match flight.as_ref() {
                Some(current) => {
                    debug!(ticket = current.ticket, "joining pending tree load");
                    current.pending.clone()
                }
                None => {
                    let ticket = self.inner.tickets.fetch_add(1, Ordering::Relaxed);
                    let inner = Arc::clone(&self.inner);
                    let pending = async move {
                        inner.fetches.fetch_add(1, Ordering::Relaxed);
                        let result = match source.fetch_tree().await {
                            Ok(nodes) => inner.install(nodes),
                            Err(e) => Err(e),
                        };
                        if let Err(e) = &result {
                            warn!(error = %e, "market group tree load failed, keeping previous tree");
                        }
                        inner.finish_flight(ticket);
                        result
                    }
                    .boxed()
                    .shared();
                    *flight = Some(InFlight {
                        ticket,
                        pending: pending.clone(),
                    });
                    pending
                }
            }
        };

        pending.await
    }

    /// Drops the forest and every cached lookup.
    pub fn clear(&self) {
        let mut slot = self.inner.forest.write().unwrap_or_else(PoisonError::into_inner);
        let generation = slot.generation + 1;
        *slot = Arc::new(Forest {
            generation,
            ..Forest::default()
        });
        drop(slot);
        *self.inner.cache() = LookupCache::for_generation(generation);
    }

    /// Incremented on every successful load or clear.
    pub fn generation(&self) -> u64 {
        self.inner.snapshot().generation
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.snapshot().loaded
    }

    pub fn node_count(&self) -> usize {
        self.inner.snapshot().node_count
    }

    /// Number of fetches issued against the source so far.
    pub fn fetch_count(&self) -> u64 {
        self.inner.fetches.load(Ordering::Relaxed)
    }

    /// Number of memoized lookups held for the current generation.
    pub fn cached_entries(&self) -> usize {
        let generation = self.generation();
        let cache = self.inner.cache();
        if cache.generation == generation {
            cache.len()
        } else {
            0
        }
    }

    /// Top-level groups.
    pub fn roots(&self) -> Vec<Arc<MarketGroupNode>> {
        self.inner.snapshot().roots.clone()
    }

    pub fn find_by_id(&self, id: i64) -> Option<Arc<MarketGroupNode>> {
        self.memoized(
            |c| c.by_id.get(&id).cloned(),
            |forest| forest.find(id),
            |c, found| {
                c.by_id.insert(id, found.clone());
            },
        )
    }

    /// The direct parent of `id`; `None` for roots and unknown ids.
    pub fn find_parent_of(&self, id: i64) -> Option<Arc<MarketGroupNode>> {
        self.memoized(
            |c| c.parents.get(&id).cloned(),
            |forest| forest.parent_of(id),
            |c, parent| {
                c.parents.insert(id, parent.clone());
            },
        )
    }

    /// The direct children of `id`, empty when it has none or is unknown.
    pub fn find_children_of(&self, id: i64) -> Vec<Arc<MarketGroupNode>> {
        let children = self.memoized(
            |c| c.children.get(&id).cloned(),
            |forest| -> Arc<[Node]> {
                forest
                    .find(id)
                    .map(|node| node.children.iter().cloned().collect())
                    .unwrap_or_else(|| Arc::from(Vec::new()))
            },
            |c, children| {
                c.children.insert(id, Arc::clone(children));
            },
        );
        children.to_vec()
    }

    /// Every id below `id`, breadth-first, excluding `id` itself.
    pub fn find_all_descendant_ids(&self, id: i64) -> Vec<i64> {
        let ids = self.memoized(
            |c| c.descendants.get(&id).cloned(),
            |forest| Arc::from(forest.descendant_ids(id)),
            |c, ids| {
                c.descendants.insert(id, Arc::clone(ids));
            },
        );
        ids.to_vec()
    }

    /// The nodes for `ids` in discovery order. Duplicate and unknown ids are
    /// ignored; the walk stops as soon as every requested id is found.
    pub fn find_by_ids(&self, ids: &[i64]) -> Vec<Arc<MarketGroupNode>> {
        if ids.is_empty() {
            return Vec::new();
        }
        let mut key = ids.to_vec();
        key.sort_unstable();
        key.dedup();

        let nodes = self.memoized(
            |c| c.batches.get(&key).cloned(),
            |forest| Arc::from(forest.find_many(&key)),
            |c, nodes| {
                c.batches.insert(key.clone(), Arc::clone(nodes));
            },
        );
        nodes.to_vec()
    }

    /// Serves a lookup from the cache of the current generation, computing
    /// and remembering it on a miss. Results computed against an older
    /// forest are returned but not cached.
    fn memoized<T: Clone>(
        &self,
        read: impl FnOnce(&LookupCache) -> Option<T>,
        compute: impl FnOnce(&Forest) -> T,
        write: impl FnOnce(&mut LookupCache, &T),
    ) -> T {
        let forest = self.inner.snapshot();
        {
            let cache = self.inner.cache();
            if cache.generation == forest.generation
                && let Some(hit) = read(&cache)
            {
                return hit;
            }
        }

        let value = compute(&forest);

        let mut cache = self.inner.cache();
        if cache.generation < forest.generation {
            *cache = LookupCache::for_generation(forest.generation);
        }
        if cache.generation == forest.generation {
            write(&mut cache, &value);
        }
        value
    }
}
