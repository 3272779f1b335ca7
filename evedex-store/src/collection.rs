//! Immutable collection snapshots and their secondary indexes.

use evedex_model::{CollectionSchema, FieldValue, IndexKey, Record, fold_case};
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::Arc;

use crate::{StorageError, StorageResult};

/// An index access request.
///
/// Scans return candidates in index order. Case-insensitive scans match on
/// the lowercased string form of every scalar, so they can return rows a
/// typed comparison would reject; callers recheck their predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexScan {
    /// Exact key match.
    Equals(IndexKey),
    /// Lowercased string form equals the given (already lowercased) text.
    EqualsIgnoreCase(String),
    /// Lowercased string form starts with the given (already lowercased) prefix.
    PrefixIgnoreCase(String),
    /// Keys between two bounds. The range never crosses from numbers into
    /// text; the kind is taken from whichever bound is present.
    Range {
        lower: Bound<IndexKey>,
        upper: Bound<IndexKey>,
    },
    /// Any of the given keys, visited in key order.
    AnyOf(Vec<IndexKey>),
}

#[derive(Debug, Default, Clone)]
struct FieldIndex {
    keys: BTreeMap<IndexKey, Vec<usize>>,
    folded: BTreeMap<String, Vec<usize>>,
}

impl FieldIndex {
    fn insert(&mut self, value: FieldValue<'_>, position: usize) {
        if let Some(key) = IndexKey::from_field(value) {
            self.keys.entry(key).or_default().push(position);
        }
        self.folded
            .entry(fold_case(&value.stringify()))
            .or_default()
            .push(position);
    }

    fn scan(&self, scan: &IndexScan) -> Vec<usize> {
        match scan {
            IndexScan::Equals(key) => self.keys.get(key).cloned().unwrap_or_default(),
            IndexScan::EqualsIgnoreCase(text) => self.folded.get(text).cloned().unwrap_or_default(),
            IndexScan::PrefixIgnoreCase(prefix) => self
                .folded
                .range(prefix.clone()..)
                .take_while(|(k, _)| k.starts_with(prefix.as_str()))
                .flat_map(|(_, positions)| positions.iter().copied())
                .collect(),
            IndexScan::Range { lower, upper } => match clamp_to_kind(lower, upper) {
                Some(range) => self
                    .keys
                    .range(range)
                    .flat_map(|(_, positions)| positions.iter().copied())
                    .collect(),
                None => Vec::new(),
            },
            IndexScan::AnyOf(keys) => {
                let mut keys: Vec<&IndexKey> = keys.iter().collect();
                keys.sort();
                keys.dedup();
                keys.into_iter()
                    .filter_map(|k| self.keys.get(k))
                    .flat_map(|positions| positions.iter().copied())
                    .collect()
            }
        }
    }
}

/// Restricts a range to a single key kind. `None` means the range is empty.
fn clamp_to_kind(
    lower: &Bound<IndexKey>,
    upper: &Bound<IndexKey>,
) -> Option<(Bound<IndexKey>, Bound<IndexKey>)> {
    let lower_key = bound_key(lower);
    let upper_key = bound_key(upper);

    let numeric = match (lower_key, upper_key) {
        (Some(l), Some(u)) if !l.same_kind(u) => return None,
        (Some(k), _) | (None, Some(k)) => k.is_number(),
        (None, None) => return Some((Bound::Unbounded, Bound::Unbounded)),
    };

    let (lower, upper) = if numeric {
        let upper = match upper {
            Bound::Unbounded => Bound::Excluded(IndexKey::min_text()),
            other => other.clone(),
        };
        (lower.clone(), upper)
    } else {
        let lower = match lower {
            Bound::Unbounded => Bound::Included(IndexKey::min_text()),
            other => other.clone(),
        };
        (lower, upper.clone())
    };

    // BTreeMap::range panics on inverted ranges and on (Excluded(x), Excluded(x)).
    match (bound_key(&lower), bound_key(&upper)) {
        (Some(l), Some(u)) if l > u => None,
        (Some(l), Some(u))
            if l == u && matches!((&lower, &upper), (Bound::Excluded(_), Bound::Excluded(_))) =>
        {
            None
        }
        _ => Some((lower, upper)),
    }
}

fn bound_key(bound: &Bound<IndexKey>) -> Option<&IndexKey> {
    match bound {
        Bound::Included(k) | Bound::Excluded(k) => Some(k),
        Bound::Unbounded => None,
    }
}

/// A read-only snapshot of one collection.
///
/// Records keep their natural (first insertion) order. Every field declared
/// in the schema, including the primary key, carries a sorted index.
#[derive(Debug, Clone)]
pub struct Collection {
    schema: CollectionSchema,
    records: Vec<Arc<Record>>,
    positions: HashMap<IndexKey, usize>,
    indexes: HashMap<String, FieldIndex>,
}

impl Collection {
    /// Creates an empty collection.
    pub fn empty(schema: CollectionSchema) -> Self {
        let indexes = schema
            .indexed()
            .map(|f| (f.to_string(), FieldIndex::default()))
            .collect();
        Self {
            schema,
            records: Vec::new(),
            positions: HashMap::new(),
            indexes,
        }
    }

    /// Builds a collection from records in natural order. Later records with
    /// an already seen key replace the earlier one in place.
    pub fn from_records(
        schema: CollectionSchema,
        records: impl IntoIterator<Item = Record>,
    ) -> StorageResult<Self> {
        let mut collection = Self::empty(schema);
        collection.apply(records)?;
        Ok(collection)
    }

    /// Returns a new snapshot with `records` upserted, plus the natural
    /// position each incoming record landed at.
    pub(crate) fn upserted(
        &self,
        records: impl IntoIterator<Item = Record>,
    ) -> StorageResult<(Self, Vec<(usize, IndexKey)>)> {
        let mut next = Self {
            schema: self.schema.clone(),
            records: self.records.clone(),
            positions: self.positions.clone(),
            indexes: HashMap::new(),
        };
        let placed = next.apply(records)?;
        Ok((next, placed))
    }

    fn apply(&mut self, records: impl IntoIterator<Item = Record>) -> StorageResult<Vec<(usize, IndexKey)>> {
        let mut placed = Vec::new();
        for record in records {
            let key = self.schema.key_of(&record)?;
            let position = match self.positions.get(&key) {
                Some(&pos) => {
                    self.records[pos] = Arc::new(record);
                    pos
                }
                None => {
                    let pos = self.records.len();
                    self.records.push(Arc::new(record));
                    self.positions.insert(key.clone(), pos);
                    pos
                }
            };
            placed.push((position, key));
        }
        self.rebuild_indexes();
        Ok(placed)
    }

    fn rebuild_indexes(&mut self) {
        let mut indexes: HashMap<String, FieldIndex> = self
            .schema
            .indexed()
            .map(|f| (f.to_string(), FieldIndex::default()))
            .collect();
        for (position, record) in self.records.iter().enumerate() {
            for (field, index) in indexes.iter_mut() {
                if let Some(value) = record.field(field) {
                    index.insert(value, position);
                }
            }
        }
        self.indexes = indexes;
    }

    pub fn schema(&self) -> &CollectionSchema {
        &self.schema
    }

    pub fn name(&self) -> &str {
        &self.schema.name
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in natural order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Record>> {
        self.records.iter()
    }

    /// Point lookup by primary key.
    pub fn get(&self, key: &IndexKey) -> Option<&Arc<Record>> {
        self.positions.get(key).map(|&pos| &self.records[pos])
    }

    pub fn is_indexed(&self, field: &str) -> bool {
        self.indexes.contains_key(field)
    }

    /// Runs an index scan on `field`.
    pub fn index_scan(&self, field: &str, scan: &IndexScan) -> StorageResult<Vec<&Arc<Record>>> {
        let index = self
            .indexes
            .get(field)
            .ok_or_else(|| StorageError::IndexUnavailable {
                collection: self.schema.name.clone(),
                field: field.to_string(),
            })?;
        Ok(index
            .scan(scan)
            .into_iter()
            .map(|pos| &self.records[pos])
            .collect())
    }
}
