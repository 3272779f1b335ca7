//! Item staging: the item types listed under a selection of market groups.

use evedex_model::{IndexKey, Record, builtin};
use evedex_query::Filter;
use evedex_store::{IndexScan, LocalStore};
use evedex_tree::GroupTreeIndex;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use crate::SessionResult;

const MARKET_GROUP_FIELD: &str = "marketGroupId";
const TYPE_NAME_FIELD: &str = "typeName";

/// `invTypes` rows whose market group is one of `group_ids`, optionally
/// widened to every descendant group, narrowed to names containing `search`
/// (ignoring case). Rows come back grouped by market group id.
pub(crate) fn staged_items(
    store: &LocalStore,
    groups: &GroupTreeIndex,
    group_ids: &[i64],
    search: Option<&str>,
    include_descendants: bool,
) -> SessionResult<Vec<Arc<Record>>> {
    let mut seen = HashSet::new();
    let mut selected: Vec<i64> = group_ids.iter().copied().filter(|id| seen.insert(*id)).collect();
    if include_descendants {
        for id in group_ids {
            selected.extend(
                groups
                    .find_all_descendant_ids(*id)
                    .into_iter()
                    .filter(|id| seen.insert(*id)),
            );
        }
    }
    if selected.is_empty() {
        return Ok(Vec::new());
    }

    let search = search.filter(|s| !s.is_empty()).map(|s| Filter::contains(TYPE_NAME_FIELD, s));
    let keys = selected.iter().map(|id| IndexKey::from(*id)).collect();
    let items = store.collection(builtin::INV_TYPES)?;

    let mut staged = Vec::new();
    for record in items.index_scan(MARKET_GROUP_FIELD, &IndexScan::AnyOf(keys))? {
        if let Some(filter) = &search
            && !filter.matches(record)?
        {
            continue;
        }
        staged.push(Arc::clone(record));
    }

    debug!(
        groups = selected.len(),
        include_descendants,
        staged = staged.len(),
        "staged items"
    );
    Ok(staged)
}
