//! Shared helpers for rebuilding parents from child-ID arrays.

use super::{RepoError, RepoResult};
use crate::store::links::ChildLink;
use crate::store::{CollectionKind, Record, Records, WriteTx};
use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::hash::Hash;

/// Union of child IDs referenced by `rows`, in first-seen order.
pub(crate) fn child_id_union<'r, R: 'r, K>(
    rows: impl IntoIterator<Item = &'r R>,
    child_ids: impl Fn(&'r R) -> &'r [K],
) -> Vec<K>
where
    K: Copy + Eq + Hash + 'r,
{
    let mut seen = HashSet::new();
    let mut union = Vec::new();
    for row in rows {
        for id in child_ids(row) {
            if seen.insert(*id) {
                union.push(*id);
            }
        }
    }
    union
}

/// Indexes hydrated children by ID.
pub(crate) fn index_by_id<M, K: Eq + Hash>(
    children: Vec<M>,
    id_of: impl Fn(&M) -> K,
) -> HashMap<K, M> {
    children
        .into_iter()
        .map(|child| (id_of(&child), child))
        .collect()
}

/// Picks `ids` out of `index` in order, dropping the ones that did not resolve.
pub(crate) fn in_stored_order<M: Clone, K: Eq + Hash>(ids: &[K], index: &HashMap<K, M>) -> Vec<M> {
    ids.iter().filter_map(|id| index.get(id).cloned()).collect()
}

/// IDs present in `previous` but not in `current`.
pub(crate) fn dropped_ids<K: Copy + Eq + Hash>(previous: &[K], current: &[K]) -> Vec<K> {
    let kept: HashSet<&K> = current.iter().collect();
    previous
        .iter()
        .filter(|id| !kept.contains(id))
        .copied()
        .collect()
}

/// Fails with [`RepoError::DanglingReference`] unless every ID in `child_ids`
/// resolves in `children`.
pub(crate) fn ensure_resolved<R: Record>(
    children: &Records<'_, R>,
    parent: CollectionKind,
    parent_id: impl ToString,
    child_ids: &[R::Id],
) -> RepoResult<()> {
    if child_ids.is_empty() {
        return Ok(());
    }
    let expected = child_ids
        .iter()
        .map(ToString::to_string)
        .collect::<HashSet<_>>()
        .len();
    if children.count_existing(child_ids)? == expected {
        return Ok(());
    }

    let resolved = children.bulk_get(child_ids)?;
    let missing = child_ids
        .iter()
        .zip(resolved)
        .find(|(_, row)| row.is_none())
        .map(|(id, _)| id.to_string())
        .unwrap_or_default();
    Err(RepoError::DanglingReference {
        parent,
        parent_id: parent_id.to_string(),
        child: R::COLLECTION,
        child_id: missing,
    })
}

/// Fails with [`RepoError::ChildClaimed`] when a parent other than
/// `parent_id` already lists one of `child_ids` under `link`.
pub(crate) fn ensure_unclaimed<K: Display>(
    tx: &WriteTx<'_>,
    link: ChildLink,
    parent_id: impl ToString,
    child_ids: &[K],
) -> RepoResult<()> {
    if child_ids.is_empty() {
        return Ok(());
    }
    let keys: Vec<String> = child_ids.iter().map(ToString::to_string).collect();
    match link.foreign_claim(tx.connection(), &parent_id.to_string(), &keys)? {
        None => Ok(()),
        Some(claim) => Err(RepoError::ChildClaimed {
            child: link.child,
            child_id: claim.child_id,
            owner: link.parent,
            owner_id: claim.parent_id,
        }),
    }
}
