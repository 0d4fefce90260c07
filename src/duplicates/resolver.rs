//! Duplicate-set resolution and keeper selection.
//!
//! Partitions a library's items into duplicate sets by grouping key.
//! Insertion order of first key occurrence is preserved so two runs over
//! unchanged input produce identical output ordering, and the keeper choice
//! is fully deterministic: oldest `added_at` first, item id as the
//! tie-breaker.

use std::collections::HashMap;

use crate::catalog::LibraryItem;
use crate::duplicates::key::{build_key, GroupKey, GroupMode};
use crate::error::PruneError;

/// A non-empty group of items sharing a grouping key, with exactly one
/// designated keeper.
#[derive(Debug, Clone)]
pub struct DuplicateSet {
    /// The shared grouping key.
    pub key: GroupKey,
    /// Members in catalog listing order.
    pub items: Vec<LibraryItem>,
    /// Id of the keeper (oldest by `added_at`, ties broken by id).
    pub keeper_id: String,
}

impl DuplicateSet {
    /// The designated keeper.
    ///
    /// # Panics
    ///
    /// Panics if the keeper id is not a member; `resolve` guarantees it is.
    #[must_use]
    pub fn keeper(&self) -> &LibraryItem {
        self.items
            .iter()
            .find(|it| it.id == self.keeper_id)
            .expect("keeper is a member of its set")
    }

    /// Members other than the keeper.
    pub fn candidates(&self) -> impl Iterator<Item = &LibraryItem> {
        self.items.iter().filter(move |it| it.id != self.keeper_id)
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// A duplicate set is never empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Outcome of resolving a library's items.
#[derive(Debug, Default)]
pub struct ResolveOutcome {
    /// Duplicate sets in first-occurrence order. Singletons are excluded.
    pub sets: Vec<DuplicateSet>,
    /// Items excluded for incomplete metadata, with the recorded error.
    pub skipped: Vec<PruneError>,
}

/// Select the keeper among `items`: oldest `added_at`, id as tie-breaker.
///
/// # Panics
///
/// Panics on an empty slice; callers only pass non-empty groups.
#[must_use]
pub fn choose_keeper(items: &[LibraryItem]) -> &LibraryItem {
    items
        .iter()
        .min_by(|a, b| a.added_at.cmp(&b.added_at).then_with(|| a.id.cmp(&b.id)))
        .expect("non-empty group")
}

/// Partition `items` into duplicate sets.
///
/// Items whose key cannot be built (missing title) are excluded and
/// reported in [`ResolveOutcome::skipped`]; they never abort the run.
#[must_use]
pub fn resolve(
    items: &[LibraryItem],
    mode: GroupMode,
    ignore_prefix: bool,
    case_sensitive: bool,
) -> ResolveOutcome {
    let mut order: Vec<GroupKey> = Vec::new();
    let mut groups: HashMap<GroupKey, Vec<LibraryItem>> = HashMap::new();
    let mut skipped = Vec::new();

    for item in items {
        match build_key(item, mode, ignore_prefix, case_sensitive) {
            Ok(key) => {
                let members = groups.entry(key.clone()).or_insert_with(|| {
                    order.push(key);
                    Vec::new()
                });
                members.push(item.clone());
            }
            Err(err) => {
                log::warn!("Excluding item from grouping: {err}");
                skipped.push(err);
            }
        }
    }

    let mut sets = Vec::new();
    for key in order {
        let members = groups.remove(&key).unwrap_or_default();
        if members.len() <= 1 {
            continue;
        }
        let keeper_id = choose_keeper(&members).id.clone();
        log::debug!(
            "Duplicate set '{}': {} copies, keeper {}",
            key.title,
            members.len(),
            keeper_id
        );
        sets.push(DuplicateSet {
            key,
            items: members,
            keeper_id,
        });
    }

    sets
        .iter()
        .for_each(|s| debug_assert!(s.items.iter().any(|it| it.id == s.keeper_id)));

    ResolveOutcome { sets, skipped }
}
