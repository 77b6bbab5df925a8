//! Old-id to new-id bookkeeping for re-creating a space tree in another account.
//!
//! A [`RemapTable`] is seeded from a snapshot, pre-resolved once, then updated
//! as each space is created so that later children can declare their parent's
//! *new* id. [`creation_order`] yields an order in which every parent is
//! created before its children; walking the snapshot in its own order instead
//! leaves children listed ahead of their parent without a resolvable parent.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::model::SpaceRecord;

/// Parent reference of one space during a migration run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "id", rename_all = "snake_case")]
pub enum ParentRef {
    Root,
    /// Old parent id whose replacement has not been created yet.
    Pending(String),
    /// New id of the already-created parent.
    Resolved(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemapEntry {
    pub old: String,
    pub parent: ParentRef,
    pub new: Option<String>,
}

/// Remap entries keyed by old space id. Owned by a single run, never persisted.
#[derive(Debug, Default)]
pub struct RemapTable {
    entries: HashMap<String, RemapEntry>,
}

impl RemapTable {
    /// Pass 1: one entry per record, parent still expressed as the old id.
    pub fn seed(spaces: &[SpaceRecord]) -> Self {
        let entries = spaces
            .iter()
            .map(|space| {
                let parent = match &space.parent {
                    Some(parent) => ParentRef::Pending(parent.clone()),
                    None => ParentRef::Root,
                };
                let entry = RemapEntry {
                    old: space.id.clone(),
                    parent,
                    new: None,
                };
                (space.id.clone(), entry)
            })
            .collect();
        Self { entries }
    }

    /// Pass 2: swap every pending parent whose replacement already exists.
    ///
    /// Nothing has been created when this runs at the start of an import, so it
    /// only has an effect on a table that already recorded creations.
    pub fn pre_resolve(&mut self) {
        let created: HashMap<String, String> = self
            .entries
            .values()
            .filter_map(|entry| entry.new.clone().map(|new| (entry.old.clone(), new)))
            .collect();

        for entry in self.entries.values_mut() {
            if let ParentRef::Pending(old_parent) = &entry.parent
                && let Some(new_parent) = created.get(old_parent)
            {
                entry.parent = ParentRef::Resolved(new_parent.clone());
            }
        }
    }

    /// Pass 3: remember the id the destination assigned to `old_id`.
    pub fn record_created(&mut self, old_id: &str, new_id: impl Into<String>) {
        if let Some(entry) = self.entries.get_mut(old_id) {
            entry.new = Some(new_id.into());
        }
    }

    /// New parent id `old_id` must declare right now, if its parent exists yet.
    ///
    /// Unknown ids and parents that have not been created resolve to `None`.
    pub fn resolve_parent(&mut self, old_id: &str) -> Option<String> {
        let pending = match &self.entries.get(old_id)?.parent {
            ParentRef::Root => return None,
            ParentRef::Resolved(new_parent) => return Some(new_parent.clone()),
            ParentRef::Pending(old_parent) => old_parent.clone(),
        };

        let new_parent = self.entries.get(&pending)?.new.clone()?;
        if let Some(entry) = self.entries.get_mut(old_id) {
            entry.parent = ParentRef::Resolved(new_parent.clone());
        }
        Some(new_parent)
    }

    pub fn get(&self, old_id: &str) -> Option<&RemapEntry> {
        self.entries.get(old_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Snapshot indices ordered so every parent precedes its children.
///
/// Peers keep snapshot order. Parents outside the snapshot impose no
/// constraint. Records caught in a parent cycle are appended in snapshot order.
pub fn creation_order(spaces: &[SpaceRecord]) -> Vec<usize> {
    let count = spaces.len();
    let index_of: HashMap<&str, usize> = spaces
        .iter()
        .enumerate()
        .map(|(idx, space)| (space.id.as_str(), idx))
        .collect();

    let mut children = vec![Vec::new(); count];
    let mut waiting = vec![false; count];
    for (idx, space) in spaces.iter().enumerate() {
        if let Some(&parent) = space.parent.as_deref().and_then(|p| index_of.get(p))
            && parent != idx
        {
            children[parent].push(idx);
            waiting[idx] = true;
        }
    }

    let mut ready: Vec<usize> = (0..count).filter(|idx| !waiting[*idx]).collect();
    let mut order = Vec::with_capacity(count);
    while !ready.is_empty() {
        let next = ready.remove(0);
        order.push(next);
        for &child in &children[next] {
            waiting[child] = false;
            ready.push(child);
        }
        ready.sort_unstable();
    }

    if order.len() != count {
        let placed: HashSet<usize> = order.iter().copied().collect();
        order.extend((0..count).filter(|idx| !placed.contains(idx)));
    }

    order
}
