use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// One content space as reported by an account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpaceRecord {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

impl SpaceRecord {
    pub fn new(id: impl Into<String>, title: impl Into<String>, parent: Option<&str>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            parent: parent.map(String::from),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Organization {
    pub id: String,
}

/// Flat, ordered list of spaces captured from one account at one point in time.
///
/// Serialized as a bare JSON array so the cache file stays a plain list of
/// `{id, title, parent?}` objects.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct InventorySnapshot {
    spaces: Vec<SpaceRecord>,
}

impl InventorySnapshot {
    pub fn new(spaces: Vec<SpaceRecord>) -> Self {
        Self { spaces }
    }

    pub fn spaces(&self) -> &[SpaceRecord] {
        &self.spaces
    }

    pub fn len(&self) -> usize {
        self.spaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spaces.is_empty()
    }

    /// Indices of records whose parent is absent or not part of this snapshot.
    pub fn roots(&self) -> Vec<usize> {
        let known: HashSet<&str> = self.spaces.iter().map(|s| s.id.as_str()).collect();
        self.spaces
            .iter()
            .enumerate()
            .filter(|(_, space)| {
                space
                    .parent
                    .as_deref()
                    .is_none_or(|parent| !known.contains(parent))
            })
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Child indices for every parent id, in snapshot order.
    pub fn children_by_parent(&self) -> HashMap<&str, Vec<usize>> {
        let mut children: HashMap<&str, Vec<usize>> = HashMap::new();
        for (idx, space) in self.spaces.iter().enumerate() {
            if let Some(parent) = space.parent.as_deref() {
                children.entry(parent).or_default().push(idx);
            }
        }
        children
    }
}

impl<'a> IntoIterator for &'a InventorySnapshot {
    type Item = &'a SpaceRecord;
    type IntoIter = std::slice::Iter<'a, SpaceRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.spaces.iter()
    }
}
