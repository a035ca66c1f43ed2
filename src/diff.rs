//! Diff utilities
//!
//! Pure functions computing create/delete diffs between two versions of a
//! collection via structural equality. Every manager derives its minimal
//! mutation set from these instead of rebuilding tables. Deletes are emitted
//! before creates so that appliers removing stale state first cannot observe
//! a duplicate.

use serde_json::{Map, Value};

/// One entry of a collection diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffEntry<T> {
    Create(T),
    Delete(T),
}

impl<T> DiffEntry<T> {
    pub fn data(&self) -> &T {
        match self {
            DiffEntry::Create(data) | DiffEntry::Delete(data) => data,
        }
    }

    pub fn is_create(&self) -> bool {
        matches!(self, DiffEntry::Create(_))
    }
}

/// Diff two snapshots of a collection.
///
/// Items present in `old` but not `new` become deletes; items present in
/// `new` but not `old` become creates. Equality is structural.
pub fn diff<T: PartialEq + Clone>(old: &[T], new: &[T]) -> Vec<DiffEntry<T>> {
    let mut entries = Vec::new();
    for item in old {
        if !new.contains(item) {
            entries.push(DiffEntry::Delete(item.clone()));
        }
    }
    for item in new {
        if !old.contains(item) {
            entries.push(DiffEntry::Create(item.clone()));
        }
    }
    entries
}

/// Wrap every item as a create entry (diff against an empty snapshot).
pub fn all_creates<T: Clone>(items: &[T]) -> Vec<DiffEntry<T>> {
    items.iter().cloned().map(DiffEntry::Create).collect()
}

/// Wrap every item as a delete entry.
pub fn all_deletes<T: Clone>(items: &[T]) -> Vec<DiffEntry<T>> {
    items.iter().cloned().map(DiffEntry::Delete).collect()
}

/// Extract the create payloads from a diff.
pub fn creates<T: Clone>(entries: &[DiffEntry<T>]) -> Vec<T> {
    entries
        .iter()
        .filter_map(|entry| match entry {
            DiffEntry::Create(data) => Some(data.clone()),
            DiffEntry::Delete(_) => None,
        })
        .collect()
}

/// Extract the delete payloads from a diff.
pub fn deletes<T: Clone>(entries: &[DiffEntry<T>]) -> Vec<T> {
    entries
        .iter()
        .filter_map(|entry| match entry {
            DiffEntry::Delete(data) => Some(data.clone()),
            DiffEntry::Create(_) => None,
        })
        .collect()
}

/// Field-level diff of two JSON objects.
///
/// Returns the keys of `new` whose values changed or are newly present.
/// An empty result means the two objects describe the same row and no
/// persistence write is needed.
pub fn field_diff(old: &Map<String, Value>, new: &Map<String, Value>) -> Map<String, Value> {
    let mut changed = Map::new();
    for (key, value) in new {
        if old.get(key) != Some(value) {
            changed.insert(key.clone(), value.clone());
        }
    }
    changed
}

/// Apply a diff back onto a snapshot. Used by tests to check that a diff
/// carries exactly the information separating the two snapshots.
pub fn apply<T: PartialEq + Clone>(snapshot: &[T], entries: &[DiffEntry<T>]) -> Vec<T> {
    let mut result: Vec<T> = snapshot.to_vec();
    for entry in entries {
        match entry {
            DiffEntry::Delete(data) => {
                if let Some(pos) = result.iter().position(|item| item == data) {
                    result.remove(pos);
                }
            }
            DiffEntry::Create(data) => result.push(data.clone()),
        }
    }
    result
}
