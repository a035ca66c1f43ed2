//! Tag lifecycle manager
//!
//! Owns the global tag set. Tags are created lazily on first use and deleted
//! by an explicit sweep after edge mutations; reference counts are never
//! cached, the sweep always works from a candidate set recomputed out of the
//! current edge table.

use crate::error::SyncError;
use crate::schema::Tag;
use crate::store::{self, Store, Table};
use std::collections::BTreeSet;

#[derive(Default)]
pub struct TagLifecycleManager {
    tags: BTreeSet<String>,
}

impl TagLifecycleManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the tags that do not exist yet. Idempotent: repeated calls with
    /// overlapping sets persist each tag at most once.
    pub fn ensure_exist(&mut self, names: &[String], store: &dyn Store) -> Result<(), SyncError> {
        let mut fresh = Vec::new();
        for name in names {
            if self.tags.insert(name.clone()) {
                fresh.push(Tag { name: name.clone() });
            }
        }
        if !fresh.is_empty() {
            store::insert_chunked(store, Table::Tags, &store::to_rows(&fresh)?)?;
        }
        Ok(())
    }

    /// Remove the candidates that are currently present. The candidate set is
    /// supplied by the association manager's unused-tag query.
    pub fn delete_if_unused(
        &mut self,
        candidates: &[String],
        store: &dyn Store,
    ) -> Result<(), SyncError> {
        let doomed: BTreeSet<String> = candidates
            .iter()
            .filter(|name| self.tags.remove(*name))
            .cloned()
            .collect();
        if !doomed.is_empty() {
            store.delete_where(Table::Tags, &|row| {
                row.get("name")
                    .and_then(|value| value.as_str())
                    .map(|name| doomed.contains(name))
                    .unwrap_or(false)
            })?;
        }
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tags.contains(name)
    }

    /// All tags, sorted.
    pub fn all(&self) -> Vec<String> {
        self.tags.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn ensure_exist_is_idempotent() {
        let store = MemoryStore::new();
        store.create_schema().unwrap();
        let mut manager = TagLifecycleManager::new();

        manager.ensure_exist(&names(&["a", "b"]), &store).unwrap();
        manager.ensure_exist(&names(&["b", "c", "b"]), &store).unwrap();

        assert_eq!(manager.all(), names(&["a", "b", "c"]));
        assert_eq!(store.rows(Table::Tags).unwrap().len(), 3);
    }

    #[test]
    fn overlapping_ensure_writes_nothing_new() {
        let store = MemoryStore::new();
        store.create_schema().unwrap();
        let mut manager = TagLifecycleManager::new();
        manager.ensure_exist(&names(&["a"]), &store).unwrap();
        let writes = store.write_count();

        manager.ensure_exist(&names(&["a"]), &store).unwrap();
        assert_eq!(store.write_count(), writes);
    }

    #[test]
    fn delete_if_unused_only_touches_present_tags() {
        let store = MemoryStore::new();
        store.create_schema().unwrap();
        let mut manager = TagLifecycleManager::new();
        manager.ensure_exist(&names(&["a", "b"]), &store).unwrap();

        manager
            .delete_if_unused(&names(&["b", "ghost"]), &store)
            .unwrap();

        assert_eq!(manager.all(), names(&["a"]));
        let rows = store.rows(Table::Tags).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], serde_json::json!("a"));
    }
}
