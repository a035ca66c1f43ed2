//! File index manager
//!
//! Owns the canonical table of file records together with each file's tag and
//! raw-link snapshot, which the orchestrator diffs against on update. Lookup
//! by id, path, and url path goes through owned hash indexes so that link
//! resolution stays O(1) on multi-thousand-document collections.

use crate::diff::field_diff;
use crate::error::SyncError;
use crate::schema::FileSnapshot;
use crate::store::{self, Store, Table};
use crate::types::FileId;
use serde_json::json;
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Default)]
pub struct FileIndexManager {
    files: HashMap<FileId, FileSnapshot>,
    /// Reverse index: path -> FileId (path uniqueness)
    by_path: HashMap<PathBuf, FileId>,
    /// Reverse index: url_path -> FileId (link resolution join key)
    by_url_path: HashMap<String, FileId>,
}

impl FileIndexManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Add a new file. Fails if the id or the path is already indexed.
    pub fn add(&mut self, snapshot: FileSnapshot, store: &dyn Store) -> Result<(), SyncError> {
        let id = snapshot.record.id.clone();
        if self.files.contains_key(&id) {
            return Err(SyncError::DuplicateId(id));
        }
        if self.by_path.contains_key(&snapshot.record.path) {
            return Err(SyncError::DuplicatePath(snapshot.record.path.clone()));
        }

        let row = store::to_row(&snapshot.record)?;
        self.by_path.insert(snapshot.record.path.clone(), id.clone());
        if let Some(url) = &snapshot.record.url_path {
            // url paths may collide (e.g. index.md and index.mdx); the first
            // holder keeps the entry and a survivor takes over on delete
            self.by_url_path
                .entry(url.clone())
                .or_insert_with(|| id.clone());
        }
        self.files.insert(id, snapshot);
        store.insert_many(Table::Files, &[row])?;
        Ok(())
    }

    /// Replace a file's snapshot, persisting only the fields that changed.
    ///
    /// Returns the previous snapshot so the caller can diff tag and link
    /// lists. An empty field diff issues no store write.
    pub fn update(
        &mut self,
        id: &FileId,
        snapshot: FileSnapshot,
        store: &dyn Store,
    ) -> Result<FileSnapshot, SyncError> {
        if !self.files.contains_key(id) {
            return Err(SyncError::FileNotFound(id.clone()));
        }

        let Some(old) = self.files.insert(id.clone(), snapshot.clone()) else {
            return Err(SyncError::FileNotFound(id.clone()));
        };
        if old.record.path != snapshot.record.path {
            self.by_path.remove(&old.record.path);
            self.by_path.insert(snapshot.record.path.clone(), id.clone());
        }
        if old.record.url_path != snapshot.record.url_path {
            if let Some(url) = &old.record.url_path {
                self.repoint_url(url, id);
            }
            if let Some(url) = &snapshot.record.url_path {
                self.by_url_path
                    .entry(url.clone())
                    .or_insert_with(|| id.clone());
            }
        }

        let old_row = store::to_row(&old.record)?;
        let new_row = store::to_row(&snapshot.record)?;
        let changed = field_diff(&old_row, &new_row);
        if !changed.is_empty() {
            let key = json!(id);
            store.update_fields(Table::Files, &|row| row.get("id") == Some(&key), &changed)?;
        }
        Ok(old)
    }

    /// Remove a file. Fails if the id is not indexed.
    pub fn delete(&mut self, id: &FileId, store: &dyn Store) -> Result<FileSnapshot, SyncError> {
        let snapshot = self
            .files
            .remove(id)
            .ok_or_else(|| SyncError::FileNotFound(id.clone()))?;
        self.by_path.remove(&snapshot.record.path);
        if let Some(url) = &snapshot.record.url_path {
            self.repoint_url(url, id);
        }
        let key = json!(id);
        store.delete_where(Table::Files, &|row| row.get("id") == Some(&key))?;
        Ok(snapshot)
    }

    /// Drop or hand over a url index entry once `leaving` stops holding the
    /// url. Another indexed file sharing the url becomes the holder.
    fn repoint_url(&mut self, url: &str, leaving: &str) {
        if self.by_url_path.get(url).map(String::as_str) != Some(leaving) {
            return;
        }
        let successor = self
            .files
            .values()
            .find(|snapshot| snapshot.record.url_path.as_deref() == Some(url))
            .map(|snapshot| snapshot.record.id.clone());
        match successor {
            Some(id) => {
                self.by_url_path.insert(url.to_string(), id);
            }
            None => {
                self.by_url_path.remove(url);
            }
        }
    }

    pub fn find_by_id(&self, id: &str) -> Option<&FileSnapshot> {
        self.files.get(id)
    }

    pub fn find_by_url_path(&self, url_path: &str) -> Option<&FileSnapshot> {
        self.by_url_path
            .get(url_path)
            .and_then(|id| self.files.get(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileSnapshot> {
        self.files.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FileRecord, FileSnapshot};
    use crate::store::memory::MemoryStore;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn snapshot(id: &str, path: &str, url: Option<&str>) -> FileSnapshot {
        FileSnapshot {
            record: FileRecord {
                id: id.to_string(),
                path: PathBuf::from(path),
                extension: "md".to_string(),
                url_path: url.map(str::to_string),
                file_type: None,
                metadata: BTreeMap::new(),
                fields: BTreeMap::new(),
            },
            tags: vec![],
            links: vec![],
        }
    }

    #[test]
    fn add_rejects_duplicate_id_and_path() {
        let store = MemoryStore::new();
        store.create_schema().unwrap();
        let mut manager = FileIndexManager::new();
        manager.add(snapshot("f1", "a.md", Some("a")), &store).unwrap();

        let err = manager.add(snapshot("f1", "other.md", None), &store);
        assert!(matches!(err, Err(SyncError::DuplicateId(_))));

        let err = manager.add(snapshot("f2", "a.md", None), &store);
        assert!(matches!(err, Err(SyncError::DuplicatePath(_))));
    }

    #[test]
    fn update_persists_only_changed_fields() {
        let store = MemoryStore::new();
        store.create_schema().unwrap();
        let mut manager = FileIndexManager::new();
        manager.add(snapshot("f1", "a.md", Some("a")), &store).unwrap();

        let mut updated = snapshot("f1", "a.md", Some("a"));
        updated.record.metadata.insert("title".into(), json!("hello"));
        manager.update(&"f1".to_string(), updated, &store).unwrap();

        let rows = store.rows(Table::Files).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["metadata"], json!({ "title": "hello" }));
        // one insert plus one single-row patch
        assert_eq!(store.write_count(), 2);
    }

    #[test]
    fn unchanged_update_issues_no_write() {
        let store = MemoryStore::new();
        store.create_schema().unwrap();
        let mut manager = FileIndexManager::new();
        manager.add(snapshot("f1", "a.md", Some("a")), &store).unwrap();
        let writes = store.write_count();

        manager
            .update(&"f1".to_string(), snapshot("f1", "a.md", Some("a")), &store)
            .unwrap();
        assert_eq!(store.write_count(), writes);
    }

    #[test]
    fn update_and_delete_of_absent_file_fail() {
        let store = MemoryStore::new();
        store.create_schema().unwrap();
        let mut manager = FileIndexManager::new();

        let err = manager.update(&"ghost".to_string(), snapshot("ghost", "g.md", None), &store);
        assert!(matches!(err, Err(SyncError::FileNotFound(_))));
        let err = manager.delete(&"ghost".to_string(), &store);
        assert!(matches!(err, Err(SyncError::FileNotFound(_))));
    }

    #[test]
    fn url_collision_keeps_first_holder_and_hands_over_on_delete() {
        let store = MemoryStore::new();
        store.create_schema().unwrap();
        let mut manager = FileIndexManager::new();
        manager.add(snapshot("f1", "index.md", Some("/")), &store).unwrap();
        manager.add(snapshot("f2", "index.mdx", Some("/")), &store).unwrap();
        assert_eq!(manager.find_by_url_path("/").unwrap().record.id, "f1");

        // the later arrival leaves: the holder is untouched
        manager.delete(&"f2".to_string(), &store).unwrap();
        assert_eq!(manager.find_by_url_path("/").unwrap().record.id, "f1");

        // the holder leaves: the survivor takes over
        manager.add(snapshot("f2", "index.mdx", Some("/")), &store).unwrap();
        manager.delete(&"f1".to_string(), &store).unwrap();
        assert_eq!(manager.find_by_url_path("/").unwrap().record.id, "f2");

        manager.delete(&"f2".to_string(), &store).unwrap();
        assert!(manager.find_by_url_path("/").is_none());
    }

    #[test]
    fn delete_clears_url_index() {
        let store = MemoryStore::new();
        store.create_schema().unwrap();
        let mut manager = FileIndexManager::new();
        manager.add(snapshot("f1", "a.md", Some("a")), &store).unwrap();
        assert!(manager.find_by_url_path("a").is_some());

        manager.delete(&"f1".to_string(), &store).unwrap();
        assert!(manager.find_by_url_path("a").is_none());
        assert!(store.rows(Table::Files).unwrap().is_empty());
    }
}
