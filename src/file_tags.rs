//! File-tag association manager
//!
//! Owns the file↔tag edge table. Edges follow the owning file's tag list:
//! updates apply a create/delete diff, a file deletion removes the whole
//! per-file edge set in one sweep. `find_unused_tags` is the pure query that
//! drives the tag lifecycle sweep.

use crate::diff::{self, DiffEntry};
use crate::error::SyncError;
use crate::schema::FileTagEdge;
use crate::store::{self, Store, Table};
use crate::types::FileId;
use serde_json::json;
use std::collections::{BTreeSet, HashMap, HashSet};

#[derive(Default)]
pub struct FileTagAssociationManager {
    edges: HashMap<FileId, BTreeSet<String>>,
}

impl FileTagAssociationManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current edge set for a file, in tag order.
    pub fn edges_for(&self, file_id: &str) -> Vec<FileTagEdge> {
        self.edges
            .get(file_id)
            .map(|tags| {
                tags.iter()
                    .map(|tag| FileTagEdge {
                        file_id: file_id.to_string(),
                        tag: tag.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(BTreeSet::len).sum()
    }

    /// Apply an edge diff: deletes first, then creates. Deleting an edge that
    /// is not tracked signals an orchestration bug.
    pub fn apply_diff(
        &mut self,
        entries: &[DiffEntry<FileTagEdge>],
        store: &dyn Store,
    ) -> Result<(), SyncError> {
        for edge in diff::deletes(entries) {
            let tracked = self
                .edges
                .get_mut(&edge.file_id)
                .map(|tags| tags.remove(&edge.tag))
                .unwrap_or(false);
            if !tracked {
                return Err(SyncError::FileTagNotTracked {
                    file_id: edge.file_id,
                    tag: edge.tag,
                });
            }
            let (file_key, tag_key) = (json!(edge.file_id), json!(edge.tag));
            store.delete_where(Table::FileTags, &|row| {
                row.get("file_id") == Some(&file_key) && row.get("tag") == Some(&tag_key)
            })?;
        }

        let mut fresh = Vec::new();
        for edge in diff::creates(entries) {
            if self
                .edges
                .entry(edge.file_id.clone())
                .or_default()
                .insert(edge.tag.clone())
            {
                fresh.push(edge);
            }
        }
        if !fresh.is_empty() {
            store::insert_chunked(store, Table::FileTags, &store::to_rows(&fresh)?)?;
        }
        Ok(())
    }

    /// Remove every edge owned by a file. Not diff-based: the whole per-file
    /// edge set vanishes with the file.
    pub fn handle_file_delete(&mut self, file_id: &str, store: &dyn Store) -> Result<(), SyncError> {
        if self.edges.remove(file_id).is_some() {
            let file_key = json!(file_id);
            store.delete_where(Table::FileTags, &|row| {
                row.get("file_id") == Some(&file_key)
            })?;
        }
        Ok(())
    }

    /// Tags from `all_tags` that no edge currently references.
    pub fn find_unused_tags(&self, all_tags: &[String]) -> Vec<String> {
        let used: HashSet<&str> = self
            .edges
            .values()
            .flat_map(|tags| tags.iter().map(String::as_str))
            .collect();
        all_tags
            .iter()
            .filter(|tag| !used.contains(tag.as_str()))
            .cloned()
            .collect()
    }
}
