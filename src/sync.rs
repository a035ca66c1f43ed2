//! Sync orchestrator
//!
//! Sequences the managers per file lifecycle event so that every cross-entity
//! invariant holds after each event: tag existence tied to usage, link
//! resolution tied to file existence. The call order is fixed — file table
//! first, then tags and file-tag edges with an unused-tag sweep, then links —
//! instead of observer wiring, which keeps invariant maintenance
//! deterministic and testable in isolation.

use crate::diff;
use crate::error::SyncError;
use crate::file_tags::FileTagAssociationManager;
use crate::files::FileIndexManager;
use crate::links::LinkResolver;
use crate::schema::{FileSnapshot, RawLink};
use crate::store::Store;
use crate::tags::TagLifecycleManager;
use crate::types::FileId;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

pub struct SyncOrchestrator {
    files: FileIndexManager,
    tags: TagLifecycleManager,
    file_tags: FileTagAssociationManager,
    links: LinkResolver,
    store: Arc<dyn Store>,
}

impl SyncOrchestrator {
    pub fn new(store: Arc<dyn Store>) -> Self {
        SyncOrchestrator {
            files: FileIndexManager::new(),
            tags: TagLifecycleManager::new(),
            file_tags: FileTagAssociationManager::new(),
            links: LinkResolver::new(),
            store,
        }
    }

    pub fn files(&self) -> &FileIndexManager {
        &self.files
    }

    pub fn tag_manager(&self) -> &TagLifecycleManager {
        &self.tags
    }

    pub fn file_tags(&self) -> &FileTagAssociationManager {
        &self.file_tags
    }

    pub fn link_resolver(&self) -> &LinkResolver {
        &self.links
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    /// A file entered the collection.
    pub fn on_add(&mut self, snapshot: FileSnapshot) -> Result<(), SyncError> {
        let mut snapshot = snapshot;
        snapshot.links = dedup_links(snapshot.links);
        let id = snapshot.record.id.clone();
        let url_path = snapshot.record.url_path.clone();
        let tag_names = snapshot.tags.clone();
        let raw_links = snapshot.links.clone();
        let edges = snapshot.tag_edges();
        debug!(file = %snapshot.record.path.display(), "sync add");

        self.files.add(snapshot, self.store.as_ref())?;
        self.tags.ensure_exist(&tag_names, self.store.as_ref())?;
        self.file_tags
            .apply_diff(&diff::all_creates(&edges), self.store.as_ref())?;

        if let Some(url_path) = &url_path {
            self.links.apply_link_diff(
                &self.files,
                &id,
                url_path,
                &diff::all_creates(&raw_links),
                self.store.as_ref(),
            )?;
            // Healing runs for every created file, whether or not it has
            // outgoing links of its own.
            self.links
                .heal_on_file_add(&id, url_path, self.store.as_ref())?;
        }
        Ok(())
    }

    /// A file's content changed. A url path change is treated as
    /// delete-then-add so incoming links re-break against the old address and
    /// heal against the new one.
    pub fn on_update(&mut self, id: &FileId, snapshot: FileSnapshot) -> Result<(), SyncError> {
        let mut snapshot = snapshot;
        snapshot.links = dedup_links(snapshot.links);
        let old = self
            .files
            .find_by_id(id)
            .ok_or_else(|| SyncError::FileNotFound(id.clone()))?;

        if old.record.url_path != snapshot.record.url_path {
            debug!(file_id = %id, "url path changed, applying delete-then-add");
            self.on_delete(id)?;
            return self.on_add(snapshot);
        }

        let old_edges = old.tag_edges();
        let old_links = old.links.clone();
        let new_edges = snapshot.tag_edges();
        let new_links = snapshot.links.clone();
        let url_path = snapshot.record.url_path.clone();
        let tag_names = snapshot.tags.clone();
        debug!(file_id = %id, "sync update");

        self.files.update(id, snapshot, self.store.as_ref())?;

        self.tags.ensure_exist(&tag_names, self.store.as_ref())?;
        self.file_tags
            .apply_diff(&diff::diff(&old_edges, &new_edges), self.store.as_ref())?;
        self.sweep_unused_tags()?;

        if let Some(url_path) = &url_path {
            self.links.apply_link_diff(
                &self.files,
                id,
                url_path,
                &diff::diff(&old_links, &new_links),
                self.store.as_ref(),
            )?;
        }
        Ok(())
    }

    /// A file left the collection.
    pub fn on_delete(&mut self, id: &FileId) -> Result<FileSnapshot, SyncError> {
        let snapshot = self
            .files
            .find_by_id(id)
            .cloned()
            .ok_or_else(|| SyncError::FileNotFound(id.clone()))?;
        debug!(file = %snapshot.record.path.display(), "sync delete");

        self.file_tags
            .handle_file_delete(id, self.store.as_ref())?;
        self.sweep_unused_tags()?;

        self.links.handle_file_delete(id, self.store.as_ref())?;
        self.links.rebreak_on_file_delete(
            id,
            snapshot.record.url_path.as_deref(),
            self.store.as_ref(),
        )?;

        let snapshot = self.files.delete(id, self.store.as_ref())?;
        // on a url collision another file may still hold the address; the
        // just re-broken links heal against it
        if let Some(url) = &snapshot.record.url_path {
            let survivor = self
                .files
                .find_by_url_path(url)
                .map(|holder| holder.record.id.clone());
            if let Some(survivor) = survivor {
                self.links
                    .heal_on_file_add(&survivor, url, self.store.as_ref())?;
            }
        }
        Ok(snapshot)
    }

    /// Remove tags that lost their last edge. Candidates are recomputed from
    /// the current edge table on every call, never counted incrementally.
    fn sweep_unused_tags(&mut self) -> Result<(), SyncError> {
        let candidates = self.file_tags.find_unused_tags(&self.tags.all());
        if !candidates.is_empty() {
            self.tags
                .delete_if_unused(&candidates, self.store.as_ref())?;
        }
        Ok(())
    }
}

/// Drop duplicate raw links, keeping first occurrence. A document may repeat
/// the same reference; the index tracks one edge per distinct pair.
fn dedup_links(links: Vec<RawLink>) -> Vec<RawLink> {
    let mut seen = HashSet::new();
    links
        .into_iter()
        .filter(|link| seen.insert(link.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FileRecord, LinkKind};
    use crate::store::memory::MemoryStore;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn snapshot(id: &str, path: &str, url: &str, tags: &[&str], links: &[&str]) -> FileSnapshot {
        FileSnapshot {
            record: FileRecord {
                id: id.to_string(),
                path: PathBuf::from(path),
                extension: "md".to_string(),
                url_path: Some(url.to_string()),
                file_type: None,
                metadata: BTreeMap::new(),
                fields: BTreeMap::new(),
            },
            tags: tags.iter().map(|t| t.to_string()).collect(),
            links: links
                .iter()
                .map(|target| RawLink {
                    target: target.to_string(),
                    kind: LinkKind::Normal,
                })
                .collect(),
        }
    }

    fn orchestrator() -> (SyncOrchestrator, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        store.create_schema().unwrap();
        (SyncOrchestrator::new(store.clone()), store)
    }

    #[test]
    fn update_of_absent_file_fails() {
        let (mut sync, _) = orchestrator();
        let err = sync.on_update(&"ghost".to_string(), snapshot("ghost", "g.md", "g", &[], &[]));
        assert!(matches!(err, Err(SyncError::FileNotFound(_))));
    }

    #[test]
    fn add_then_delete_leaves_no_state() {
        let (mut sync, store) = orchestrator();
        sync.on_add(snapshot("a", "a.md", "a", &["x"], &["b"])).unwrap();
        sync.on_delete(&"a".to_string()).unwrap();

        assert!(sync.files().is_empty());
        assert!(sync.tag_manager().all().is_empty());
        assert_eq!(sync.file_tags().edge_count(), 0);
        assert!(sync.link_resolver().working().is_empty());
        assert!(sync.link_resolver().broken().is_empty());
        for table in crate::store::Table::ALL {
            assert!(store.rows(table).unwrap().is_empty(), "{:?} not empty", table);
        }
    }

    #[test]
    fn url_path_change_rebreaks_and_reheals() {
        let (mut sync, _) = orchestrator();
        sync.on_add(snapshot("a", "a.md", "a", &[], &["b"])).unwrap();
        sync.on_add(snapshot("b", "b.md", "b", &[], &[])).unwrap();
        assert_eq!(sync.link_resolver().working().len(), 1);

        // rename b's public address away from "b"
        sync.on_update(&"b".to_string(), snapshot("b", "b.md", "b2", &[], &[]))
            .unwrap();
        assert!(sync.link_resolver().working().is_empty());
        assert_eq!(sync.link_resolver().broken().len(), 1);
        assert_eq!(sync.link_resolver().broken()[0].to_path, "b");
    }

    #[test]
    fn duplicate_raw_links_survive_update_cycle() {
        let (mut sync, _) = orchestrator();
        sync.on_add(snapshot("a", "a.md", "a", &[], &["b", "b"])).unwrap();
        assert_eq!(sync.link_resolver().broken().len(), 1);

        sync.on_update(&"a".to_string(), snapshot("a", "a.md", "a", &[], &[]))
            .unwrap();
        assert!(sync.link_resolver().broken().is_empty());
    }
}
