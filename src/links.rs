//! Link resolver
//!
//! Classifies every raw link extracted from a file as working, broken, or
//! external, and keeps that classification correct as the file population
//! changes. A tracked (source, target) reference is represented by exactly
//! one of {working edge, broken edge} at any time; external URLs are a fixed
//! pass-through class with no broken/healing lifecycle.

use crate::diff::{self, DiffEntry};
use crate::error::SyncError;
use crate::files::FileIndexManager;
use crate::schema::{BrokenLinkEdge, ExternalLinkEdge, LinkEdge, RawLink};
use crate::store::{self, Store, Table};
use serde_json::json;
use tracing::debug;

/// Absolute URLs bypass resolution entirely.
pub fn is_external(target: &str) -> bool {
    target.contains("://")
}

/// Resolve a raw target relative to the directory component of the source's
/// url path, with standard path-join semantics over `/`-separated segments.
/// An absolute target (leading `/`) ignores the source directory.
pub fn resolve_url_path(source_url_path: &str, target: &str) -> String {
    let mut stack: Vec<&str> = source_url_path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect();
    stack.pop();
    if target.starts_with('/') {
        stack.clear();
    }
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            other => stack.push(other),
        }
    }
    stack.join("/")
}

/// Outcome of resolving one raw link.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedTarget {
    Working(LinkEdge),
    Broken(BrokenLinkEdge),
    External(ExternalLinkEdge),
}

#[derive(Default)]
pub struct LinkResolver {
    links: Vec<LinkEdge>,
    broken: Vec<BrokenLinkEdge>,
    external: Vec<ExternalLinkEdge>,
}

impl LinkResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn working(&self) -> &[LinkEdge] {
        &self.links
    }

    pub fn broken(&self) -> &[BrokenLinkEdge] {
        &self.broken
    }

    pub fn external(&self) -> &[ExternalLinkEdge] {
        &self.external
    }

    /// Classify one raw link against the current file population.
    pub fn resolve(
        &self,
        files: &FileIndexManager,
        source_id: &str,
        source_url_path: &str,
        raw: &RawLink,
    ) -> ResolvedTarget {
        if is_external(&raw.target) {
            return ResolvedTarget::External(ExternalLinkEdge {
                from: source_id.to_string(),
                url: raw.target.clone(),
                kind: raw.kind,
            });
        }
        let dest = resolve_url_path(source_url_path, &raw.target);
        match files.find_by_url_path(&dest) {
            Some(target) => ResolvedTarget::Working(LinkEdge {
                from: source_id.to_string(),
                to: target.record.id.clone(),
                kind: raw.kind,
            }),
            None => ResolvedTarget::Broken(BrokenLinkEdge {
                from: source_id.to_string(),
                to_path: dest,
                kind: raw.kind,
            }),
        }
    }

    /// Resolve every entry of a raw-link diff and apply it to the edge table
    /// it belongs to. Because heal/rebreak run on every population change,
    /// resolving a delete entry against the current population always lands
    /// on the same class its tracked edge lives in.
    pub fn apply_link_diff(
        &mut self,
        files: &FileIndexManager,
        file_id: &str,
        url_path: &str,
        entries: &[DiffEntry<RawLink>],
        store: &dyn Store,
    ) -> Result<(), SyncError> {
        let mut working = Vec::new();
        let mut broken = Vec::new();
        let mut external = Vec::new();
        for entry in entries {
            let resolved = self.resolve(files, file_id, url_path, entry.data());
            match (entry.is_create(), resolved) {
                (true, ResolvedTarget::Working(edge)) => working.push(DiffEntry::Create(edge)),
                (false, ResolvedTarget::Working(edge)) => working.push(DiffEntry::Delete(edge)),
                (true, ResolvedTarget::Broken(edge)) => broken.push(DiffEntry::Create(edge)),
                (false, ResolvedTarget::Broken(edge)) => broken.push(DiffEntry::Delete(edge)),
                (true, ResolvedTarget::External(edge)) => external.push(DiffEntry::Create(edge)),
                (false, ResolvedTarget::External(edge)) => external.push(DiffEntry::Delete(edge)),
            }
        }

        apply_edge_diff(&mut self.links, &working, Table::Links, store, |edge| {
            SyncError::LinkNotTracked {
                from: edge.from.clone(),
                to: edge.to.clone(),
            }
        })?;
        apply_edge_diff(&mut self.broken, &broken, Table::BrokenLinks, store, |edge| {
            SyncError::BrokenLinkNotTracked {
                from: edge.from.clone(),
                to_path: edge.to_path.clone(),
            }
        })?;
        apply_edge_diff(
            &mut self.external,
            &external,
            Table::ExternalLinks,
            store,
            |edge| SyncError::ExternalLinkNotTracked {
                from: edge.from.clone(),
                url: edge.url.clone(),
            },
        )
    }

    /// Heal every broken link whose target path matches a newly created
    /// file's url path. Runs for every created file, whether or not that file
    /// has outgoing links of its own.
    pub fn heal_on_file_add(
        &mut self,
        created_id: &str,
        created_url_path: &str,
        store: &dyn Store,
    ) -> Result<usize, SyncError> {
        let healed: Vec<BrokenLinkEdge> = self
            .broken
            .iter()
            .filter(|edge| edge.to_path == created_url_path)
            .cloned()
            .collect();
        if healed.is_empty() {
            return Ok(0);
        }

        let new_links: Vec<LinkEdge> = healed
            .iter()
            .map(|edge| LinkEdge {
                from: edge.from.clone(),
                to: created_id.to_string(),
                kind: edge.kind,
            })
            .collect();

        apply_edge_diff(
            &mut self.broken,
            &diff::all_deletes(&healed),
            Table::BrokenLinks,
            store,
            |edge| SyncError::BrokenLinkNotTracked {
                from: edge.from.clone(),
                to_path: edge.to_path.clone(),
            },
        )?;
        apply_edge_diff(
            &mut self.links,
            &diff::all_creates(&new_links),
            Table::Links,
            store,
            |edge| SyncError::LinkNotTracked {
                from: edge.from.clone(),
                to: edge.to.clone(),
            },
        )?;
        debug!(url_path = created_url_path, count = healed.len(), "healed broken links");
        Ok(healed.len())
    }

    /// Re-break every working link pointing at a deleted file.
    pub fn rebreak_on_file_delete(
        &mut self,
        deleted_id: &str,
        deleted_url_path: Option<&str>,
        store: &dyn Store,
    ) -> Result<usize, SyncError> {
        let incoming: Vec<LinkEdge> = self
            .links
            .iter()
            .filter(|edge| edge.to == deleted_id)
            .cloned()
            .collect();
        if incoming.is_empty() {
            return Ok(0);
        }

        apply_edge_diff(
            &mut self.links,
            &diff::all_deletes(&incoming),
            Table::Links,
            store,
            |edge| SyncError::LinkNotTracked {
                from: edge.from.clone(),
                to: edge.to.clone(),
            },
        )?;

        if let Some(url_path) = deleted_url_path {
            let rebroken: Vec<BrokenLinkEdge> = incoming
                .iter()
                .map(|edge| BrokenLinkEdge {
                    from: edge.from.clone(),
                    to_path: url_path.to_string(),
                    kind: edge.kind,
                })
                .collect();
            apply_edge_diff(
                &mut self.broken,
                &diff::all_creates(&rebroken),
                Table::BrokenLinks,
                store,
                |edge| SyncError::BrokenLinkNotTracked {
                    from: edge.from.clone(),
                    to_path: edge.to_path.clone(),
                },
            )?;
            debug!(url_path, count = incoming.len(), "re-broke incoming links");
        }
        Ok(incoming.len())
    }

    /// Discard every outgoing edge of a deleted file, across all three
    /// classes. A deleted source's references are no longer tracked.
    pub fn handle_file_delete(&mut self, file_id: &str, store: &dyn Store) -> Result<(), SyncError> {
        self.links.retain(|edge| edge.from != file_id);
        self.broken.retain(|edge| edge.from != file_id);
        self.external.retain(|edge| edge.from != file_id);
        let key = json!(file_id);
        for table in [Table::Links, Table::BrokenLinks, Table::ExternalLinks] {
            store.delete_where(table, &|row| row.get("from") == Some(&key))?;
        }
        Ok(())
    }
}

fn apply_edge_diff<T, E>(
    tracked: &mut Vec<T>,
    entries: &[DiffEntry<T>],
    table: Table,
    store: &dyn Store,
    not_tracked: E,
) -> Result<(), SyncError>
where
    T: Clone + PartialEq + serde::Serialize,
    E: Fn(&T) -> SyncError,
{
    for edge in diff::deletes(entries) {
        let pos = tracked
            .iter()
            .position(|candidate| *candidate == edge)
            .ok_or_else(|| not_tracked(&edge))?;
        tracked.remove(pos);
        let row = store::to_row(&edge)?;
        store.delete_where(table, &|candidate| *candidate == row)?;
    }

    let mut fresh = Vec::new();
    for edge in diff::creates(entries) {
        if !tracked.contains(&edge) {
            tracked.push(edge.clone());
            fresh.push(edge);
        }
    }
    if !fresh.is_empty() {
        store::insert_chunked(store, table, &store::to_rows(&fresh)?)?;
    }
    Ok(())
}
