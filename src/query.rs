//! Query surface
//!
//! Read-only lookups exposed upward by the orchestrator, evaluated against
//! the in-memory tables. Filters mirror the store schema: folder prefix, tag
//! membership, extension membership, file type membership, and per-field
//! frontmatter predicates.

use crate::schema::{FileRecord, FileSnapshot, LinkEdge, LinkKind};
use crate::sync::SyncOrchestrator;
use serde_json::Value;
use std::collections::BTreeMap;

/// Link traversal direction: forward follows `from`, backward follows `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkDirection {
    Forward,
    Backward,
}

/// Per-field frontmatter predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataFilter {
    /// String equality
    Text(String),
    /// Number equality
    Number(f64),
    /// `Flag(true)` matches an explicit true; `Flag(false)` matches an
    /// explicit false or an absent field.
    Flag(bool),
    /// Substring containment for array-valued fields
    Contains(String),
}

/// File query filter. All present clauses must match.
#[derive(Debug, Clone, Default)]
pub struct FileFilter {
    pub folder: Option<String>,
    pub tags: Option<Vec<String>>,
    pub extensions: Option<Vec<String>>,
    pub file_types: Option<Vec<String>>,
    pub frontmatter: BTreeMap<String, MetadataFilter>,
}

impl SyncOrchestrator {
    pub fn get_file_by_id(&self, id: &str) -> Option<&FileRecord> {
        self.files().find_by_id(id).map(|snapshot| &snapshot.record)
    }

    pub fn get_file_by_url_path(&self, url_path: &str) -> Option<&FileRecord> {
        self.files()
            .find_by_url_path(url_path)
            .map(|snapshot| &snapshot.record)
    }

    /// All files matching the filter, ordered by path.
    pub fn get_files(&self, filter: &FileFilter) -> Vec<FileRecord> {
        let mut records: Vec<FileRecord> = self
            .files()
            .iter()
            .filter(|snapshot| self.matches(snapshot, filter))
            .map(|snapshot| snapshot.record.clone())
            .collect();
        records.sort_by(|a, b| a.path.cmp(&b.path));
        records
    }

    /// All tags currently in use, sorted.
    pub fn get_tags(&self) -> Vec<String> {
        self.tag_manager().all()
    }

    /// Resolved link edges touching a file. Forward returns the file's
    /// outgoing edges, backward the edges pointing at it.
    pub fn get_links(
        &self,
        file_id: &str,
        direction: LinkDirection,
        kind: Option<LinkKind>,
    ) -> Vec<LinkEdge> {
        self.link_resolver()
            .working()
            .iter()
            .filter(|edge| match direction {
                LinkDirection::Forward => edge.from == file_id,
                LinkDirection::Backward => edge.to == file_id,
            })
            .filter(|edge| kind.map_or(true, |kind| edge.kind == kind))
            .cloned()
            .collect()
    }

    fn matches(&self, snapshot: &FileSnapshot, filter: &FileFilter) -> bool {
        let record = &snapshot.record;
        if let Some(folder) = &filter.folder {
            let prefix = format!("{}/", folder.trim_end_matches('/'));
            match &record.url_path {
                Some(url) if url.starts_with(&prefix) => {}
                _ => return false,
            }
        }
        if let Some(tags) = &filter.tags {
            let edges = self.file_tags().edges_for(&record.id);
            if !edges.iter().any(|edge| tags.contains(&edge.tag)) {
                return false;
            }
        }
        if let Some(extensions) = &filter.extensions {
            if !extensions.contains(&record.extension) {
                return false;
            }
        }
        if let Some(file_types) = &filter.file_types {
            match &record.file_type {
                Some(file_type) if file_types.contains(file_type) => {}
                _ => return false,
            }
        }
        filter
            .frontmatter
            .iter()
            .all(|(field, predicate)| matches_metadata(record.metadata.get(field), predicate))
    }
}

fn matches_metadata(value: Option<&Value>, predicate: &MetadataFilter) -> bool {
    match predicate {
        MetadataFilter::Text(expected) => {
            value.and_then(Value::as_str) == Some(expected.as_str())
        }
        MetadataFilter::Number(expected) => {
            value.and_then(Value::as_f64) == Some(*expected)
        }
        MetadataFilter::Flag(true) => value.and_then(Value::as_bool) == Some(true),
        // false matches an explicit false or an absent field
        MetadataFilter::Flag(false) => match value {
            None => true,
            Some(value) => value.as_bool() == Some(false),
        },
        MetadataFilter::Contains(needle) => match value {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .any(|item| item.contains(needle.as_str())),
            _ => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flag_false_matches_absent_field() {
        assert!(matches_metadata(None, &MetadataFilter::Flag(false)));
        assert!(matches_metadata(
            Some(&json!(false)),
            &MetadataFilter::Flag(false)
        ));
        assert!(!matches_metadata(
            Some(&json!(true)),
            &MetadataFilter::Flag(false)
        ));
    }

    #[test]
    fn flag_true_requires_explicit_true() {
        assert!(!matches_metadata(None, &MetadataFilter::Flag(true)));
        assert!(matches_metadata(
            Some(&json!(true)),
            &MetadataFilter::Flag(true)
        ));
    }

    #[test]
    fn contains_looks_inside_arrays() {
        let value = json!(["alpha", "beta"]);
        assert!(matches_metadata(
            Some(&value),
            &MetadataFilter::Contains("bet".to_string())
        ));
        assert!(!matches_metadata(
            Some(&value),
            &MetadataFilter::Contains("gamma".to_string())
        ));
        assert!(!matches_metadata(
            Some(&json!("beta")),
            &MetadataFilter::Contains("beta".to_string())
        ));
    }

    #[test]
    fn equality_predicates() {
        assert!(matches_metadata(
            Some(&json!("post")),
            &MetadataFilter::Text("post".to_string())
        ));
        assert!(matches_metadata(
            Some(&json!(3)),
            &MetadataFilter::Number(3.0)
        ));
        assert!(!matches_metadata(None, &MetadataFilter::Number(3.0)));
    }
}
