//! Index schema: the row types tracked by the managers and persisted to the
//! store. File ids are content-addressed (derived from the file path), so a
//! record keeps the same id across content edits and a new id after a move.

use crate::types::{FileId, Metadata};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Canonical file record.
///
/// `id` and `path` are unique across the index. `url_path` is the nullable
/// public address used as the join key for link resolution. `fields` carries
/// caller-extensible computed values and is flattened into the persisted row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: FileId,
    pub path: PathBuf,
    pub extension: String,
    pub url_path: Option<String>,
    pub file_type: Option<String>,
    pub metadata: Metadata,
    #[serde(flatten)]
    pub fields: BTreeMap<String, serde_json::Value>,
}

/// A tag. Exists iff at least one file-tag edge references it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
}

/// File-to-tag association edge, unique per (file, tag) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileTagEdge {
    pub file_id: FileId,
    pub tag: String,
}

/// Link kind, as extracted from the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    Normal,
    Embed,
}

/// Resolved link edge. Both endpoints exist in the index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkEdge {
    pub from: FileId,
    pub to: FileId,
    pub kind: LinkKind,
}

/// Broken link edge: a reference to a url path not currently indexed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BrokenLinkEdge {
    pub from: FileId,
    pub to_path: String,
    pub kind: LinkKind,
}

/// External link edge: an absolute URL outside the collection. Pass-through,
/// no broken/healing lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExternalLinkEdge {
    pub from: FileId,
    pub url: String,
    pub kind: LinkKind,
}

/// Raw link as extracted from a document, before resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawLink {
    pub target: String,
    pub kind: LinkKind,
}

/// Extracted view of a single file: the record plus the tag and raw-link
/// lists the managers diff against on update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSnapshot {
    pub record: FileRecord,
    pub tags: Vec<String>,
    pub links: Vec<RawLink>,
}

impl FileSnapshot {
    /// Edge set derived from this snapshot's tag list.
    pub fn tag_edges(&self) -> Vec<FileTagEdge> {
        let mut seen = std::collections::HashSet::new();
        self.tags
            .iter()
            .filter(|tag| seen.insert(tag.as_str()))
            .map(|tag| FileTagEdge {
                file_id: self.record.id.clone(),
                tag: tag.clone(),
            })
            .collect()
    }
}
