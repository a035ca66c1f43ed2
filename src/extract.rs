//! Content extraction interface
//!
//! Parsing of raw document text lives outside the engine; the orchestrator
//! only sees [`FileSnapshot`]s produced by a [`ContentExtractor`]. This module
//! carries the interface plus the deterministic derivations shared by every
//! extractor: content-addressed file ids and the default path-to-url mapping.

use crate::error::SyncError;
use crate::schema::FileSnapshot;
use crate::types::FileId;
use std::path::{Path, PathBuf};

/// Extensions whose content gets parsed; anything else is indexed as a bare
/// record with no tags or links.
pub const SUPPORTED_EXTENSIONS: [&str; 2] = ["md", "mdx"];

/// External collaborator turning a file on disk into an index snapshot.
///
/// `known_paths` is the full set of paths in the current indexing pass, for
/// extractors that resolve short-form references against the collection.
pub trait ContentExtractor: Send + Sync {
    fn extract(
        &self,
        folder: &Path,
        path: &Path,
        known_paths: &[PathBuf],
    ) -> Result<FileSnapshot, SyncError>;
}

/// Deterministic file id: blake3 of the path, hex-encoded. Content edits keep
/// the id; moving the file mints a new one.
pub fn file_id_from_path(path: &Path) -> FileId {
    hex::encode(blake3::hash(path.to_string_lossy().as_bytes()).as_bytes())
}

/// Extension without the dot, empty when there is none.
pub fn file_extension(path: &Path) -> String {
    path.extension()
        .map(|ext| ext.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Default mapping from a folder-relative file path to its public url path:
/// drop the markdown extension, normalize separators, collapse a trailing
/// `index` segment, and map the root to `/`.
pub fn default_path_to_url(relative_path: &str) -> String {
    let mut url = relative_path.replace('\\', "/");
    for ext in SUPPORTED_EXTENSIONS {
        if let Some(stripped) = url.strip_suffix(&format!(".{ext}")) {
            url = stripped.to_string();
            break;
        }
    }
    if let Some(stripped) = url.strip_suffix("index") {
        url = stripped.trim_end_matches('/').to_string();
    }
    if url.is_empty() {
        "/".to_string()
    } else {
        url
    }
}
