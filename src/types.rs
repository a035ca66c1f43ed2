//! Core types for the markdown index.

/// FileId: deterministic hash of a file's path, hex-encoded
pub type FileId = String;

/// Metadata: opaque frontmatter key/value map extracted from a document
pub type Metadata = std::collections::BTreeMap<String, serde_json::Value>;
