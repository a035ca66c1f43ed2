//! Batch indexing
//!
//! Full-folder runs: reset the store schema, walk the folder, extract each
//! file, validate its metadata, and feed adds through the orchestrator one at
//! a time. Validation failures are collected across the whole run and the run
//! fails as a whole once every file has been seen; writes committed before
//! the failure are not rolled back.

use crate::error::SyncError;
use crate::extract::ContentExtractor;
use crate::sync::SyncOrchestrator;
use crate::validate::MetadataValidator;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};
use walkdir::WalkDir;

/// Summary of a batch indexing run.
#[derive(Debug, Clone)]
pub struct IndexReport {
    /// Files committed to the index
    pub files_indexed: usize,
    /// Files skipped by ignore patterns
    pub files_ignored: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

/// Index a folder from scratch into a fresh orchestrator.
///
/// The orchestrator must be empty; the store schema is dropped and recreated
/// before the walk. Files are processed one at a time in path order so runs
/// are deterministic.
pub fn index_folder(
    sync: &mut SyncOrchestrator,
    extractor: &dyn ContentExtractor,
    validator: &dyn MetadataValidator,
    folder: &Path,
    ignore_patterns: &[Regex],
) -> Result<IndexReport, SyncError> {
    let started = Instant::now();
    sync.store().drop_schema().map_err(SyncError::from)?;
    sync.store().create_schema().map_err(SyncError::from)?;

    let known_paths = walk_folder(folder)?;
    let mut issues = Vec::new();
    let mut files_indexed = 0;
    let mut files_ignored = 0;

    for path in &known_paths {
        if is_ignored(path, ignore_patterns) {
            files_ignored += 1;
            continue;
        }
        let snapshot = extractor.extract(folder, path, &known_paths)?;
        let file_issues = validator.validate(&snapshot.record);
        if !file_issues.is_empty() {
            warn!(file = %path.display(), count = file_issues.len(), "metadata validation failed");
            issues.extend(file_issues);
            continue;
        }
        sync.on_add(snapshot)?;
        files_indexed += 1;
    }

    if !issues.is_empty() {
        return Err(SyncError::Validation(issues));
    }

    let report = IndexReport {
        files_indexed,
        files_ignored,
        duration_ms: started.elapsed().as_millis() as u64,
    };
    info!(
        folder = %folder.display(),
        files = report.files_indexed,
        ignored = report.files_ignored,
        duration_ms = report.duration_ms,
        "batch index complete"
    );
    Ok(report)
}

/// All regular files under the folder, in path order.
fn walk_folder(folder: &Path) -> Result<Vec<PathBuf>, SyncError> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(folder).sort_by_file_name() {
        let entry = entry.map_err(|e| SyncError::Config(format!("walk failed: {e}")))?;
        if entry.file_type().is_file() {
            paths.push(entry.into_path());
        }
    }
    Ok(paths)
}

fn is_ignored(path: &Path, patterns: &[Regex]) -> bool {
    let text = path.to_string_lossy();
    patterns.iter().any(|pattern| pattern.is_match(&text))
}

/// Compile configured ignore patterns, rejecting invalid ones up front.
pub fn compile_ignore_patterns(patterns: &[String]) -> Result<Vec<Regex>, SyncError> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(pattern)
                .map_err(|e| SyncError::Config(format!("invalid ignore pattern '{pattern}': {e}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationIssue;
    use crate::extract::{default_path_to_url, file_extension, file_id_from_path};
    use crate::schema::{FileRecord, FileSnapshot};
    use crate::store::memory::MemoryStore;
    use crate::store::{Store, Table};
    use crate::validate::{MetadataValidator, NoValidation};
    use std::collections::BTreeMap;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    /// Extractor producing bare records; parsing is out of scope here.
    struct StubExtractor;

    impl ContentExtractor for StubExtractor {
        fn extract(
            &self,
            folder: &Path,
            path: &Path,
            _known_paths: &[PathBuf],
        ) -> Result<FileSnapshot, SyncError> {
            let relative = path.strip_prefix(folder).unwrap_or(path);
            Ok(FileSnapshot {
                record: FileRecord {
                    id: file_id_from_path(relative),
                    path: relative.to_path_buf(),
                    extension: file_extension(relative),
                    url_path: Some(default_path_to_url(&relative.to_string_lossy())),
                    file_type: None,
                    metadata: BTreeMap::new(),
                    fields: BTreeMap::new(),
                },
                tags: vec![],
                links: vec![],
            })
        }
    }

    struct RejectEverything;

    impl MetadataValidator for RejectEverything {
        fn validate(&self, record: &FileRecord) -> Vec<ValidationIssue> {
            vec![ValidationIssue {
                path: record.path.clone(),
                field: "title".to_string(),
                message: "always rejected".to_string(),
            }]
        }
    }

    fn folder_with(files: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for file in files {
            let path = dir.path().join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "content").unwrap();
        }
        dir
    }

    #[test]
    fn indexes_every_non_ignored_file() {
        let dir = folder_with(&["a.md", "blog/b.md", "drafts/c.md"]);
        let store = Arc::new(MemoryStore::new());
        let mut sync = SyncOrchestrator::new(store.clone());
        let ignore = compile_ignore_patterns(&["drafts".to_string()]).unwrap();

        let report =
            index_folder(&mut sync, &StubExtractor, &NoValidation, dir.path(), &ignore).unwrap();

        assert_eq!(report.files_indexed, 2);
        assert_eq!(report.files_ignored, 1);
        assert_eq!(store.rows(Table::Files).unwrap().len(), 2);
    }

    #[test]
    fn validation_failures_collect_across_the_run() {
        let dir = folder_with(&["a.md", "b.md"]);
        let store = Arc::new(MemoryStore::new());
        let mut sync = SyncOrchestrator::new(store);

        let err = index_folder(&mut sync, &StubExtractor, &RejectEverything, dir.path(), &[])
            .unwrap_err();

        // both files reported, not just the first
        assert_eq!(err.validation_issues().len(), 2);
    }

    #[test]
    fn invalid_ignore_pattern_is_a_config_error() {
        let err = compile_ignore_patterns(&["[".to_string()]).unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
    }
}
