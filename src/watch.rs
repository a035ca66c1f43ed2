//! Incremental watch mode
//!
//! Filesystem events from the watcher thread are pushed onto a channel and
//! consumed by a single loop, so concurrent events for different paths are
//! serialized before they reach the orchestrator. Two files that reference
//! each other would otherwise race on the same healing step.

use crate::error::SyncError;
use crate::extract::{file_id_from_path, ContentExtractor};
use crate::indexer::compile_ignore_patterns;
use crate::sync::SyncOrchestrator;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Watch mode configuration
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Folder to watch, recursively
    pub folder: PathBuf,
    /// Debounce window in milliseconds
    pub debounce_ms: u64,
    /// Ignore patterns (regular expressions over the path)
    pub ignore_patterns: Vec<String>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        WatchConfig {
            folder: PathBuf::from("."),
            debounce_ms: 100,
            ignore_patterns: vec![r"\.git/".to_string(), r"\.obsidian/".to_string()],
        }
    }
}

/// Filesystem change event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    Created(PathBuf),
    Modified(PathBuf),
    Removed(PathBuf),
}

impl ChangeEvent {
    pub fn path(&self) -> &Path {
        match self {
            ChangeEvent::Created(path)
            | ChangeEvent::Modified(path)
            | ChangeEvent::Removed(path) => path,
        }
    }
}

/// Map one notify event to the change events the engine understands.
pub(crate) fn map_event(event: &notify::Event) -> Vec<ChangeEvent> {
    use notify::EventKind;
    event
        .paths
        .iter()
        .filter_map(|path| match event.kind {
            EventKind::Create(_) => Some(ChangeEvent::Created(path.clone())),
            EventKind::Modify(_) => Some(ChangeEvent::Modified(path.clone())),
            EventKind::Remove(_) => Some(ChangeEvent::Removed(path.clone())),
            _ => None,
        })
        .collect()
}

/// Keep only the last event per path, preserving arrival order.
fn coalesce(batch: Vec<ChangeEvent>) -> Vec<ChangeEvent> {
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut kept: Vec<ChangeEvent> = batch
        .into_iter()
        .rev()
        .filter(|event| seen.insert(event.path().to_path_buf()))
        .collect();
    kept.reverse();
    kept
}

pub struct FolderWatcher {
    config: WatchConfig,
    ignore: Vec<Regex>,
    rx: Receiver<ChangeEvent>,
    // kept alive for the duration of the watch; dropping it ends the run loop
    _watcher: RecommendedWatcher,
}

impl FolderWatcher {
    pub fn new(config: WatchConfig) -> Result<Self, SyncError> {
        let ignore = compile_ignore_patterns(&config.ignore_patterns)?;
        let (tx, rx) = channel();
        let mut watcher =
            notify::recommended_watcher(move |result: Result<notify::Event, notify::Error>| {
                match result {
                    Ok(event) => {
                        for change in map_event(&event) {
                            let _ = tx.send(change);
                        }
                    }
                    Err(error) => warn!(%error, "watch backend error"),
                }
            })?;
        watcher.watch(&config.folder, RecursiveMode::Recursive)?;
        Ok(FolderWatcher {
            config,
            ignore,
            rx,
            _watcher: watcher,
        })
    }

    /// Consume events until the watcher shuts down. This is the single
    /// serialization point: every event passes through here in order.
    pub fn run(
        self,
        sync: Arc<Mutex<SyncOrchestrator>>,
        extractor: &dyn ContentExtractor,
    ) -> Result<(), SyncError> {
        let window = Duration::from_millis(self.config.debounce_ms);
        while let Ok(first) = self.rx.recv() {
            let mut batch = vec![first];
            while let Ok(event) = self.rx.recv_timeout(window) {
                batch.push(event);
            }
            for event in coalesce(batch) {
                if self.is_ignored(event.path()) {
                    continue;
                }
                dispatch(&sync, extractor, &self.config.folder, event)?;
            }
        }
        Ok(())
    }

    fn is_ignored(&self, path: &Path) -> bool {
        let text = path.to_string_lossy();
        self.ignore.iter().any(|pattern| pattern.is_match(&text))
    }
}

/// Apply one change event to the orchestrator.
pub(crate) fn dispatch(
    sync: &Mutex<SyncOrchestrator>,
    extractor: &dyn ContentExtractor,
    folder: &Path,
    event: ChangeEvent,
) -> Result<(), SyncError> {
    debug!(?event, "watch event");
    match event {
        ChangeEvent::Created(path) | ChangeEvent::Modified(path) => {
            let known: Vec<PathBuf> = {
                let sync = sync.lock();
                sync.files()
                    .iter()
                    .map(|snapshot| snapshot.record.path.clone())
                    .collect()
            };
            let snapshot = extractor.extract(folder, &path, &known)?;
            let id = snapshot.record.id.clone();
            let mut sync = sync.lock();
            if sync.files().find_by_id(&id).is_some() {
                sync.on_update(&id, snapshot)
            } else {
                sync.on_add(snapshot)
            }
        }
        ChangeEvent::Removed(path) => {
            // ids are content-addressed from the folder-relative path
            let relative = path.strip_prefix(folder).unwrap_or(&path);
            let id = file_id_from_path(relative);
            let mut sync = sync.lock();
            if sync.files().find_by_id(&id).is_some() {
                sync.on_delete(&id)?;
            }
            Ok(())
        }
    }
}
