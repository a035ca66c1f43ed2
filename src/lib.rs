//! mdindex: Incremental Relational Index for Markdown Collections
//!
//! Builds and incrementally maintains a derived relational index (files,
//! tags, file-tag associations, inter-file links) over a changing collection
//! of documents, healing broken links as their targets appear and re-breaking
//! them as targets are removed.

pub mod config;
pub mod diff;
pub mod error;
pub mod extract;
pub mod file_tags;
pub mod files;
pub mod indexer;
pub mod links;
pub mod logging;
pub mod query;
pub mod schema;
pub mod store;
pub mod sync;
pub mod tags;
pub mod types;
pub mod validate;
pub mod watch;
