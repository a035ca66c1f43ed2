//! Persistence store
//!
//! Generic table store consumed by the managers. Rows are JSON objects; the
//! engine mutates its in-memory tables first and then issues the matching
//! store write, so the store never needs to be read back during a run.

pub mod memory;
pub mod persistence;

use crate::error::StorageError;
use serde::Serialize;
use serde_json::{Map, Value};

/// A persisted row: a flat JSON object.
pub type Row = Map<String, Value>;

/// Tables maintained by the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Files,
    Tags,
    FileTags,
    Links,
    BrokenLinks,
    ExternalLinks,
}

impl Table {
    pub const ALL: [Table; 6] = [
        Table::Files,
        Table::Tags,
        Table::FileTags,
        Table::Links,
        Table::BrokenLinks,
        Table::ExternalLinks,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Table::Files => "files",
            Table::Tags => "tags",
            Table::FileTags => "file_tags",
            Table::Links => "links",
            Table::BrokenLinks => "broken_links",
            Table::ExternalLinks => "external_links",
        }
    }
}

/// Maximum rows per insert call. Larger batches must be chunked.
pub const MAX_BATCH_ROWS: usize = 500;

/// Store interface
///
/// `update_fields` exists alongside the create/insert/delete surface because
/// the file update path persists a field-level diff, which a delete+reinsert
/// could not express without rewriting the whole row.
pub trait Store: Send + Sync {
    fn create_schema(&self) -> Result<(), StorageError>;
    fn drop_schema(&self) -> Result<(), StorageError>;
    fn insert_many(&self, table: Table, rows: &[Row]) -> Result<(), StorageError>;
    fn delete_where(
        &self,
        table: Table,
        predicate: &dyn Fn(&Row) -> bool,
    ) -> Result<usize, StorageError>;
    fn update_fields(
        &self,
        table: Table,
        predicate: &dyn Fn(&Row) -> bool,
        patch: &Row,
    ) -> Result<usize, StorageError>;
    /// Full table scan, used by tests and diagnostics.
    fn rows(&self, table: Table) -> Result<Vec<Row>, StorageError>;
}

/// Insert rows in chunks of at most [`MAX_BATCH_ROWS`].
///
/// Chunks are independent store calls; a failure aborts mid-sequence and
/// previously written chunks remain.
pub fn insert_chunked(store: &dyn Store, table: Table, rows: &[Row]) -> Result<(), StorageError> {
    for chunk in rows.chunks(MAX_BATCH_ROWS) {
        store.insert_many(table, chunk)?;
    }
    Ok(())
}

/// Serialize a schema value into a row.
pub fn to_row<T: Serialize>(value: &T) -> Result<Row, StorageError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(StorageError::InvalidRow(other.to_string())),
    }
}

/// Serialize a slice of schema values into rows.
pub fn to_rows<T: Serialize>(values: &[T]) -> Result<Vec<Row>, StorageError> {
    values.iter().map(to_row).collect()
}
