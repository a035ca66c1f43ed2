//! In-memory store
//!
//! Table-per-vector store used by the test suites and for dry runs. Tracks
//! write counters so tests can assert that a no-op sync issues zero writes.

use super::{Row, Store, Table};
use crate::error::StorageError;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<Table, Vec<Row>>>,
    insert_calls: AtomicUsize,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `insert_many` calls issued so far.
    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    /// Total rows inserted, deleted, or patched so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl Store for MemoryStore {
    fn create_schema(&self) -> Result<(), StorageError> {
        let mut tables = self.tables.write();
        for table in Table::ALL {
            tables.entry(table).or_default();
        }
        Ok(())
    }

    fn drop_schema(&self) -> Result<(), StorageError> {
        self.tables.write().clear();
        Ok(())
    }

    fn insert_many(&self, table: Table, rows: &[Row]) -> Result<(), StorageError> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        self.writes.fetch_add(rows.len(), Ordering::SeqCst);
        self.tables
            .write()
            .entry(table)
            .or_default()
            .extend(rows.iter().cloned());
        Ok(())
    }

    fn delete_where(
        &self,
        table: Table,
        predicate: &dyn Fn(&Row) -> bool,
    ) -> Result<usize, StorageError> {
        let mut tables = self.tables.write();
        let rows = tables.entry(table).or_default();
        let before = rows.len();
        rows.retain(|row| !predicate(row));
        let removed = before - rows.len();
        self.writes.fetch_add(removed, Ordering::SeqCst);
        Ok(removed)
    }

    fn update_fields(
        &self,
        table: Table,
        predicate: &dyn Fn(&Row) -> bool,
        patch: &Row,
    ) -> Result<usize, StorageError> {
        let mut tables = self.tables.write();
        let rows = tables.entry(table).or_default();
        let mut patched = 0;
        for row in rows.iter_mut().filter(|row| predicate(row)) {
            for (key, value) in patch {
                row.insert(key.clone(), value.clone());
            }
            patched += 1;
        }
        self.writes.fetch_add(patched, Ordering::SeqCst);
        Ok(patched)
    }

    fn rows(&self, table: Table) -> Result<Vec<Row>, StorageError> {
        Ok(self.tables.read().get(&table).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::to_row;
    use serde_json::json;

    fn row(id: &str) -> Row {
        to_row(&json!({ "_id": id })).unwrap()
    }

    #[test]
    fn delete_where_removes_matching_rows_only() {
        let store = MemoryStore::new();
        store.create_schema().unwrap();
        store
            .insert_many(Table::Files, &[row("a"), row("b"), row("c")])
            .unwrap();

        let removed = store
            .delete_where(Table::Files, &|row| row["_id"] == json!("b"))
            .unwrap();

        assert_eq!(removed, 1);
        let remaining = store.rows(Table::Files).unwrap();
        assert_eq!(remaining.len(), 2);
        assert!(remaining.iter().all(|row| row["_id"] != json!("b")));
    }

    #[test]
    fn update_fields_patches_without_replacing() {
        let store = MemoryStore::new();
        store.create_schema().unwrap();
        let mut initial = row("a");
        initial.insert("title".into(), json!("old"));
        initial.insert("draft".into(), json!(true));
        store.insert_many(Table::Files, &[initial]).unwrap();

        let patch = to_row(&json!({ "title": "new" })).unwrap();
        let patched = store
            .update_fields(Table::Files, &|row| row["_id"] == json!("a"), &patch)
            .unwrap();

        assert_eq!(patched, 1);
        let rows = store.rows(Table::Files).unwrap();
        assert_eq!(rows[0]["title"], json!("new"));
        assert_eq!(rows[0]["draft"], json!(true));
    }

    #[test]
    fn drop_schema_empties_every_table() {
        let store = MemoryStore::new();
        store.create_schema().unwrap();
        store.insert_many(Table::Tags, &[row("t")]).unwrap();
        store.drop_schema().unwrap();
        assert!(store.rows(Table::Tags).unwrap().is_empty());
    }
}
