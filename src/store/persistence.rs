//! Sled-backed store
//!
//! One sled tree per table. Rows are stored as JSON values under generated
//! monotonic keys; the store is append-oriented and predicates are evaluated
//! by scanning the tree, which is acceptable because the engine treats the
//! store as write-mostly and keeps its own in-memory indexes for reads.

use super::{Row, Store, Table};
use crate::error::StorageError;
use serde_json::Value;
use std::path::Path;

pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let db = sled::open(path)?;
        Ok(SledStore { db })
    }

    fn tree(&self, table: Table) -> Result<sled::Tree, StorageError> {
        Ok(self.db.open_tree(table.name())?)
    }

    fn decode(bytes: &[u8]) -> Result<Row, StorageError> {
        match serde_json::from_slice::<Value>(bytes)? {
            Value::Object(map) => Ok(map),
            other => Err(StorageError::InvalidRow(other.to_string())),
        }
    }
}

impl Store for SledStore {
    fn create_schema(&self) -> Result<(), StorageError> {
        for table in Table::ALL {
            self.tree(table)?;
        }
        Ok(())
    }

    fn drop_schema(&self) -> Result<(), StorageError> {
        for table in Table::ALL {
            self.db.drop_tree(table.name())?;
        }
        Ok(())
    }

    fn insert_many(&self, table: Table, rows: &[Row]) -> Result<(), StorageError> {
        let tree = self.tree(table)?;
        for row in rows {
            let key = self.db.generate_id()?.to_be_bytes();
            let value = serde_json::to_vec(&Value::Object(row.clone()))?;
            tree.insert(key, value)?;
        }
        tree.flush()?;
        Ok(())
    }

    fn delete_where(
        &self,
        table: Table,
        predicate: &dyn Fn(&Row) -> bool,
    ) -> Result<usize, StorageError> {
        let tree = self.tree(table)?;
        let mut doomed = Vec::new();
        for entry in tree.iter() {
            let (key, value) = entry?;
            if predicate(&Self::decode(&value)?) {
                doomed.push(key);
            }
        }
        for key in &doomed {
            tree.remove(key)?;
        }
        tree.flush()?;
        Ok(doomed.len())
    }

    fn update_fields(
        &self,
        table: Table,
        predicate: &dyn Fn(&Row) -> bool,
        patch: &Row,
    ) -> Result<usize, StorageError> {
        let tree = self.tree(table)?;
        let mut patched = 0;
        for entry in tree.iter() {
            let (key, value) = entry?;
            let mut row = Self::decode(&value)?;
            if predicate(&row) {
                for (field, value) in patch {
                    row.insert(field.clone(), value.clone());
                }
                tree.insert(key, serde_json::to_vec(&Value::Object(row))?)?;
                patched += 1;
            }
        }
        tree.flush()?;
        Ok(patched)
    }

    fn rows(&self, table: Table) -> Result<Vec<Row>, StorageError> {
        let tree = self.tree(table)?;
        let mut rows = Vec::new();
        for entry in tree.iter() {
            let (_, value) = entry?;
            rows.push(Self::decode(&value)?);
        }
        Ok(rows)
    }
}
