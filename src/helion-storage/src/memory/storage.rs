//! In-memory storage catalog.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use common_error::{HelionError, HelionResult};

use crate::memory::MemoryTable;
use crate::storage::Storage;
use crate::table::EventTable;

/// In-memory storage: a catalog of named [`MemoryTable`]s.
///
/// Intended for tests, examples and small datasets.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    tables: RwLock<HashMap<String, Arc<MemoryTable>>>,
}

impl MemoryStorage {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table under its own name, replacing any previous entry.
    pub fn register_table(&self, table: MemoryTable) -> HelionResult<()> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| HelionError::internal("memory catalog lock poisoned"))?;
        tables.insert(table.name().to_string(), Arc::new(table));
        Ok(())
    }

    /// Number of registered tables.
    pub fn len(&self) -> usize {
        self.tables.read().map(|t| t.len()).unwrap_or(0)
    }

    /// Check if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn open_table(&self, name: &str) -> HelionResult<Arc<dyn EventTable>> {
        let tables = self
            .tables
            .read()
            .map_err(|_| HelionError::internal("memory catalog lock poisoned"))?;
        tables
            .get(name)
            .map(|t| Arc::clone(t) as Arc<dyn EventTable>)
            .ok_or_else(|| HelionError::TableNotFound(name.to_string()))
    }

    async fn list_tables(&self) -> HelionResult<Vec<String>> {
        let tables = self
            .tables
            .read()
            .map_err(|_| HelionError::internal("memory catalog lock poisoned"))?;
        let mut names: Vec<String> = tables.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_and_open() {
        let storage = MemoryStorage::new();
        let table = MemoryTable::builder("events")
            .with_i32("x", vec![1, 2, 3])
            .build()
            .unwrap();
        storage.register_table(table).unwrap();

        let opened = storage.open_table("events").await.unwrap();
        assert_eq!(opened.row_count(), 3);
    }

    #[tokio::test]
    async fn test_open_missing_table() {
        let storage = MemoryStorage::new();
        let err = storage.open_table("missing").await.unwrap_err();
        assert!(matches!(err, HelionError::TableNotFound(_)));
    }

    #[tokio::test]
    async fn test_list_tables() {
        let storage = MemoryStorage::new();
        for name in ["b", "a"] {
            storage
                .register_table(
                    MemoryTable::builder(name)
                        .with_i32("x", vec![1])
                        .build()
                        .unwrap(),
                )
                .unwrap();
        }
        assert_eq!(storage.list_tables().await.unwrap(), vec!["a", "b"]);
    }
}
