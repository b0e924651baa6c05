//! Storage trait: an async catalog of named event tables.

use std::sync::Arc;

use async_trait::async_trait;

use common_error::HelionResult;

use crate::table::EventTable;

/// Trait for storage backends.
///
/// All storage implementations must be thread-safe (Send + Sync). The
/// catalog surface is async (backends may hit disk or network to open a
/// table); the returned [`EventTable`] is accessed synchronously by the
/// event loop.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Open a named table.
    ///
    /// Fails with `TableNotFound` if the name is unknown to the catalog.
    async fn open_table(&self, name: &str) -> HelionResult<Arc<dyn EventTable>>;

    /// List the names of all tables in the catalog.
    async fn list_tables(&self) -> HelionResult<Vec<String>>;
}
