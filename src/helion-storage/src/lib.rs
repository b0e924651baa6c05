//! Input table providers for the Helion analysis engine.
//!
//! This crate supplies the storage side of the engine:
//! - [`Storage`]: async catalog of named event tables
//! - [`EventTable`]: synchronous row/column access for the event loop
//! - [`ColumnCursor`] and [`ColumnRead`]: typed per-slot column access
//! - [`MemoryStorage`] / [`MemoryTable`]: Arrow-backed in-memory backend

pub mod cursor;
pub mod memory;
pub mod storage;
pub mod table;

pub use cursor::{element_type_of, ColumnCursor, ColumnRead};
pub use memory::{MemoryStorage, MemoryTable, MemoryTableBuilder};
pub use storage::Storage;
pub use table::{EventTable, RowRange};
