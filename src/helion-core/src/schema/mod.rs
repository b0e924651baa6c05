//! Schema metadata for Helion tables.

mod schema;

pub use schema::{ColumnInfo, TableSchema};
