//! Core data model for the Helion analysis engine.
//!
//! This crate provides the fundamental types shared by the storage layer
//! and the execution engine:
//! - `ElementType` for the per-column type system
//! - `ArrayView` for zero-copy views over array-valued rows
//! - `TableSchema` for column metadata

pub mod schema;
pub mod types;

// Re-export commonly used types
pub use schema::{ColumnInfo, TableSchema};
pub use types::{ArrayView, ElementType};
