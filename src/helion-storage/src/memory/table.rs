//! In-memory event table backed by Arrow arrays.

use std::sync::Arc;

use arrow::array::{
    ArrayRef, BooleanArray, Float32Array, Float64Array, Int8Array, Int32Array, Int64Array,
    ListArray, UInt8Array,
};
use arrow::datatypes::{Float32Type, Float64Type};

use common_error::{HelionError, HelionResult};
use helion_core::{ColumnInfo, TableSchema};

use crate::cursor::{element_type_of, ColumnCursor};
use crate::table::EventTable;

/// In-memory event table.
///
/// Columns are stored as Arrow arrays; cursors are cheap handles onto the
/// shared buffers, so every slot can read without copying.
#[derive(Debug, Clone)]
pub struct MemoryTable {
    name: String,
    schema: TableSchema,
    columns: Vec<ArrayRef>,
    rows: u64,
}

impl MemoryTable {
    /// Start building a table with the given name.
    pub fn builder(name: impl Into<String>) -> MemoryTableBuilder {
        MemoryTableBuilder::new(name)
    }
}

impl EventTable for MemoryTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn schema(&self) -> &TableSchema {
        &self.schema
    }

    fn row_count(&self) -> u64 {
        self.rows
    }

    fn cursor(&self, column: &str) -> HelionResult<ColumnCursor> {
        let index = self.schema.index_of(column).ok_or_else(|| {
            HelionError::column_not_found(format!(
                "column '{column}' not found in table '{}'",
                self.name
            ))
        })?;
        Ok(ColumnCursor::new(column, Arc::clone(&self.columns[index])))
    }
}

/// Builder for [`MemoryTable`].
///
/// Typed helpers cover the supported element types; [`Self::column`]
/// accepts any pre-built Arrow array with a supported layout.
#[derive(Debug, Default)]
pub struct MemoryTableBuilder {
    name: String,
    columns: Vec<(String, ArrayRef)>,
}

impl MemoryTableBuilder {
    /// Create a builder for a table with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Add a column from a pre-built Arrow array.
    pub fn column(mut self, name: impl Into<String>, data: ArrayRef) -> Self {
        self.columns.push((name.into(), data));
        self
    }

    /// Add a boolean column.
    pub fn with_bool(self, name: impl Into<String>, values: Vec<bool>) -> Self {
        self.column(name, Arc::new(BooleanArray::from(values)) as ArrayRef)
    }

    /// Add an 8-bit signed integer column.
    pub fn with_i8(self, name: impl Into<String>, values: Vec<i8>) -> Self {
        self.column(name, Arc::new(Int8Array::from(values)) as ArrayRef)
    }

    /// Add a byte column.
    pub fn with_u8(self, name: impl Into<String>, values: Vec<u8>) -> Self {
        self.column(name, Arc::new(UInt8Array::from(values)) as ArrayRef)
    }

    /// Add a 32-bit signed integer column.
    pub fn with_i32(self, name: impl Into<String>, values: Vec<i32>) -> Self {
        self.column(name, Arc::new(Int32Array::from(values)) as ArrayRef)
    }

    /// Add a 64-bit signed integer column.
    pub fn with_i64(self, name: impl Into<String>, values: Vec<i64>) -> Self {
        self.column(name, Arc::new(Int64Array::from(values)) as ArrayRef)
    }

    /// Add a 32-bit float column.
    pub fn with_f32(self, name: impl Into<String>, values: Vec<f32>) -> Self {
        self.column(name, Arc::new(Float32Array::from(values)) as ArrayRef)
    }

    /// Add a 64-bit float column.
    pub fn with_f64(self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.column(name, Arc::new(Float64Array::from(values)) as ArrayRef)
    }

    /// Add an array-of-f64 column (one variable-length array per row).
    pub fn with_f64_lists(self, name: impl Into<String>, rows: Vec<Vec<f64>>) -> Self {
        let list = ListArray::from_iter_primitive::<Float64Type, _, _>(
            rows.into_iter()
                .map(|row| Some(row.into_iter().map(Some).collect::<Vec<_>>())),
        );
        self.column(name, Arc::new(list) as ArrayRef)
    }

    /// Add an array-of-f32 column (one variable-length array per row).
    pub fn with_f32_lists(self, name: impl Into<String>, rows: Vec<Vec<f32>>) -> Self {
        let list = ListArray::from_iter_primitive::<Float32Type, _, _>(
            rows.into_iter()
                .map(|row| Some(row.into_iter().map(Some).collect::<Vec<_>>())),
        );
        self.column(name, Arc::new(list) as ArrayRef)
    }

    /// Validate and build the table.
    pub fn build(self) -> HelionResult<MemoryTable> {
        let mut schema = TableSchema::new();
        let mut columns = Vec::with_capacity(self.columns.len());
        let mut rows: Option<u64> = None;

        for (name, data) in self.columns {
            if schema.contains(&name) {
                return Err(HelionError::DuplicateColumn(format!(
                    "column '{name}' declared twice in table '{}'",
                    self.name
                )));
            }
            let element_type = element_type_of(data.data_type())?;

            let len = data.len() as u64;
            match rows {
                None => rows = Some(len),
                Some(expected) if expected != len => {
                    return Err(HelionError::schema_error(format!(
                        "column '{name}' has {len} rows, expected {expected}"
                    )));
                }
                Some(_) => {}
            }

            schema.add_column(ColumnInfo::new(&name, element_type));
            columns.push(data);
        }

        Ok(MemoryTable {
            name: self.name,
            schema,
            columns,
            rows: rows.unwrap_or(0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helion_core::ElementType;

    #[test]
    fn test_build_table() {
        let table = MemoryTable::builder("events")
            .with_i32("x", vec![1, 2, 3])
            .with_f64("pt", vec![0.5, 1.5, 2.5])
            .build()
            .unwrap();

        assert_eq!(table.name(), "events");
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.schema().element_type("x"), Some(ElementType::Int32));
        assert_eq!(table.schema().element_type("pt"), Some(ElementType::Float64));
    }

    #[test]
    fn test_row_count_mismatch() {
        let result = MemoryTable::builder("events")
            .with_i32("x", vec![1, 2, 3])
            .with_f64("pt", vec![0.5])
            .build();
        assert!(matches!(result, Err(HelionError::SchemaError(_))));
    }

    #[test]
    fn test_duplicate_column() {
        let result = MemoryTable::builder("events")
            .with_i32("x", vec![1])
            .with_f64("x", vec![0.5])
            .build();
        assert!(matches!(result, Err(HelionError::DuplicateColumn(_))));
    }

    #[test]
    fn test_cursor_lookup() {
        let table = MemoryTable::builder("events")
            .with_f64_lists("jets", vec![vec![1.0, 2.0], vec![]])
            .build()
            .unwrap();

        assert!(table.cursor("jets").is_ok());
        assert!(matches!(
            table.cursor("missing"),
            Err(HelionError::ColumnNotFound(_))
        ));
    }

    #[test]
    fn test_default_partitions() {
        let table = MemoryTable::builder("events")
            .with_i32("x", (0..10).collect())
            .build()
            .unwrap();

        let parts = table.partitions(3);
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], crate::table::RowRange::new(0, 4));
        assert_eq!(parts[1], crate::table::RowRange::new(4, 8));
        assert_eq!(parts[2], crate::table::RowRange::new(8, 10));

        let total: u64 = parts.iter().map(crate::table::RowRange::len).sum();
        assert_eq!(total, 10);
    }
}
