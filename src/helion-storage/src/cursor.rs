//! Typed per-slot column cursors.
//!
//! A [`ColumnCursor`] is the per-worker accessor for one physical column.
//! The engine reads through it with a concrete Rust type via [`ColumnRead`];
//! the supported types mirror the [`ElementType`] tag set.

use arrow::array::{
    Array, ArrayRef, BooleanArray, Float32Array, Float64Array, Int8Array, Int32Array, Int64Array,
    ListArray, UInt8Array,
};
use arrow::datatypes::DataType;

use common_error::{HelionError, HelionResult};
use helion_core::{ArrayView, ElementType};

/// Map an Arrow data type to a Helion element type.
///
/// Fails with `SchemaError` for layouts the engine does not support.
pub fn element_type_of(data_type: &DataType) -> HelionResult<ElementType> {
    match data_type {
        DataType::Boolean => Ok(ElementType::Bool),
        DataType::Int8 => Ok(ElementType::Int8),
        DataType::UInt8 => Ok(ElementType::UInt8),
        DataType::Int32 => Ok(ElementType::Int32),
        DataType::Int64 => Ok(ElementType::Int64),
        DataType::Float32 => Ok(ElementType::Float32),
        DataType::Float64 => Ok(ElementType::Float64),
        DataType::List(field) => match field.data_type() {
            DataType::Float64 => Ok(ElementType::ArrayFloat64),
            DataType::Float32 => Ok(ElementType::ArrayFloat32),
            other => Err(HelionError::schema_error(format!(
                "unsupported list element type: {other}"
            ))),
        },
        other => Err(HelionError::schema_error(format!(
            "unsupported column type: {other}"
        ))),
    }
}

/// Per-worker, per-column typed accessor.
///
/// Cursors are cheap to clone (they share the column's backing buffer) and
/// read-only.
#[derive(Debug, Clone)]
pub struct ColumnCursor {
    name: String,
    data: ArrayRef,
}

impl ColumnCursor {
    /// Create a cursor over a column's backing array.
    pub fn new(name: impl Into<String>, data: ArrayRef) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    /// Column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the column is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Element type of this column.
    pub fn element_type(&self) -> HelionResult<ElementType> {
        element_type_of(self.data.data_type())
    }

    /// The backing Arrow array.
    pub fn data(&self) -> &ArrayRef {
        &self.data
    }

    fn downcast<A: Array + 'static>(&self, expected: ElementType) -> HelionResult<&A> {
        self.data.as_any().downcast_ref::<A>().ok_or_else(|| {
            HelionError::type_error(format!(
                "column '{}' has type {}, expected {expected}",
                self.name,
                self.data.data_type()
            ))
        })
    }

    fn check_row(&self, row: usize) -> HelionResult<()> {
        if row >= self.data.len() {
            return Err(HelionError::execution(format!(
                "row {row} out of range for column '{}' ({} rows)",
                self.name,
                self.data.len()
            )));
        }
        Ok(())
    }
}

/// Value types readable from a [`ColumnCursor`].
pub trait ColumnRead: Sized + Clone + Send + Sync + 'static {
    /// The element type tag this Rust type reads.
    fn element_type() -> ElementType;

    /// Read the value at `row`.
    fn read(cursor: &ColumnCursor, row: usize) -> HelionResult<Self>;
}

macro_rules! impl_scalar_read {
    ($native:ty, $array:ty, $tag:expr) => {
        impl ColumnRead for $native {
            fn element_type() -> ElementType {
                $tag
            }

            fn read(cursor: &ColumnCursor, row: usize) -> HelionResult<Self> {
                cursor.check_row(row)?;
                let array = cursor.downcast::<$array>($tag)?;
                Ok(array.value(row))
            }
        }
    };
}

impl_scalar_read!(bool, BooleanArray, ElementType::Bool);
impl_scalar_read!(i8, Int8Array, ElementType::Int8);
impl_scalar_read!(u8, UInt8Array, ElementType::UInt8);
impl_scalar_read!(i32, Int32Array, ElementType::Int32);
impl_scalar_read!(i64, Int64Array, ElementType::Int64);
impl_scalar_read!(f32, Float32Array, ElementType::Float32);
impl_scalar_read!(f64, Float64Array, ElementType::Float64);

macro_rules! impl_array_read {
    ($native:ty, $child_array:ty, $tag:expr) => {
        impl ColumnRead for ArrayView<$native> {
            fn element_type() -> ElementType {
                $tag
            }

            fn read(cursor: &ColumnCursor, row: usize) -> HelionResult<Self> {
                cursor.check_row(row)?;
                let list = cursor.downcast::<ListArray>($tag)?;
                let child = list.values();
                let values = child
                    .as_any()
                    .downcast_ref::<$child_array>()
                    .ok_or_else(|| {
                        HelionError::type_error(format!(
                            "column '{}' has element type {}, expected {}",
                            cursor.name(),
                            child.data_type(),
                            $tag
                        ))
                    })?;
                // A sliced or null-bearing child cannot be surfaced as a
                // contiguous view.
                if values.offset() != 0 {
                    return Err(HelionError::NonContiguousArray(format!(
                        "column '{}' is backed by a sliced buffer",
                        cursor.name()
                    )));
                }
                if list.is_null(row) {
                    return Ok(ArrayView::new(values.values().clone(), 0, 0));
                }
                let offsets = list.value_offsets();
                let start = offsets[row] as usize;
                let end = offsets[row + 1] as usize;
                if values.null_count() > 0 {
                    for i in start..end {
                        if values.is_null(i) {
                            return Err(HelionError::NonContiguousArray(format!(
                                "column '{}' has null elements at row {row}",
                                cursor.name()
                            )));
                        }
                    }
                }
                Ok(ArrayView::new(values.values().clone(), start, end - start))
            }
        }
    };
}

impl_array_read!(f64, Float64Array, ElementType::ArrayFloat64);
impl_array_read!(f32, Float32Array, ElementType::ArrayFloat32);

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::datatypes::Float64Type;
    use std::sync::Arc;

    fn f64_cursor(values: Vec<f64>) -> ColumnCursor {
        ColumnCursor::new("v", Arc::new(Float64Array::from(values)) as ArrayRef)
    }

    #[test]
    fn test_scalar_read() {
        let cursor = f64_cursor(vec![1.5, 2.5, 4.0]);
        assert_eq!(f64::read(&cursor, 0).unwrap(), 1.5);
        assert_eq!(f64::read(&cursor, 2).unwrap(), 4.0);
    }

    #[test]
    fn test_row_out_of_range() {
        let cursor = f64_cursor(vec![1.0]);
        assert!(f64::read(&cursor, 1).is_err());
    }

    #[test]
    fn test_type_mismatch() {
        let cursor = f64_cursor(vec![1.0]);
        let err = i32::read(&cursor, 0).unwrap_err();
        assert!(matches!(err, HelionError::TypeError(_)));
    }

    #[test]
    fn test_list_read() {
        let list = ListArray::from_iter_primitive::<Float64Type, _, _>(vec![
            Some(vec![Some(1.0), Some(2.0)]),
            Some(vec![Some(3.0)]),
            Some(vec![]),
        ]);
        let cursor = ColumnCursor::new("jets", Arc::new(list) as ArrayRef);

        let first: ArrayView<f64> = ColumnRead::read(&cursor, 0).unwrap();
        assert_eq!(first.as_slice(), &[1.0, 2.0]);
        let second: ArrayView<f64> = ColumnRead::read(&cursor, 1).unwrap();
        assert_eq!(second.as_slice(), &[3.0]);
        let third: ArrayView<f64> = ColumnRead::read(&cursor, 2).unwrap();
        assert!(third.is_empty());
    }

    #[test]
    fn test_list_with_null_elements() {
        let list = ListArray::from_iter_primitive::<Float64Type, _, _>(vec![Some(vec![
            Some(1.0),
            None,
        ])]);
        let cursor = ColumnCursor::new("jets", Arc::new(list) as ArrayRef);
        let err = <ArrayView<f64> as ColumnRead>::read(&cursor, 0).unwrap_err();
        assert!(matches!(err, HelionError::NonContiguousArray(_)));
    }

    #[test]
    fn test_element_type_mapping() {
        assert_eq!(
            element_type_of(&DataType::Int32).unwrap(),
            ElementType::Int32
        );
        assert!(element_type_of(&DataType::Utf8).is_err());
    }
}
