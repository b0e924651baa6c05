//! Bounded read-only views over array-valued rows.

use std::ops::Deref;

use arrow_buffer::{ArrowNativeType, ScalarBuffer};

/// A bounded, read-only view over the contiguous elements of one
/// array-valued row.
///
/// Cloning is cheap: the view shares the underlying Arrow buffer. The view
/// is valid for as long as it is held; it does not borrow from the cursor
/// that produced it.
#[derive(Debug, Clone)]
pub struct ArrayView<T: ArrowNativeType> {
    values: ScalarBuffer<T>,
    offset: usize,
    len: usize,
}

impl<T: ArrowNativeType> ArrayView<T> {
    /// Create a view over `len` elements of `values` starting at `offset`.
    ///
    /// # Panics
    ///
    /// Panics if `offset + len` exceeds the buffer length.
    pub fn new(values: ScalarBuffer<T>, offset: usize, len: usize) -> Self {
        assert!(
            offset + len <= values.len(),
            "array view out of bounds: {offset}+{len} > {}",
            values.len()
        );
        Self {
            values,
            offset,
            len,
        }
    }

    /// Number of elements in the view.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the view is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The viewed elements as a slice.
    pub fn as_slice(&self) -> &[T] {
        &self.values[self.offset..self.offset + self.len]
    }

    /// Iterate over the viewed elements.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.as_slice().iter()
    }
}

impl<T: ArrowNativeType> Deref for ArrayView<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T: ArrowNativeType> AsRef<[T]> for ArrayView<T> {
    fn as_ref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T: ArrowNativeType + PartialEq> PartialEq for ArrayView<T> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: ArrowNativeType + PartialEq> PartialEq<[T]> for ArrayView<T> {
    fn eq(&self, other: &[T]) -> bool {
        self.as_slice() == other
    }
}

impl<T: ArrowNativeType> From<Vec<T>> for ArrayView<T> {
    fn from(values: Vec<T>) -> Self {
        let len = values.len();
        Self::new(ScalarBuffer::from(values), 0, len)
    }
}

impl<'a, T: ArrowNativeType> IntoIterator for &'a ArrayView<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
