//! Event table interface consumed by the execution engine.

use serde::{Deserialize, Serialize};

use common_error::HelionResult;
use helion_core::TableSchema;

use crate::cursor::ColumnCursor;

/// A contiguous, half-open range of row indices assigned to one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowRange {
    /// First row of the range.
    pub start: u64,
    /// One past the last row of the range.
    pub end: u64,
}

impl RowRange {
    /// Create a new range.
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Number of rows in the range.
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    /// Check if the range is empty.
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// A logical event table: named, typed columns over a fixed row count.
///
/// The engine consumes this interface only; backends decide how rows are
/// stored. Access during the event loop is synchronous - the async surface
/// lives on [`crate::Storage`].
pub trait EventTable: Send + Sync + std::fmt::Debug {
    /// Table name.
    fn name(&self) -> &str;

    /// Column schema (name to element type).
    fn schema(&self) -> &TableSchema;

    /// Total number of rows.
    fn row_count(&self) -> u64;

    /// Produce a cursor for one column.
    ///
    /// Called once per slot and per referenced column before the event
    /// loop; cursors are cheap handles that may share backing storage.
    fn cursor(&self, column: &str) -> HelionResult<ColumnCursor>;

    /// Partition the row space into `n_slots` disjoint contiguous ranges.
    ///
    /// The default splits rows into near-equal chunks; trailing ranges may
    /// be empty when there are fewer rows than slots.
    fn partitions(&self, n_slots: usize) -> Vec<RowRange> {
        let n_slots = n_slots.max(1) as u64;
        let rows = self.row_count();
        let chunk = rows.div_ceil(n_slots).max(1);
        (0..n_slots)
            .map(|slot| {
                let start = (slot * chunk).min(rows);
                let end = ((slot + 1) * chunk).min(rows);
                RowRange::new(start, end)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_range() {
        let range = RowRange::new(2, 5);
        assert_eq!(range.len(), 3);
        assert!(!range.is_empty());
        assert!(RowRange::new(4, 4).is_empty());
    }
}
