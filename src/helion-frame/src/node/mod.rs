//! Graph nodes: filters, derived columns and actions.
//!
//! Nodes form a tree rooted at the engine. Each node owns a shared
//! reference to its upstream neighbour; traversal is upstream only - the
//! engine holds the action list directly, so downstream links are never
//! needed.

mod action;
mod define;
mod filter;

pub(crate) use action::{Action, ActionCallable, ActionExec, OpFinalize, OpInit, OpRelease};
pub(crate) use define::DefineNode;
pub(crate) use filter::FilterNode;

use std::any::Any;
use std::sync::Arc;

use common_error::HelionResult;
use helion_core::ElementType;
use helion_storage::EventTable;

use crate::report::FilterStats;

/// Filter node, seen through its object-safe surface.
pub(crate) trait FilterLike: Send + Sync + 'static {
    /// Filter name; empty for anonymous filters.
    fn name(&self) -> &str;

    /// Whether the row passes this filter and every filter upstream.
    /// Memoized per (slot, row).
    fn check(&self, slot: usize, row: u64) -> HelionResult<bool>;

    /// Allocate per-slot state and cursors.
    fn init_slots(&self, table: &dyn EventTable, n_slots: usize) -> HelionResult<()>;

    /// Drop per-slot state (counters are retained for reporting).
    fn release_slots(&self);

    /// Accepted/rejected totals, `None` for anonymous filters.
    fn stats(&self) -> Option<FilterStats>;

    /// Append named-filter stats for this node and everything upstream,
    /// upstream first.
    fn collect_stats(&self, out: &mut Vec<FilterStats>);

    /// Upstream neighbour.
    fn parent(&self) -> &Upstream;

    /// One-line description for graph rendering.
    fn describe(&self) -> String;
}

/// Derived-column node, seen through its object-safe surface.
pub(crate) trait DefineLike: Send + Sync + 'static {
    /// Output column name.
    fn name(&self) -> &str;

    /// Element type recorded at registration, when the output type has one.
    fn output_type(&self) -> Option<ElementType>;

    /// The value at (slot, row), evaluated at most once per (slot, row) and
    /// shared by every same-row consumer.
    fn value(&self, slot: usize, row: u64) -> HelionResult<Arc<dyn Any + Send + Sync>>;

    /// Forward the filter check to the upstream neighbour.
    fn check(&self, slot: usize, row: u64) -> HelionResult<bool>;

    /// Allocate per-slot state and cursors.
    fn init_slots(&self, table: &dyn EventTable, n_slots: usize) -> HelionResult<()>;

    /// Drop per-slot state.
    fn release_slots(&self);

    /// Append named-filter stats for everything upstream.
    fn collect_stats(&self, out: &mut Vec<FilterStats>);

    /// Upstream neighbour.
    fn parent(&self) -> &Upstream;

    /// One-line description for graph rendering.
    fn describe(&self) -> String;
}

/// Upstream link of a node: the engine root, a filter or a derived column.
#[derive(Clone)]
pub(crate) enum Upstream {
    /// Directly below the engine root.
    Root,
    /// Below a filter node.
    Filter(Arc<dyn FilterLike>),
    /// Below a derived-column node.
    Define(Arc<dyn DefineLike>),
}

impl Upstream {
    /// Start the recursive chain of filter checks.
    pub fn check_filters(&self, slot: usize, row: u64) -> HelionResult<bool> {
        match self {
            Self::Root => Ok(true),
            Self::Filter(node) => node.check(slot, row),
            Self::Define(node) => node.check(slot, row),
        }
    }

    /// Append named-filter stats upstream of (and including) this link.
    pub fn collect_stats(&self, out: &mut Vec<FilterStats>) {
        match self {
            Self::Root => {}
            Self::Filter(node) => node.collect_stats(out),
            Self::Define(node) => node.collect_stats(out),
        }
    }

    /// Stable identity of the linked node, for graph rendering.
    pub fn key(&self) -> usize {
        match self {
            Self::Root => 0,
            Self::Filter(node) => Arc::as_ptr(node) as *const () as usize,
            Self::Define(node) => Arc::as_ptr(node) as *const () as usize,
        }
    }
}
