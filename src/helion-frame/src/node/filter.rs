//! Filter nodes.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use common_error::HelionResult;
use helion_storage::EventTable;

use crate::columns::{build_sources, ColumnBinding, ColumnSource, RowArgs, RowCtx, RowFn};
use crate::node::{FilterLike, Upstream};
use crate::report::FilterStats;
use crate::slot::SlotVec;

/// Per-slot filter scratch: memoized last row plus that row's verdict.
struct FilterSlot {
    last_row: i64,
    /// Tri-state: -1 unevaluated, 0 failed, 1 passed.
    last_result: i8,
    sources: Vec<ColumnSource>,
}

/// A predicate node gating everything booked downstream of it.
pub(crate) struct FilterNode<F, Args> {
    name: String,
    predicate: F,
    columns: Vec<String>,
    bindings: Vec<ColumnBinding>,
    parent: Upstream,
    state: SlotVec<FilterSlot>,
    accepted: RwLock<Vec<AtomicU64>>,
    rejected: RwLock<Vec<AtomicU64>>,
    _args: PhantomData<fn() -> Args>,
}

impl<F, Args> FilterNode<F, Args>
where
    Args: RowArgs,
    F: RowFn<Args, Out = bool>,
{
    pub fn new(
        name: impl Into<String>,
        predicate: F,
        columns: Vec<String>,
        bindings: Vec<ColumnBinding>,
        parent: Upstream,
    ) -> Self {
        Self {
            name: name.into(),
            predicate,
            columns,
            bindings,
            parent,
            state: SlotVec::new(),
            accepted: RwLock::new(Vec::new()),
            rejected: RwLock::new(Vec::new()),
            _args: PhantomData,
        }
    }

    fn bump(&self, slot: usize, passed: bool) {
        let counters = if passed { &self.accepted } else { &self.rejected };
        let counters = counters.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(counter) = counters.get(slot) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn total(counters: &RwLock<Vec<AtomicU64>>) -> u64 {
        counters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|c| c.load(Ordering::Relaxed))
            .sum()
    }
}

impl<F, Args> FilterLike for FilterNode<F, Args>
where
    Args: RowArgs,
    F: RowFn<Args, Out = bool>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn check(&self, slot: usize, row: u64) -> HelionResult<bool> {
        let row_index = row as i64;

        let memoized = self.state.with(slot, |s| {
            if s.last_row == row_index {
                Some(s.last_result == 1)
            } else {
                None
            }
        })?;
        if let Some(hit) = memoized {
            return Ok(hit);
        }

        let passed = if self.parent.check_filters(slot, row)? {
            let args = self
                .state
                .with(slot, |s| {
                    Args::fetch(&RowCtx {
                        sources: &s.sources,
                        slot,
                        row,
                    })
                })??;
            let passed = self.predicate.invoke(args);
            self.bump(slot, passed);
            passed
        } else {
            // A filter upstream rejected the row: memoize without touching
            // the counters, the row never reached this predicate.
            false
        };

        self.state.with(slot, |s| {
            s.last_row = row_index;
            s.last_result = i8::from(passed);
        })?;
        Ok(passed)
    }

    fn init_slots(&self, table: &dyn EventTable, n_slots: usize) -> HelionResult<()> {
        self.state.init_with(n_slots, |_| {
            Ok(FilterSlot {
                last_row: -1,
                last_result: -1,
                sources: build_sources(&self.bindings, table)?,
            })
        })?;
        let fresh = || (0..n_slots).map(|_| AtomicU64::new(0)).collect();
        *self.accepted.write().unwrap_or_else(PoisonError::into_inner) = fresh();
        *self.rejected.write().unwrap_or_else(PoisonError::into_inner) = fresh();
        Ok(())
    }

    fn release_slots(&self) {
        self.state.clear();
    }

    fn stats(&self) -> Option<FilterStats> {
        if self.name.is_empty() {
            return None;
        }
        Some(FilterStats::new(
            self.name.clone(),
            Self::total(&self.accepted),
            Self::total(&self.rejected),
        ))
    }

    fn collect_stats(&self, out: &mut Vec<FilterStats>) {
        self.parent.collect_stats(out);
        if let Some(stats) = self.stats() {
            out.push(stats);
        }
    }

    fn parent(&self) -> &Upstream {
        &self.parent
    }

    fn describe(&self) -> String {
        if self.name.is_empty() {
            format!("Filter [{}]", self.columns.join(", "))
        } else {
            format!("Filter '{}' [{}]", self.name, self.columns.join(", "))
        }
    }
}
