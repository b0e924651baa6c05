//! Derived-column nodes.

use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

use common_error::HelionResult;
use helion_core::ElementType;
use helion_storage::EventTable;

use crate::columns::{build_sources, ColumnBinding, ColumnSource, FrameValue, RowArgs, RowCtx, RowFn};
use crate::node::{DefineLike, Upstream};
use crate::report::FilterStats;
use crate::slot::SlotVec;

/// Per-slot derived-column scratch: the last evaluated row and its value.
struct DefineSlot {
    last_row: i64,
    cached: Option<Arc<dyn Any + Send + Sync>>,
    sources: Vec<ColumnSource>,
}

/// An expression node registering a new column visible downstream.
///
/// The expression is pure; it is evaluated at most once per (slot, row) and
/// the value is stored by shared ownership so every same-row consumer
/// receives the same object.
pub(crate) struct DefineNode<F, Args> {
    name: String,
    expression: F,
    columns: Vec<String>,
    bindings: Vec<ColumnBinding>,
    parent: Upstream,
    state: SlotVec<DefineSlot>,
    _args: PhantomData<fn() -> Args>,
}

impl<F, Args> DefineNode<F, Args>
where
    Args: RowArgs,
    F: RowFn<Args>,
    F::Out: FrameValue,
{
    pub fn new(
        name: impl Into<String>,
        expression: F,
        columns: Vec<String>,
        bindings: Vec<ColumnBinding>,
        parent: Upstream,
    ) -> Self {
        Self {
            name: name.into(),
            expression,
            columns,
            bindings,
            parent,
            state: SlotVec::new(),
            _args: PhantomData,
        }
    }
}

impl<F, Args> DefineLike for DefineNode<F, Args>
where
    Args: RowArgs,
    F: RowFn<Args>,
    F::Out: FrameValue,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn output_type(&self) -> Option<ElementType> {
        <F::Out as FrameValue>::element_type()
    }

    fn value(&self, slot: usize, row: u64) -> HelionResult<Arc<dyn Any + Send + Sync>> {
        let row_index = row as i64;

        let cached = self.state.with(slot, |s| {
            if s.last_row == row_index {
                s.cached.clone()
            } else {
                None
            }
        })?;
        if let Some(value) = cached {
            return Ok(value);
        }

        let args = self
            .state
            .with(slot, |s| {
                Args::fetch(&RowCtx {
                    sources: &s.sources,
                    slot,
                    row,
                })
            })??;
        let value: Arc<dyn Any + Send + Sync> = Arc::new(self.expression.invoke(args));

        self.state.with(slot, |s| {
            s.last_row = row_index;
            s.cached = Some(Arc::clone(&value));
        })?;
        Ok(value)
    }

    fn check(&self, slot: usize, row: u64) -> HelionResult<bool> {
        // Forward to the previous node in the chain.
        self.parent.check_filters(slot, row)
    }

    fn init_slots(&self, table: &dyn EventTable, n_slots: usize) -> HelionResult<()> {
        self.state.init_with(n_slots, |_| {
            Ok(DefineSlot {
                last_row: -1,
                cached: None,
                sources: build_sources(&self.bindings, table)?,
            })
        })
    }

    fn release_slots(&self) {
        self.state.clear();
    }

    fn collect_stats(&self, out: &mut Vec<FilterStats>) {
        self.parent.collect_stats(out);
    }

    fn parent(&self) -> &Upstream {
        &self.parent
    }

    fn describe(&self) -> String {
        format!("Define '{}' [{}]", self.name, self.columns.join(", "))
    }
}
