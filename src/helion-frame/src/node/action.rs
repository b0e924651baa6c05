//! Action nodes.

use common_error::HelionResult;
use helion_storage::EventTable;

use crate::columns::{build_sources, ColumnBinding, ColumnSource, RowArgs, RowCtx};
use crate::node::Upstream;
use crate::slot::SlotVec;

/// Callable invoked once per accepted (slot, row) with fetched values.
pub(crate) type ActionCallable<Args> =
    Box<dyn Fn(usize, Args) -> HelionResult<()> + Send + Sync>;

/// Allocate the operation's per-slot partials.
pub(crate) type OpInit = Box<dyn Fn(usize) -> HelionResult<()> + Send + Sync>;

/// Merge per-slot partials into the user-visible aggregate.
pub(crate) type OpFinalize = Box<dyn Fn() -> HelionResult<()> + Send + Sync>;

/// Drop the operation's per-slot partials.
pub(crate) type OpRelease = Box<dyn Fn() + Send + Sync>;

/// Terminal node, seen through its object-safe surface.
pub(crate) trait ActionExec: Send + Sync + 'static {
    /// Display label for graph rendering.
    fn label(&self) -> String;

    /// Process one (slot, row): ask the upstream chain whether the row
    /// passes, and if so fetch inputs and invoke the callable.
    fn run(&self, slot: usize, row: u64) -> HelionResult<()>;

    /// Allocate per-slot cursors and operation partials.
    fn init_slots(&self, table: &dyn EventTable, n_slots: usize) -> HelionResult<()>;

    /// Drop per-slot cursors and operation partials.
    fn release_slots(&self);

    /// Merge partials into the published aggregate. Runs on one thread,
    /// after all rows for all slots have been processed.
    fn finalize(&self) -> HelionResult<()>;

    /// Upstream neighbour.
    fn parent(&self) -> &Upstream;
}

/// Generic action node wiring a callable to an operation's lifecycle.
pub(crate) struct Action<Args> {
    label: String,
    callable: ActionCallable<Args>,
    bindings: Vec<ColumnBinding>,
    parent: Upstream,
    sources: SlotVec<Vec<ColumnSource>>,
    op_init: OpInit,
    op_finalize: OpFinalize,
    op_release: OpRelease,
}

impl<Args: RowArgs> Action<Args> {
    pub fn new(
        label: impl Into<String>,
        callable: ActionCallable<Args>,
        bindings: Vec<ColumnBinding>,
        parent: Upstream,
        op_init: OpInit,
        op_finalize: OpFinalize,
        op_release: OpRelease,
    ) -> Self {
        Self {
            label: label.into(),
            callable,
            bindings,
            parent,
            sources: SlotVec::new(),
            op_init,
            op_finalize,
            op_release,
        }
    }
}

impl<Args: RowArgs> ActionExec for Action<Args> {
    fn label(&self) -> String {
        self.label.clone()
    }

    fn run(&self, slot: usize, row: u64) -> HelionResult<()> {
        if !self.parent.check_filters(slot, row)? {
            return Ok(());
        }
        let args = self
            .sources
            .with(slot, |sources| {
                Args::fetch(&RowCtx {
                    sources,
                    slot,
                    row,
                })
            })??;
        (self.callable)(slot, args)
    }

    fn init_slots(&self, table: &dyn EventTable, n_slots: usize) -> HelionResult<()> {
        self.sources
            .init_with(n_slots, |_| build_sources(&self.bindings, table))?;
        (self.op_init)(n_slots)
    }

    fn release_slots(&self) {
        self.sources.clear();
        (self.op_release)();
    }

    fn finalize(&self) -> HelionResult<()> {
        (self.op_finalize)()
    }

    fn parent(&self) -> &Upstream {
        &self.parent
    }
}
