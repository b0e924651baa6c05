//! The user-facing chain builder.
//!
//! [`EventFrame`] owns the engine and is the root of the dataflow graph;
//! [`FrameNode`] is a cheap handle to one position in the graph. Both carry
//! the same chain surface: transformations (`filter`, `define`) return a
//! new node, actions book work and return lazy [`ResultHandle`]s, and
//! `foreach`/`foreach_slot` are instant actions that trigger the event
//! loop on the spot.

use std::ops::Deref;
use std::sync::{Arc, Mutex, Weak};

use common_config::HelionConfig;
use common_error::{HelionError, HelionResult};
use helion_core::{ArrayView, ElementType};
use helion_hist::{Hist1D, Hist2D, Hist3D, Histogram};
use helion_storage::{EventTable, Storage};

use crate::columns::{ColumnBinding, FrameValue, RowArgs, RowFn, SlotFn};
use crate::dispatch;
use crate::engine::EngineCore;
use crate::node::{
    Action, ActionCallable, DefineLike, DefineNode, FilterLike, FilterNode, OpFinalize, OpInit,
    OpRelease, Upstream,
};
use crate::ops::{
    CountOp, FillClonesOp, FillOp, MaxOp, MeanOp, MinOp, ReduceOp, Sample, ScalarSample, TakeOp,
};
use crate::report::CutflowReport;
use crate::result::ResultHandle;

/// Wire an op's init/finalize/release hooks into boxed action closures.
macro_rules! op_lifecycle {
    ($op:expr) => {{
        let op_init = {
            let op = Arc::clone(&$op);
            Box::new(move |n_slots: usize| op.init(n_slots)) as OpInit
        };
        let op_finalize = {
            let op = Arc::clone(&$op);
            Box::new(move || op.finalize()) as OpFinalize
        };
        let op_release = {
            let op = Arc::clone(&$op);
            Box::new(move || op.release()) as OpRelease
        };
        (op_init, op_finalize, op_release)
    }};
}

/// Substitute the default column list where the declared one does not
/// cover the callable arity.
fn pick_columns(arity: usize, given: &[&str], defaults: &[String]) -> HelionResult<Vec<String>> {
    let non_empty = given.iter().filter(|name| !name.is_empty()).count();
    if given.len() == arity && non_empty == arity {
        return Ok(given.iter().map(ToString::to_string).collect());
    }
    if defaults.len() < arity {
        return Err(HelionError::InsufficientDefaults(format!(
            "{arity} column(s) needed, but the default list has {}; \
             please specify the columns explicitly",
            defaults.len()
        )));
    }
    Ok(defaults[..arity].to_vec())
}

/// The root of a dataflow graph over one event table.
///
/// Dropping the frame drops the engine; outstanding result handles that
/// were never dereferenced then fail with `EngineGone`.
///
/// ```ignore
/// let frame = EventFrame::new(table, &["pt"]);
/// let count = frame.filter(|pt: f64| pt > 20.0, &[])?.count()?;
/// let mean = frame.mean("")?;
/// println!("{} rows, <pt> = {}", *count.get()?, *mean.get()?);
/// ```
pub struct EventFrame {
    engine: Arc<EngineCore>,
    root: FrameNode,
}

impl std::fmt::Debug for EventFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventFrame")
            .field("table", &self.table_name())
            .finish()
    }
}

impl EventFrame {
    /// Build a frame over a table with serial execution.
    pub fn new(table: Arc<dyn EventTable>, default_columns: &[&str]) -> Self {
        Self::with_config(table, default_columns, &HelionConfig::default())
    }

    /// Build a frame over a table; the configuration's concurrency hint is
    /// consulted once, here, and fixes the slot count for the life of the
    /// engine.
    pub fn with_config(
        table: Arc<dyn EventTable>,
        default_columns: &[&str],
        config: &HelionConfig,
    ) -> Self {
        let n_slots = config.execution.effective_parallelism();
        let defaults = default_columns.iter().map(ToString::to_string).collect();
        let engine = Arc::new(EngineCore::new(table, defaults, n_slots));
        let root = FrameNode {
            engine: Arc::downgrade(&engine),
            node: Upstream::Root,
            defines: Vec::new(),
        };
        Self { engine, root }
    }

    /// Open a named table from a storage catalog.
    pub async fn open(
        storage: &dyn Storage,
        name: &str,
        default_columns: &[&str],
    ) -> HelionResult<Self> {
        let table = storage.open_table(name).await?;
        Ok(Self::new(table, default_columns))
    }

    /// Open a named table synchronously (blocking).
    pub fn open_sync(
        storage: &dyn Storage,
        name: &str,
        default_columns: &[&str],
    ) -> HelionResult<Self> {
        common_runtime::block_on(Self::open(storage, name, default_columns))?
    }

    /// Name of the underlying table.
    pub fn table_name(&self) -> String {
        self.engine.table().name().to_string()
    }

    /// Total number of input rows.
    pub fn row_count(&self) -> u64 {
        self.engine.table().row_count()
    }

    /// Default column list used when an action omits column names.
    pub fn default_columns(&self) -> &[String] {
        self.engine.default_columns()
    }

    /// Number of processing slots.
    pub fn n_slots(&self) -> usize {
        self.engine.n_slots()
    }

    /// Render the booked dataflow graph as a tree.
    pub fn explain(&self) -> String {
        self.engine.explain()
    }
}

impl Deref for EventFrame {
    type Target = FrameNode;

    fn deref(&self) -> &FrameNode {
        &self.root
    }
}

/// A position in the dataflow graph; new bookings attach below it.
///
/// Nodes are cheap to clone and hold the engine weakly: a node that
/// outlives its [`EventFrame`] fails with `EngineGone` on the next booking.
#[derive(Clone)]
pub struct FrameNode {
    pub(crate) engine: Weak<EngineCore>,
    pub(crate) node: Upstream,
    pub(crate) defines: Vec<String>,
}

impl std::fmt::Debug for FrameNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameNode")
            .field("defines", &self.defines)
            .finish()
    }
}

impl FrameNode {
    fn engine(&self) -> HelionResult<Arc<EngineCore>> {
        self.engine.upgrade().ok_or_else(HelionError::engine_gone)
    }

    fn child(&self, node: Upstream, defines: Vec<String>) -> FrameNode {
        FrameNode {
            engine: self.engine.clone(),
            node,
            defines,
        }
    }

    /// Resolve declared column names against derived columns and the table
    /// schema, checking declared value types where they are known.
    fn resolve_columns(
        &self,
        engine: &EngineCore,
        arity: usize,
        given: &[&str],
        expected: &[Option<ElementType>],
    ) -> HelionResult<(Vec<String>, Vec<ColumnBinding>)> {
        let columns = pick_columns(arity, given, engine.default_columns())?;
        let bindings = columns
            .iter()
            .zip(expected)
            .map(|(column, expected)| self.bind_column(engine, column, *expected))
            .collect::<HelionResult<Vec<_>>>()?;
        Ok((columns, bindings))
    }

    fn bind_column(
        &self,
        engine: &EngineCore,
        column: &str,
        expected: Option<ElementType>,
    ) -> HelionResult<ColumnBinding> {
        if self.defines.iter().any(|name| name == column) {
            let node = engine.define_by_name(column).ok_or_else(|| {
                HelionError::internal(format!("derived column '{column}' is not booked"))
            })?;
            if let (Some(expected), Some(recorded)) = (expected, node.output_type()) {
                if expected != recorded {
                    return Err(HelionError::type_error(format!(
                        "derived column '{column}' has type {recorded}, \
                         but the callable expects {expected}"
                    )));
                }
            }
            return Ok(ColumnBinding::Derived(node));
        }

        match engine.table().schema().element_type(column) {
            Some(actual) => match expected {
                Some(expected) if expected != actual => Err(HelionError::type_error(format!(
                    "column '{column}' has type {actual}, but the callable expects {expected}"
                ))),
                None => Err(HelionError::type_error(format!(
                    "column '{column}' is a physical column; \
                     record-typed inputs must come from derived columns"
                ))),
                _ => Ok(ColumnBinding::Physical(column.to_string())),
            },
            None => Err(HelionError::column_not_found(format!(
                "column '{column}' is neither a derived column nor part of table '{}'",
                engine.table().name()
            ))),
        }
    }

    // ------------------------------------------------------------------
    // Transformations
    // ------------------------------------------------------------------

    /// Append an anonymous filter to the graph.
    ///
    /// The predicate must return `bool`; it is evaluated at most once per
    /// (slot, row), and rows rejected by an upstream filter never reach it.
    pub fn filter<F, Args>(&self, predicate: F, columns: &[&str]) -> HelionResult<FrameNode>
    where
        Args: RowArgs,
        F: RowFn<Args, Out = bool>,
    {
        self.filter_named("", predicate, columns)
    }

    /// Append a named filter; named filters keep accepted/rejected
    /// counters surfaced by [`FrameNode::report`].
    pub fn filter_named<F, Args>(
        &self,
        name: &str,
        predicate: F,
        columns: &[&str],
    ) -> HelionResult<FrameNode>
    where
        Args: RowArgs,
        F: RowFn<Args, Out = bool>,
    {
        let engine = self.engine()?;
        let (columns, bindings) =
            self.resolve_columns(&engine, Args::ARITY, columns, &Args::element_types())?;
        let node: Arc<dyn FilterLike> = Arc::new(FilterNode::new(
            name,
            predicate,
            columns,
            bindings,
            self.node.clone(),
        ));
        engine.book_filter(Arc::clone(&node));
        Ok(self.child(Upstream::Filter(node), self.defines.clone()))
    }

    /// Register a derived column visible to all downstream nodes.
    ///
    /// The expression is pure; it is evaluated at most once per (slot, row)
    /// and only for rows that pass all preceding filters. The name must not
    /// collide with a physical column or a previously derived one.
    pub fn define<F, Args>(
        &self,
        name: &str,
        expression: F,
        columns: &[&str],
    ) -> HelionResult<FrameNode>
    where
        Args: RowArgs,
        F: RowFn<Args>,
        F::Out: FrameValue,
    {
        let engine = self.engine()?;
        if name.is_empty() {
            return Err(HelionError::value_error("derived columns need a name"));
        }
        if engine.table().schema().contains(name) {
            return Err(HelionError::DuplicateColumn(format!(
                "'{name}' is already a physical column of table '{}'",
                engine.table().name()
            )));
        }
        let (columns, bindings) =
            self.resolve_columns(&engine, Args::ARITY, columns, &Args::element_types())?;
        let node: Arc<dyn DefineLike> = Arc::new(DefineNode::new(
            name,
            expression,
            columns,
            bindings,
            self.node.clone(),
        ));
        engine.book_define(Arc::clone(&node))?;

        let mut defines = self.defines.clone();
        defines.push(name.to_string());
        Ok(self.child(Upstream::Define(node), defines))
    }

    // ------------------------------------------------------------------
    // Instant actions
    // ------------------------------------------------------------------

    /// Execute a callable on each accepted row (instant action: the event
    /// loop runs before this returns).
    pub fn foreach<F, Args>(&self, f: F, columns: &[&str]) -> HelionResult<()>
    where
        Args: RowArgs,
        F: RowFn<Args, Out = ()>,
    {
        let engine = self.engine()?;
        let (_, bindings) =
            self.resolve_columns(&engine, Args::ARITY, columns, &Args::element_types())?;
        let callable = Box::new(move |_slot: usize, args: Args| {
            f.invoke(args);
            Ok(())
        }) as ActionCallable<Args>;
        self.book_raw_action(&engine, "Foreach", callable, bindings);
        engine.run()
    }

    /// Like [`FrameNode::foreach`], but the callable receives the
    /// processing slot index as its first parameter, for slot-aware
    /// side effects under parallel execution.
    pub fn foreach_slot<F, Args>(&self, f: F, columns: &[&str]) -> HelionResult<()>
    where
        Args: RowArgs,
        F: SlotFn<Args>,
    {
        let engine = self.engine()?;
        let (_, bindings) =
            self.resolve_columns(&engine, Args::ARITY, columns, &Args::element_types())?;
        let callable = Box::new(move |slot: usize, args: Args| {
            f.invoke(slot, args);
            Ok(())
        }) as ActionCallable<Args>;
        self.book_raw_action(&engine, "ForeachSlot", callable, bindings);
        engine.run()
    }

    fn book_raw_action<Args: RowArgs>(
        &self,
        engine: &Arc<EngineCore>,
        label: &str,
        callable: ActionCallable<Args>,
        bindings: Vec<ColumnBinding>,
    ) {
        let action = Action::new(
            label,
            callable,
            bindings,
            self.node.clone(),
            Box::new(|_| Ok(())) as OpInit,
            Box::new(|| Ok(())) as OpFinalize,
            Box::new(|| ()) as OpRelease,
        );
        engine.book_action(Arc::new(action));
    }

    // ------------------------------------------------------------------
    // Lazy actions
    // ------------------------------------------------------------------

    /// Count the rows that reach this node (lazy action).
    pub fn count(&self) -> HelionResult<ResultHandle<u64>> {
        let engine = self.engine()?;
        let result = Arc::new(Mutex::new(0u64));
        let op = Arc::new(CountOp::new(Arc::clone(&result)));
        let callable = {
            let op = Arc::clone(&op);
            Box::new(move |slot: usize, _args: ()| op.exec(slot)) as ActionCallable<()>
        };
        let (op_init, op_finalize, op_release) = op_lifecycle!(op);
        let action = Action::new(
            "Count",
            callable,
            Vec::new(),
            self.node.clone(),
            op_init,
            op_finalize,
            op_release,
        );
        engine.book_action(Arc::new(action));
        Ok(EngineCore::make_handle(&engine, result))
    }

    /// Reduce a column's values with `f`, seeding with `T::default()`
    /// (lazy action). `f` is assumed associative.
    pub fn reduce<T, F>(&self, f: F, column: &str) -> HelionResult<ResultHandle<T>>
    where
        T: FrameValue + Default,
        F: Fn(T, T) -> T + Send + Sync + 'static,
    {
        self.reduce_with(f, column, T::default())
    }

    /// Reduce a column's values with `f`, seeding every per-slot partial
    /// with `init` (lazy action).
    pub fn reduce_with<T, F>(&self, f: F, column: &str, init: T) -> HelionResult<ResultHandle<T>>
    where
        T: FrameValue,
        F: Fn(T, T) -> T + Send + Sync + 'static,
    {
        let engine = self.engine()?;
        let (columns, bindings) =
            self.resolve_columns(&engine, 1, &[column], &<(T,)>::element_types())?;
        let result = Arc::new(Mutex::new(init.clone()));
        let op = Arc::new(ReduceOp::new(f, init, Arc::clone(&result)));
        let callable = {
            let op = Arc::clone(&op);
            Box::new(move |slot: usize, (value,): (T,)| op.exec(slot, value))
                as ActionCallable<(T,)>
        };
        let (op_init, op_finalize, op_release) = op_lifecycle!(op);
        let action = Action::new(
            format!("Reduce({})", columns[0]),
            callable,
            bindings,
            self.node.clone(),
            op_init,
            op_finalize,
            op_release,
        );
        engine.book_action(Arc::new(action));
        Ok(EngineCore::make_handle(&engine, result))
    }

    /// Collect a column's values into a `Vec`, in slot-id order and, within
    /// a slot, ascending row order (lazy action).
    pub fn take<T: FrameValue>(&self, column: &str) -> HelionResult<ResultHandle<Vec<T>>> {
        self.take_into::<T, Vec<T>>(column)
    }

    /// Collect a column's values into an arbitrary collection (lazy
    /// action).
    pub fn take_into<T, C>(&self, column: &str) -> HelionResult<ResultHandle<C>>
    where
        T: FrameValue,
        C: Default + Extend<T> + IntoIterator<Item = T> + Send + 'static,
    {
        let engine = self.engine()?;
        let (columns, bindings) =
            self.resolve_columns(&engine, 1, &[column], &<(T,)>::element_types())?;
        let result = Arc::new(Mutex::new(C::default()));
        let op = Arc::new(TakeOp::<T, C>::new(Arc::clone(&result)));
        let callable = {
            let op = Arc::clone(&op);
            Box::new(move |slot: usize, (value,): (T,)| op.exec(slot, value))
                as ActionCallable<(T,)>
        };
        let (op_init, op_finalize, op_release) = op_lifecycle!(op);
        let action = Action::new(
            format!("Take({})", columns[0]),
            callable,
            bindings,
            self.node.clone(),
            op_init,
            op_finalize,
            op_release,
        );
        engine.book_action(Arc::new(action));
        Ok(EngineCore::make_handle(&engine, result))
    }

    /// Minimum of a column's values, with the element type inferred from
    /// input metadata (lazy action). The empty-input value is `+inf`.
    pub fn min(&self, column: &str) -> HelionResult<ResultHandle<f64>> {
        let engine = self.engine()?;
        let columns = pick_columns(1, &[column], engine.default_columns())?;
        match dispatch::resolve_type(&engine, &self.defines, &columns[0])? {
            ElementType::Int8 => self.min_typed::<i8>(&columns[0]),
            ElementType::Int32 => self.min_typed::<i32>(&columns[0]),
            ElementType::Float64 => self.min_typed::<f64>(&columns[0]),
            ElementType::ArrayFloat64 => self.min_typed::<ArrayView<f64>>(&columns[0]),
            ElementType::ArrayFloat32 => self.min_typed::<ArrayView<f32>>(&columns[0]),
            other => Err(HelionError::cannot_infer(format!(
                "column '{}' has uninferable type {other}",
                columns[0]
            ))),
        }
    }

    /// Minimum of a column's values with an explicit element type (lazy
    /// action).
    pub fn min_typed<T: Sample>(&self, column: &str) -> HelionResult<ResultHandle<f64>> {
        let engine = self.engine()?;
        let (columns, bindings) =
            self.resolve_columns(&engine, 1, &[column], &<(T,)>::element_types())?;
        let result = Arc::new(Mutex::new(f64::INFINITY));
        let op = Arc::new(MinOp::new(Arc::clone(&result)));
        let callable = {
            let op = Arc::clone(&op);
            Box::new(move |slot: usize, (value,): (T,)| op.exec(slot, &value))
                as ActionCallable<(T,)>
        };
        let (op_init, op_finalize, op_release) = op_lifecycle!(op);
        let action = Action::new(
            format!("Min({})", columns[0]),
            callable,
            bindings,
            self.node.clone(),
            op_init,
            op_finalize,
            op_release,
        );
        engine.book_action(Arc::new(action));
        Ok(EngineCore::make_handle(&engine, result))
    }

    /// Maximum of a column's values, element type inferred (lazy action).
    /// The empty-input value is `-inf`.
    pub fn max(&self, column: &str) -> HelionResult<ResultHandle<f64>> {
        let engine = self.engine()?;
        let columns = pick_columns(1, &[column], engine.default_columns())?;
        match dispatch::resolve_type(&engine, &self.defines, &columns[0])? {
            ElementType::Int8 => self.max_typed::<i8>(&columns[0]),
            ElementType::Int32 => self.max_typed::<i32>(&columns[0]),
            ElementType::Float64 => self.max_typed::<f64>(&columns[0]),
            ElementType::ArrayFloat64 => self.max_typed::<ArrayView<f64>>(&columns[0]),
            ElementType::ArrayFloat32 => self.max_typed::<ArrayView<f32>>(&columns[0]),
            other => Err(HelionError::cannot_infer(format!(
                "column '{}' has uninferable type {other}",
                columns[0]
            ))),
        }
    }

    /// Maximum of a column's values with an explicit element type (lazy
    /// action).
    pub fn max_typed<T: Sample>(&self, column: &str) -> HelionResult<ResultHandle<f64>> {
        let engine = self.engine()?;
        let (columns, bindings) =
            self.resolve_columns(&engine, 1, &[column], &<(T,)>::element_types())?;
        let result = Arc::new(Mutex::new(f64::NEG_INFINITY));
        let op = Arc::new(MaxOp::new(Arc::clone(&result)));
        let callable = {
            let op = Arc::clone(&op);
            Box::new(move |slot: usize, (value,): (T,)| op.exec(slot, &value))
                as ActionCallable<(T,)>
        };
        let (op_init, op_finalize, op_release) = op_lifecycle!(op);
        let action = Action::new(
            format!("Max({})", columns[0]),
            callable,
            bindings,
            self.node.clone(),
            op_init,
            op_finalize,
            op_release,
        );
        engine.book_action(Arc::new(action));
        Ok(EngineCore::make_handle(&engine, result))
    }

    /// Mean of a column's values, element type inferred (lazy action).
    /// The empty-input value is `0.0`.
    pub fn mean(&self, column: &str) -> HelionResult<ResultHandle<f64>> {
        let engine = self.engine()?;
        let columns = pick_columns(1, &[column], engine.default_columns())?;
        match dispatch::resolve_type(&engine, &self.defines, &columns[0])? {
            ElementType::Int8 => self.mean_typed::<i8>(&columns[0]),
            ElementType::Int32 => self.mean_typed::<i32>(&columns[0]),
            ElementType::Float64 => self.mean_typed::<f64>(&columns[0]),
            ElementType::ArrayFloat64 => self.mean_typed::<ArrayView<f64>>(&columns[0]),
            ElementType::ArrayFloat32 => self.mean_typed::<ArrayView<f32>>(&columns[0]),
            other => Err(HelionError::cannot_infer(format!(
                "column '{}' has uninferable type {other}",
                columns[0]
            ))),
        }
    }

    /// Mean of a column's values with an explicit element type (lazy
    /// action).
    pub fn mean_typed<T: Sample>(&self, column: &str) -> HelionResult<ResultHandle<f64>> {
        let engine = self.engine()?;
        let (columns, bindings) =
            self.resolve_columns(&engine, 1, &[column], &<(T,)>::element_types())?;
        let result = Arc::new(Mutex::new(0.0_f64));
        let op = Arc::new(MeanOp::new(Arc::clone(&result)));
        let callable = {
            let op = Arc::clone(&op);
            Box::new(move |slot: usize, (value,): (T,)| op.exec(slot, &value))
                as ActionCallable<(T,)>
        };
        let (op_init, op_finalize, op_release) = op_lifecycle!(op);
        let action = Action::new(
            format!("Mean({})", columns[0]),
            callable,
            bindings,
            self.node.clone(),
            op_init,
            op_finalize,
            op_release,
        );
        engine.book_action(Arc::new(action));
        Ok(EngineCore::make_handle(&engine, result))
    }

    // ------------------------------------------------------------------
    // Histogram actions
    // ------------------------------------------------------------------

    /// Fill a one-dimensional histogram with a column's values, element
    /// type inferred (lazy action).
    ///
    /// A model without axis limits buffers values per slot and derives the
    /// axis range from the union extrema at merge time, trading memory for
    /// one-shot axis selection.
    pub fn histo1d(&self, model: Hist1D, column: &str) -> HelionResult<ResultHandle<Hist1D>> {
        let engine = self.engine()?;
        let columns = pick_columns(1, &[column], engine.default_columns())?;
        match dispatch::resolve_type(&engine, &self.defines, &columns[0])? {
            ElementType::Int8 => self.histo1d_typed::<i8>(model, &columns[0]),
            ElementType::Int32 => self.histo1d_typed::<i32>(model, &columns[0]),
            ElementType::Float64 => self.histo1d_typed::<f64>(model, &columns[0]),
            ElementType::ArrayFloat64 => self.histo1d_typed::<ArrayView<f64>>(model, &columns[0]),
            ElementType::ArrayFloat32 => self.histo1d_typed::<ArrayView<f32>>(model, &columns[0]),
            other => Err(HelionError::cannot_infer(format!(
                "column '{}' has uninferable type {other}",
                columns[0]
            ))),
        }
    }

    /// Fill a one-dimensional histogram with an explicit element type
    /// (lazy action).
    pub fn histo1d_typed<T: Sample>(
        &self,
        model: Hist1D,
        column: &str,
    ) -> HelionResult<ResultHandle<Hist1D>> {
        let engine = self.engine()?;
        let (columns, bindings) =
            self.resolve_columns(&engine, 1, &[column], &<(T,)>::element_types())?;
        let label = format!("Histo1D({})", columns[0]);
        let result = Arc::new(Mutex::new(model.clone()));

        if model.has_axis_limits() {
            let op = Arc::new(FillClonesOp::new(model, Arc::clone(&result)));
            let callable = {
                let op = Arc::clone(&op);
                Box::new(move |slot: usize, (value,): (T,)| {
                    op.exec(slot, |h| value.each_sample(&mut |x| h.fill(x)))
                }) as ActionCallable<(T,)>
            };
            let (op_init, op_finalize, op_release) = op_lifecycle!(op);
            let action = Action::new(
                label,
                callable,
                bindings,
                self.node.clone(),
                op_init,
                op_finalize,
                op_release,
            );
            engine.book_action(Arc::new(action));
        } else {
            let op = Arc::new(FillOp::new(model.axis().nbins(), Arc::clone(&result)));
            let callable = {
                let op = Arc::clone(&op);
                Box::new(move |slot: usize, (value,): (T,)| op.exec(slot, &value, 1.0))
                    as ActionCallable<(T,)>
            };
            let (op_init, op_finalize, op_release) = op_lifecycle!(op);
            let action = Action::new(
                label,
                callable,
                bindings,
                self.node.clone(),
                op_init,
                op_finalize,
                op_release,
            );
            engine.book_action(Arc::new(action));
        }
        Ok(EngineCore::make_handle(&engine, result))
    }

    /// Fill a weighted one-dimensional histogram (lazy action).
    pub fn histo1d_weighted<T: Sample, W: ScalarSample>(
        &self,
        model: Hist1D,
        column: &str,
        weight_column: &str,
    ) -> HelionResult<ResultHandle<Hist1D>> {
        let engine = self.engine()?;
        let (columns, bindings) = self.resolve_columns(
            &engine,
            2,
            &[column, weight_column],
            &<(T, W)>::element_types(),
        )?;
        let label = format!("Histo1D({}, w={})", columns[0], columns[1]);
        let result = Arc::new(Mutex::new(model.clone()));

        if model.has_axis_limits() {
            let op = Arc::new(FillClonesOp::new(model, Arc::clone(&result)));
            let callable = {
                let op = Arc::clone(&op);
                Box::new(move |slot: usize, (value, weight): (T, W)| {
                    let w = weight.as_f64();
                    op.exec(slot, |h| value.each_sample(&mut |x| h.fill_weighted(x, w)))
                }) as ActionCallable<(T, W)>
            };
            let (op_init, op_finalize, op_release) = op_lifecycle!(op);
            let action = Action::new(
                label,
                callable,
                bindings,
                self.node.clone(),
                op_init,
                op_finalize,
                op_release,
            );
            engine.book_action(Arc::new(action));
        } else {
            let op = Arc::new(FillOp::new(model.axis().nbins(), Arc::clone(&result)));
            let callable = {
                let op = Arc::clone(&op);
                Box::new(move |slot: usize, (value, weight): (T, W)| {
                    op.exec(slot, &value, weight.as_f64())
                }) as ActionCallable<(T, W)>
            };
            let (op_init, op_finalize, op_release) = op_lifecycle!(op);
            let action = Action::new(
                label,
                callable,
                bindings,
                self.node.clone(),
                op_init,
                op_finalize,
                op_release,
            );
            engine.book_action(Arc::new(action));
        }
        Ok(EngineCore::make_handle(&engine, result))
    }

    /// Fill a two-dimensional histogram (lazy action). The model must have
    /// explicit limits on both axes.
    pub fn histo2d<X: ScalarSample, Y: ScalarSample>(
        &self,
        model: Hist2D,
        x_column: &str,
        y_column: &str,
    ) -> HelionResult<ResultHandle<Hist2D>> {
        let engine = self.engine()?;
        if !model.has_axis_limits() {
            return Err(HelionError::value_error(
                "2D histograms without axis limits are not supported",
            ));
        }
        let (columns, bindings) = self.resolve_columns(
            &engine,
            2,
            &[x_column, y_column],
            &<(X, Y)>::element_types(),
        )?;
        let result = Arc::new(Mutex::new(model.clone()));
        let op = Arc::new(FillClonesOp::new(model, Arc::clone(&result)));
        let callable = {
            let op = Arc::clone(&op);
            Box::new(move |slot: usize, (x, y): (X, Y)| {
                op.exec(slot, |h| h.fill(x.as_f64(), y.as_f64()))
            }) as ActionCallable<(X, Y)>
        };
        let (op_init, op_finalize, op_release) = op_lifecycle!(op);
        let action = Action::new(
            format!("Histo2D({}, {})", columns[0], columns[1]),
            callable,
            bindings,
            self.node.clone(),
            op_init,
            op_finalize,
            op_release,
        );
        engine.book_action(Arc::new(action));
        Ok(EngineCore::make_handle(&engine, result))
    }

    /// Fill a weighted two-dimensional histogram (lazy action).
    pub fn histo2d_weighted<X: ScalarSample, Y: ScalarSample, W: ScalarSample>(
        &self,
        model: Hist2D,
        x_column: &str,
        y_column: &str,
        weight_column: &str,
    ) -> HelionResult<ResultHandle<Hist2D>> {
        let engine = self.engine()?;
        if !model.has_axis_limits() {
            return Err(HelionError::value_error(
                "2D histograms without axis limits are not supported",
            ));
        }
        let (columns, bindings) = self.resolve_columns(
            &engine,
            3,
            &[x_column, y_column, weight_column],
            &<(X, Y, W)>::element_types(),
        )?;
        let result = Arc::new(Mutex::new(model.clone()));
        let op = Arc::new(FillClonesOp::new(model, Arc::clone(&result)));
        let callable = {
            let op = Arc::clone(&op);
            Box::new(move |slot: usize, (x, y, w): (X, Y, W)| {
                op.exec(slot, |h| h.fill_weighted(x.as_f64(), y.as_f64(), w.as_f64()))
            }) as ActionCallable<(X, Y, W)>
        };
        let (op_init, op_finalize, op_release) = op_lifecycle!(op);
        let action = Action::new(
            format!("Histo2D({}, {}, w={})", columns[0], columns[1], columns[2]),
            callable,
            bindings,
            self.node.clone(),
            op_init,
            op_finalize,
            op_release,
        );
        engine.book_action(Arc::new(action));
        Ok(EngineCore::make_handle(&engine, result))
    }

    /// Fill a three-dimensional histogram (lazy action). The model must
    /// have explicit limits on all axes.
    pub fn histo3d<X: ScalarSample, Y: ScalarSample, Z: ScalarSample>(
        &self,
        model: Hist3D,
        x_column: &str,
        y_column: &str,
        z_column: &str,
    ) -> HelionResult<ResultHandle<Hist3D>> {
        let engine = self.engine()?;
        if !model.has_axis_limits() {
            return Err(HelionError::value_error(
                "3D histograms without axis limits are not supported",
            ));
        }
        let (columns, bindings) = self.resolve_columns(
            &engine,
            3,
            &[x_column, y_column, z_column],
            &<(X, Y, Z)>::element_types(),
        )?;
        let result = Arc::new(Mutex::new(model.clone()));
        let op = Arc::new(FillClonesOp::new(model, Arc::clone(&result)));
        let callable = {
            let op = Arc::clone(&op);
            Box::new(move |slot: usize, (x, y, z): (X, Y, Z)| {
                op.exec(slot, |h| h.fill(x.as_f64(), y.as_f64(), z.as_f64()))
            }) as ActionCallable<(X, Y, Z)>
        };
        let (op_init, op_finalize, op_release) = op_lifecycle!(op);
        let action = Action::new(
            format!(
                "Histo3D({}, {}, {})",
                columns[0], columns[1], columns[2]
            ),
            callable,
            bindings,
            self.node.clone(),
            op_init,
            op_finalize,
            op_release,
        );
        engine.book_action(Arc::new(action));
        Ok(EngineCore::make_handle(&engine, result))
    }

    /// Fill a weighted three-dimensional histogram (lazy action).
    pub fn histo3d_weighted<X, Y, Z, W>(
        &self,
        model: Hist3D,
        x_column: &str,
        y_column: &str,
        z_column: &str,
        weight_column: &str,
    ) -> HelionResult<ResultHandle<Hist3D>>
    where
        X: ScalarSample,
        Y: ScalarSample,
        Z: ScalarSample,
        W: ScalarSample,
    {
        let engine = self.engine()?;
        if !model.has_axis_limits() {
            return Err(HelionError::value_error(
                "3D histograms without axis limits are not supported",
            ));
        }
        let (columns, bindings) = self.resolve_columns(
            &engine,
            4,
            &[x_column, y_column, z_column, weight_column],
            &<(X, Y, Z, W)>::element_types(),
        )?;
        let result = Arc::new(Mutex::new(model.clone()));
        let op = Arc::new(FillClonesOp::new(model, Arc::clone(&result)));
        let callable = {
            let op = Arc::clone(&op);
            Box::new(move |slot: usize, (x, y, z, w): (X, Y, Z, W)| {
                op.exec(slot, |h| {
                    h.fill_weighted(x.as_f64(), y.as_f64(), z.as_f64(), w.as_f64())
                })
            }) as ActionCallable<(X, Y, Z, W)>
        };
        let (op_init, op_finalize, op_release) = op_lifecycle!(op);
        let action = Action::new(
            format!(
                "Histo3D({}, {}, {}, w={})",
                columns[0], columns[1], columns[2], columns[3]
            ),
            callable,
            bindings,
            self.node.clone(),
            op_init,
            op_finalize,
            op_release,
        );
        engine.book_action(Arc::new(action));
        Ok(EngineCore::make_handle(&engine, result))
    }

    // ------------------------------------------------------------------
    // Reporting
    // ------------------------------------------------------------------

    /// Statistics for the named filters between the root and this node, in
    /// booking order. Called on the root, reports every named filter in
    /// the graph.
    ///
    /// Fails with `NotYetRun` before the first event loop.
    pub fn report(&self) -> HelionResult<CutflowReport> {
        let engine = self.engine()?;
        engine.check_has_run()?;
        match &self.node {
            Upstream::Root => engine.report_all(),
            node => {
                let mut stats = Vec::new();
                node.collect_stats(&mut stats);
                Ok(CutflowReport::new(stats))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_columns_explicit_wins() {
        let defaults = vec!["a".to_string(), "b".to_string()];
        let picked = pick_columns(1, &["x"], &defaults).unwrap();
        assert_eq!(picked, vec!["x"]);
    }

    #[test]
    fn test_pick_columns_defaults_truncated() {
        let defaults = vec!["a".to_string(), "b".to_string()];
        let picked = pick_columns(1, &[], &defaults).unwrap();
        assert_eq!(picked, vec!["a"]);

        let picked = pick_columns(2, &[""], &defaults).unwrap();
        assert_eq!(picked, vec!["a", "b"]);
    }

    #[test]
    fn test_pick_columns_insufficient_defaults() {
        let defaults = vec!["a".to_string()];
        let err = pick_columns(2, &[], &defaults).unwrap_err();
        assert!(matches!(err, HelionError::InsufficientDefaults(_)));
    }
}
