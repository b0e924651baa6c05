//! Column value resolution and callable plumbing.
//!
//! A booked node declares its input columns by name; each name resolves at
//! booking time to either a derived column registered upstream or a physical
//! column of the input table. During the event loop the node reads its
//! inputs through per-slot [`ColumnSource`]s: physical columns go through a
//! typed cursor, derived columns delegate to the owning node's per-slot
//! cache so every same-row consumer observes the same shared value.

use std::any::Any;
use std::sync::Arc;

use common_error::{HelionError, HelionResult};
use helion_core::{ArrayView, ElementType};
use helion_storage::{ColumnCursor, ColumnRead, EventTable};

use crate::node::DefineLike;

/// Value types that can flow through frame columns.
///
/// Implemented for every scalar and array element type the storage layer
/// can read. User-visible record types produced by derived columns get the
/// default implementation (no element type, not physically readable):
///
/// ```ignore
/// #[derive(Clone)]
/// struct Candidate { pt: f64, charge: i32 }
/// impl FrameValue for Candidate {}
/// ```
pub trait FrameValue: Clone + Send + Sync + 'static {
    /// Element type tag for physical reads; `None` when values of this type
    /// can only come from derived columns.
    fn element_type() -> Option<ElementType> {
        None
    }

    /// Read a value of this type from a physical column cursor.
    #[doc(hidden)]
    fn read_physical(cursor: &ColumnCursor, _row: usize) -> HelionResult<Self> {
        Err(HelionError::type_error(format!(
            "column '{}': record types can only be read from derived columns",
            cursor.name()
        )))
    }
}

macro_rules! impl_frame_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FrameValue for $ty {
                fn element_type() -> Option<ElementType> {
                    Some(<$ty as ColumnRead>::element_type())
                }

                fn read_physical(cursor: &ColumnCursor, row: usize) -> HelionResult<Self> {
                    <$ty as ColumnRead>::read(cursor, row)
                }
            }
        )*
    };
}

impl_frame_value!(
    bool,
    i8,
    u8,
    i32,
    i64,
    f32,
    f64,
    ArrayView<f64>,
    ArrayView<f32>,
);

/// A declared input column, resolved at booking time.
#[derive(Clone)]
pub(crate) enum ColumnBinding {
    /// Physical column of the input table.
    Physical(String),
    /// Derived column registered upstream.
    Derived(Arc<dyn DefineLike>),
}

/// A per-slot reader for one input column.
#[derive(Clone)]
pub(crate) enum ColumnSource {
    /// Typed cursor over a physical column.
    Physical(ColumnCursor),
    /// Delegate to the derived column's per-slot cache.
    Derived(Arc<dyn DefineLike>),
}

/// Build one slot's sources for a node's bindings.
pub(crate) fn build_sources(
    bindings: &[ColumnBinding],
    table: &dyn EventTable,
) -> HelionResult<Vec<ColumnSource>> {
    bindings
        .iter()
        .map(|binding| match binding {
            ColumnBinding::Physical(name) => Ok(ColumnSource::Physical(table.cursor(name)?)),
            ColumnBinding::Derived(node) => Ok(ColumnSource::Derived(Arc::clone(node))),
        })
        .collect()
}

/// Fetch one typed value from a source.
pub(crate) fn fetch_value<T: FrameValue>(
    source: &ColumnSource,
    slot: usize,
    row: u64,
) -> HelionResult<T> {
    match source {
        ColumnSource::Physical(cursor) => T::read_physical(cursor, row as usize),
        ColumnSource::Derived(node) => {
            let value = node.value(slot, row)?;
            match value.downcast::<T>() {
                Ok(typed) => Ok((*typed).clone()),
                Err(_) => Err(HelionError::type_error(format!(
                    "derived column '{}' does not produce the requested type",
                    node.name()
                ))),
            }
        }
    }
}

/// Borrowed context handed to [`RowArgs::fetch`].
pub struct RowCtx<'a> {
    pub(crate) sources: &'a [ColumnSource],
    pub(crate) slot: usize,
    pub(crate) row: u64,
}

/// Tuples of [`FrameValue`]s fetched together for one callable invocation.
///
/// Implemented for tuples up to arity four; the tuple length is the
/// callable arity and must match the declared column list.
pub trait RowArgs: Sized + Send + 'static {
    /// Callable arity.
    #[doc(hidden)]
    const ARITY: usize;

    /// Expected element type per position (`None` for record types).
    #[doc(hidden)]
    fn element_types() -> Vec<Option<ElementType>>;

    /// Fetch all values for one `(slot, row)`.
    #[doc(hidden)]
    fn fetch(ctx: &RowCtx<'_>) -> HelionResult<Self>;
}

impl RowArgs for () {
    const ARITY: usize = 0;

    fn element_types() -> Vec<Option<ElementType>> {
        Vec::new()
    }

    fn fetch(_ctx: &RowCtx<'_>) -> HelionResult<Self> {
        Ok(())
    }
}

macro_rules! impl_row_args {
    ($arity:expr; $($ty:ident => $idx:tt),+) => {
        impl<$($ty: FrameValue),+> RowArgs for ($($ty,)+) {
            const ARITY: usize = $arity;

            fn element_types() -> Vec<Option<ElementType>> {
                vec![$($ty::element_type()),+]
            }

            fn fetch(ctx: &RowCtx<'_>) -> HelionResult<Self> {
                Ok(($(fetch_value::<$ty>(&ctx.sources[$idx], ctx.slot, ctx.row)?,)+))
            }
        }
    };
}

impl_row_args!(1; A => 0);
impl_row_args!(2; A => 0, B => 1);
impl_row_args!(3; A => 0, B => 1, C => 2);
impl_row_args!(4; A => 0, B => 1, C => 2, D => 3);

/// Callables over a row's column values.
///
/// Implemented for plain functions and closures of matching arity; the
/// argument tuple is deduced from the closure signature.
pub trait RowFn<Args: RowArgs>: Send + Sync + 'static {
    /// Return type of the callable.
    type Out;

    /// Invoke with fetched values.
    #[doc(hidden)]
    fn invoke(&self, args: Args) -> Self::Out;
}

impl<F, R> RowFn<()> for F
where
    F: Fn() -> R + Send + Sync + 'static,
{
    type Out = R;

    fn invoke(&self, _args: ()) -> R {
        self()
    }
}

macro_rules! impl_row_fn {
    ($($ty:ident => $idx:tt),+) => {
        impl<F, R, $($ty: FrameValue),+> RowFn<($($ty,)+)> for F
        where
            F: Fn($($ty),+) -> R + Send + Sync + 'static,
        {
            type Out = R;

            fn invoke(&self, args: ($($ty,)+)) -> R {
                self($(args.$idx),+)
            }
        }
    };
}

impl_row_fn!(A => 0);
impl_row_fn!(A => 0, B => 1);
impl_row_fn!(A => 0, B => 1, C => 2);
impl_row_fn!(A => 0, B => 1, C => 2, D => 3);

/// Callables that additionally receive the processing slot index as their
/// first parameter, for slot-aware side effects.
pub trait SlotFn<Args: RowArgs>: Send + Sync + 'static {
    /// Invoke with the slot index and fetched values.
    #[doc(hidden)]
    fn invoke(&self, slot: usize, args: Args);
}

impl<F> SlotFn<()> for F
where
    F: Fn(usize) + Send + Sync + 'static,
{
    fn invoke(&self, slot: usize, _args: ()) {
        self(slot)
    }
}

macro_rules! impl_slot_fn {
    ($($ty:ident => $idx:tt),+) => {
        impl<F, $($ty: FrameValue),+> SlotFn<($($ty,)+)> for F
        where
            F: Fn(usize, $($ty),+) + Send + Sync + 'static,
        {
            fn invoke(&self, slot: usize, args: ($($ty,)+)) {
                self(slot, $(args.$idx),+)
            }
        }
    };
}

impl_slot_fn!(A => 0);
impl_slot_fn!(A => 0, B => 1);
impl_slot_fn!(A => 0, B => 1, C => 2);
impl_slot_fn!(A => 0, B => 1, C => 2, D => 3);
