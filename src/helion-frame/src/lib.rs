//! Deferred computation graph and single-pass execution engine.
//!
//! A user composes a dataflow graph over a logical event table: filters
//! (predicates on columns), derived columns (pure expressions producing new
//! columns visible downstream) and terminal actions consuming column values
//! to produce results. The graph is built eagerly but no data is read until
//! a result is demanded; at that moment a single pass over all input rows
//! executes every scheduled action together, sharing column reads and
//! filter evaluation.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────┐     ┌──────────────────────────┐     ┌──────────────┐
//! │ EventFrame│ ──▶ │ graph: Filter / Define / │ ──▶ │ ResultHandle │
//! │ FrameNode │     │ Action  (booking order)  │     │ (lazy)       │
//! └───────────┘     └──────────────────────────┘     └──────────────┘
//!                               │ first dereference
//!                               ▼
//!                  single pass, one native thread per slot,
//!                  per-slot partials merged after the loop
//! ```
//!
//! # Key properties
//!
//! - **Lazy**: booking-only programs cause zero source I/O.
//! - **Shared work**: filters memoize per (slot, row); derived columns
//!   evaluate at most once per (slot, row).
//! - **Per-slot isolation**: every mutable per-node state is indexed by the
//!   processing slot, the engine's single sharding discipline.
//! - **Deterministic merges**: order-independent actions give identical
//!   results for any slot count; `Take` concatenates in slot-id order.

pub mod columns;
mod dispatch;
mod engine;
mod frame;
mod node;
pub mod ops;
mod report;
mod result;
mod slot;

// Re-export commonly used types
pub use columns::{FrameValue, RowArgs, RowCtx, RowFn, SlotFn};
pub use frame::{EventFrame, FrameNode};
pub use ops::{Sample, ScalarSample};
pub use report::{CutflowReport, FilterStats};
pub use result::{ResultHandle, ResultRef};
