//! Histogram aggregates for the Helion analysis engine.
//!
//! Histograms are the opaque aggregates consumed by the engine's histogram
//! actions: they expose fill entry points, an empty-but-configured clone,
//! and in-place bin-wise merging. One-, two- and three-dimensional variants
//! share the same uniform-binning [`Axis`].

pub mod axis;
mod h1;
mod h2;
mod h3;

pub use axis::{Axis, BinLocation};
pub use h1::Hist1D;
pub use h2::Hist2D;
pub use h3::Hist3D;

use common_error::HelionResult;

/// Interface the engine's histogram actions rely on.
///
/// Per-slot copies are produced with [`Histogram::clone_empty`] and combined
/// bin-wise with [`Histogram::merge`] after the event loop.
pub trait Histogram: Clone + Send + Sync + 'static {
    /// An independent copy with the same binning and zeroed contents.
    fn clone_empty(&self) -> Self;

    /// Merge another instance in place, bin by bin.
    ///
    /// Fails with `ValueError` if the binning differs.
    fn merge(&mut self, other: &Self) -> HelionResult<()>;

    /// Whether every axis has explicit limits.
    fn has_axis_limits(&self) -> bool;
}
