//! Three-dimensional histogram.

use serde::{Deserialize, Serialize};

use common_error::{HelionError, HelionResult};

use crate::axis::{Axis, BinLocation};
use crate::Histogram;

/// Three-dimensional histogram with uniform binning.
///
/// Fills landing outside any axis are accumulated in a single out-of-range
/// bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hist3D {
    x_axis: Axis,
    y_axis: Axis,
    z_axis: Axis,
    sumw: Vec<f64>,
    out_of_range: f64,
    entries: u64,
}

impl Hist3D {
    /// Create a histogram with the given binning on all three axes.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        nx: usize,
        xlow: f64,
        xhigh: f64,
        ny: usize,
        ylow: f64,
        yhigh: f64,
        nz: usize,
        zlow: f64,
        zhigh: f64,
    ) -> Self {
        Self::with_axes(
            Axis::new(nx, xlow, xhigh),
            Axis::new(ny, ylow, yhigh),
            Axis::new(nz, zlow, zhigh),
        )
    }

    /// Create a histogram over existing axes.
    pub fn with_axes(x_axis: Axis, y_axis: Axis, z_axis: Axis) -> Self {
        let nbins = x_axis.nbins() * y_axis.nbins() * z_axis.nbins();
        Self {
            x_axis,
            y_axis,
            z_axis,
            sumw: vec![0.0; nbins],
            out_of_range: 0.0,
            entries: 0,
        }
    }

    /// The x axis.
    pub fn x_axis(&self) -> &Axis {
        &self.x_axis
    }

    /// The y axis.
    pub fn y_axis(&self) -> &Axis {
        &self.y_axis
    }

    /// The z axis.
    pub fn z_axis(&self) -> &Axis {
        &self.z_axis
    }

    /// Fill with unit weight.
    pub fn fill(&mut self, x: f64, y: f64, z: f64) {
        self.fill_weighted(x, y, z, 1.0);
    }

    /// Fill with an explicit weight.
    pub fn fill_weighted(&mut self, x: f64, y: f64, z: f64, w: f64) {
        self.entries += 1;
        match (
            self.x_axis.locate(x),
            self.y_axis.locate(y),
            self.z_axis.locate(z),
        ) {
            (BinLocation::Bin(ix), BinLocation::Bin(iy), BinLocation::Bin(iz)) => {
                let nx = self.x_axis.nbins();
                let ny = self.y_axis.nbins();
                self.sumw[(iz * ny + iy) * nx + ix] += w;
            }
            _ => self.out_of_range += w,
        }
    }

    /// Sum of weights in bin `(ix, iy, iz)`.
    pub fn value(&self, ix: usize, iy: usize, iz: usize) -> f64 {
        let nx = self.x_axis.nbins();
        let ny = self.y_axis.nbins();
        self.sumw[(iz * ny + iy) * nx + ix]
    }

    /// Sum of weights outside the axes.
    pub fn out_of_range(&self) -> f64 {
        self.out_of_range
    }

    /// Number of fill calls.
    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// Sum of in-range weights.
    pub fn sum(&self) -> f64 {
        self.sumw.iter().sum()
    }
}

impl Histogram for Hist3D {
    fn clone_empty(&self) -> Self {
        Self::with_axes(
            self.x_axis.clone(),
            self.y_axis.clone(),
            self.z_axis.clone(),
        )
    }

    fn merge(&mut self, other: &Self) -> HelionResult<()> {
        if self.x_axis != other.x_axis
            || self.y_axis != other.y_axis
            || self.z_axis != other.z_axis
        {
            return Err(HelionError::value_error(
                "cannot merge histograms with different binning",
            ));
        }
        for (dst, src) in self.sumw.iter_mut().zip(&other.sumw) {
            *dst += src;
        }
        self.out_of_range += other.out_of_range;
        self.entries += other.entries;
        Ok(())
    }

    fn has_axis_limits(&self) -> bool {
        self.x_axis.has_limits() && self.y_axis.has_limits() && self.z_axis.has_limits()
    }
}
