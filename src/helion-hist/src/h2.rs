//! Two-dimensional histogram.

use serde::{Deserialize, Serialize};

use common_error::{HelionError, HelionResult};

use crate::axis::{Axis, BinLocation};
use crate::Histogram;

/// Two-dimensional histogram with uniform binning.
///
/// Fills landing outside either axis are accumulated in a single
/// out-of-range bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hist2D {
    x_axis: Axis,
    y_axis: Axis,
    sumw: Vec<f64>,
    out_of_range: f64,
    entries: u64,
}

impl Hist2D {
    /// Create a histogram with the given binning on both axes.
    pub fn new(nx: usize, xlow: f64, xhigh: f64, ny: usize, ylow: f64, yhigh: f64) -> Self {
        Self::with_axes(Axis::new(nx, xlow, xhigh), Axis::new(ny, ylow, yhigh))
    }

    /// Create a histogram over existing axes.
    pub fn with_axes(x_axis: Axis, y_axis: Axis) -> Self {
        let nbins = x_axis.nbins() * y_axis.nbins();
        Self {
            x_axis,
            y_axis,
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

    /// Fill with unit weight.
    pub fn fill(&mut self, x: f64, y: f64) {
        self.fill_weighted(x, y, 1.0);
    }

    /// Fill with an explicit weight.
    pub fn fill_weighted(&mut self, x: f64, y: f64, w: f64) {
        self.entries += 1;
        match (self.x_axis.locate(x), self.y_axis.locate(y)) {
            (BinLocation::Bin(ix), BinLocation::Bin(iy)) => {
                self.sumw[iy * self.x_axis.nbins() + ix] += w;
            }
            _ => self.out_of_range += w,
        }
    }

    /// Sum of weights in bin `(ix, iy)`.
    pub fn value(&self, ix: usize, iy: usize) -> f64 {
        self.sumw[iy * self.x_axis.nbins() + ix]
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

impl Histogram for Hist2D {
    fn clone_empty(&self) -> Self {
        Self::with_axes(self.x_axis.clone(), self.y_axis.clone())
    }

    fn merge(&mut self, other: &Self) -> HelionResult<()> {
        if self.x_axis != other.x_axis || self.y_axis != other.y_axis {
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
        self.x_axis.has_limits() && self.y_axis.has_limits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_2d() {
        let mut h = Hist2D::new(2, 0.0, 2.0, 2, 0.0, 2.0);
        h.fill(0.5, 0.5);
        h.fill(1.5, 0.5);
        h.fill(1.5, 1.5);
        assert_eq!(h.value(0, 0), 1.0);
        assert_eq!(h.value(1, 0), 1.0);
        assert_eq!(h.value(1, 1), 1.0);
        assert_eq!(h.value(0, 1), 0.0);
        assert_eq!(h.entries(), 3);
    }

    #[test]
    fn test_out_of_range() {
        let mut h = Hist2D::new(2, 0.0, 2.0, 2, 0.0, 2.0);
        h.fill(-1.0, 0.5);
        h.fill(0.5, 3.0);
        assert_eq!(h.out_of_range(), 2.0);
        assert_eq!(h.sum(), 0.0);
    }

    #[test]
    fn test_merge_2d() {
        let mut a = Hist2D::new(2, 0.0, 2.0, 2, 0.0, 2.0);
        let mut b = a.clone_empty();
        a.fill_weighted(0.5, 0.5, 2.0);
        b.fill_weighted(0.5, 0.5, 3.0);
        a.merge(&b).unwrap();
        assert_eq!(a.value(0, 0), 5.0);
    }

    #[test]
    fn test_axis_limits_flag() {
        assert!(Hist2D::new(2, 0.0, 1.0, 2, 0.0, 1.0).has_axis_limits());
        assert!(!Hist2D::new(2, 0.0, 0.0, 2, 0.0, 1.0).has_axis_limits());
    }
}
