//! One-dimensional histogram.

use serde::{Deserialize, Serialize};

use common_error::{HelionError, HelionResult};

use crate::axis::{Axis, BinLocation};
use crate::Histogram;

/// One-dimensional histogram with uniform binning and under/overflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hist1D {
    axis: Axis,
    sumw: Vec<f64>,
    underflow: f64,
    overflow: f64,
    entries: u64,
}

impl Hist1D {
    /// Create a histogram with `nbins` bins over `[low, high)`.
    ///
    /// Passing `low == high` leaves the axis limits unset; such a model is
    /// only usable through the engine's deferred-limits protocol.
    pub fn new(nbins: usize, low: f64, high: f64) -> Self {
        Self::with_axis(Axis::new(nbins, low, high))
    }

    /// Create a histogram over an existing axis.
    pub fn with_axis(axis: Axis) -> Self {
        let nbins = axis.nbins();
        Self {
            axis,
            sumw: vec![0.0; nbins],
            underflow: 0.0,
            overflow: 0.0,
            entries: 0,
        }
    }

    /// The x axis.
    pub fn axis(&self) -> &Axis {
        &self.axis
    }

    /// Fill with unit weight.
    pub fn fill(&mut self, x: f64) {
        self.fill_weighted(x, 1.0);
    }

    /// Fill with an explicit weight.
    pub fn fill_weighted(&mut self, x: f64, w: f64) {
        self.entries += 1;
        match self.axis.locate(x) {
            BinLocation::Underflow => self.underflow += w,
            BinLocation::Bin(i) => self.sumw[i] += w,
            BinLocation::Overflow => self.overflow += w,
        }
    }

    /// Sum of weights in a bin.
    pub fn value(&self, bin: usize) -> f64 {
        self.sumw[bin]
    }

    /// Sum of weights below the lower edge.
    pub fn underflow(&self) -> f64 {
        self.underflow
    }

    /// Sum of weights above the upper edge.
    pub fn overflow(&self) -> f64 {
        self.overflow
    }

    /// Number of fill calls.
    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// Sum of in-range weights.
    pub fn sum(&self) -> f64 {
        self.sumw.iter().sum()
    }

    /// In-range bin contents, in bin order.
    pub fn values(&self) -> &[f64] {
        &self.sumw
    }
}

impl Histogram for Hist1D {
    fn clone_empty(&self) -> Self {
        Self::with_axis(self.axis.clone())
    }

    fn merge(&mut self, other: &Self) -> HelionResult<()> {
        if self.axis != other.axis {
            return Err(HelionError::value_error(
                "cannot merge histograms with different binning",
            ));
        }
        for (dst, src) in self.sumw.iter_mut().zip(&other.sumw) {
            *dst += src;
        }
        self.underflow += other.underflow;
        self.overflow += other.overflow;
        self.entries += other.entries;
        Ok(())
    }

    fn has_axis_limits(&self) -> bool {
        self.axis.has_limits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_and_edges() {
        let mut h = Hist1D::new(4, 0.0, 8.0);
        for x in [0.0, 2.0, 4.0, 6.0] {
            h.fill(x);
        }
        assert_eq!(h.values(), &[1.0, 1.0, 1.0, 1.0]);
        assert_eq!(h.entries(), 4);

        h.fill(8.0); // upper edge goes to the last bin
        assert_eq!(h.value(3), 2.0);
        h.fill(-1.0);
        h.fill(9.0);
        assert_eq!(h.underflow(), 1.0);
        assert_eq!(h.overflow(), 1.0);
    }

    #[test]
    fn test_weighted_fill() {
        let mut h = Hist1D::new(2, 0.0, 2.0);
        h.fill_weighted(0.5, 2.5);
        h.fill_weighted(1.5, 0.5);
        assert_eq!(h.value(0), 2.5);
        assert_eq!(h.value(1), 0.5);
        assert_eq!(h.sum(), 3.0);
    }

    #[test]
    fn test_merge() {
        let mut a = Hist1D::new(2, 0.0, 2.0);
        let mut b = a.clone_empty();
        a.fill(0.5);
        b.fill(0.5);
        b.fill(1.5);
        a.merge(&b).unwrap();
        assert_eq!(a.value(0), 2.0);
        assert_eq!(a.value(1), 1.0);
        assert_eq!(a.entries(), 3);
    }

    #[test]
    fn test_merge_binning_mismatch() {
        let mut a = Hist1D::new(2, 0.0, 2.0);
        let b = Hist1D::new(3, 0.0, 2.0);
        assert!(a.merge(&b).is_err());
    }

    #[test]
    fn test_axis_limits_flag() {
        assert!(Hist1D::new(8, 0.0, 1.0).has_axis_limits());
        assert!(!Hist1D::new(8, 0.0, 0.0).has_axis_limits());
    }
}
