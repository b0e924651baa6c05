//! Aggregation operations: per-slot partials and their merge rules.
//!
//! Every lazy action pairs a callable (invoked per accepted row) with one
//! of these operations. During the event loop the operation accumulates
//! into slot-indexed partials; after the loop `finalize` merges the
//! partials into the shared, user-visible aggregate on a single thread.

#![allow(clippy::cast_lossless)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::unnecessary_cast)]

use std::sync::{Arc, Mutex, PoisonError};

use common_error::HelionResult;
use helion_core::ArrayView;
use helion_hist::{Hist1D, Histogram};

use crate::columns::FrameValue;
use crate::slot::SlotVec;

/// Values usable as samples by min/max/mean and histogram actions.
///
/// Scalars contribute one sample; array values contribute one sample per
/// element.
pub trait Sample: FrameValue {
    /// Visit every sample as `f64`.
    #[doc(hidden)]
    fn each_sample(&self, f: &mut dyn FnMut(f64));
}

macro_rules! impl_scalar_sample {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Sample for $ty {
                fn each_sample(&self, f: &mut dyn FnMut(f64)) {
                    f(*self as f64);
                }
            }

            impl ScalarSample for $ty {
                fn as_f64(&self) -> f64 {
                    *self as f64
                }
            }
        )*
    };
}

impl_scalar_sample!(i8, u8, i32, i64, f32, f64);

impl Sample for ArrayView<f64> {
    fn each_sample(&self, f: &mut dyn FnMut(f64)) {
        for &x in self.as_slice() {
            f(x);
        }
    }
}

impl Sample for ArrayView<f32> {
    fn each_sample(&self, f: &mut dyn FnMut(f64)) {
        for &x in self.as_slice() {
            f(f64::from(x));
        }
    }
}

/// Samples that are single scalars, usable as weights and as 2D/3D
/// histogram coordinates.
pub trait ScalarSample: Sample {
    /// The sample as `f64`.
    #[doc(hidden)]
    fn as_f64(&self) -> f64;
}

fn store<T>(result: &Mutex<T>, value: T) {
    *result.lock().unwrap_or_else(PoisonError::into_inner) = value;
}

// ============================================================================
// Count
// ============================================================================

/// Per-slot row counters, merged by summation.
pub(crate) struct CountOp {
    partials: SlotVec<u64>,
    result: Arc<Mutex<u64>>,
}

impl CountOp {
    pub fn new(result: Arc<Mutex<u64>>) -> Self {
        Self {
            partials: SlotVec::new(),
            result,
        }
    }

    pub fn init(&self, n_slots: usize) -> HelionResult<()> {
        self.partials.init(n_slots, || 0)
    }

    pub fn exec(&self, slot: usize) -> HelionResult<()> {
        self.partials.with(slot, |count| *count += 1)
    }

    pub fn finalize(&self) -> HelionResult<()> {
        store(&self.result, self.partials.drain().into_iter().sum());
        Ok(())
    }

    pub fn release(&self) {
        self.partials.clear();
    }
}

// ============================================================================
// Reduce
// ============================================================================

/// Per-slot reduction partials, each seeded with the init value and folded
/// with the user callable at merge time. The callable is assumed
/// associative.
pub(crate) struct ReduceOp<T, F> {
    f: F,
    init: T,
    partials: SlotVec<T>,
    result: Arc<Mutex<T>>,
}

impl<T, F> ReduceOp<T, F>
where
    T: Clone + Send + 'static,
    F: Fn(T, T) -> T + Send + Sync + 'static,
{
    pub fn new(f: F, init: T, result: Arc<Mutex<T>>) -> Self {
        Self {
            f,
            init,
            partials: SlotVec::new(),
            result,
        }
    }

    pub fn init(&self, n_slots: usize) -> HelionResult<()> {
        let seed = self.init.clone();
        self.partials.init(n_slots, move || seed.clone())
    }

    pub fn exec(&self, slot: usize, value: T) -> HelionResult<()> {
        self.partials.with(slot, |partial| {
            let current = std::mem::replace(partial, self.init.clone());
            *partial = (self.f)(current, value);
        })
    }

    pub fn finalize(&self) -> HelionResult<()> {
        let mut partials = self.partials.drain().into_iter();
        let mut acc = partials.next().unwrap_or_else(|| self.init.clone());
        for partial in partials {
            acc = (self.f)(acc, partial);
        }
        store(&self.result, acc);
        Ok(())
    }

    pub fn release(&self) {
        self.partials.clear();
    }
}

// ============================================================================
// Take
// ============================================================================

/// Per-slot collected values, concatenated in slot-id order at merge time.
/// Within a slot the order is ascending row index.
pub(crate) struct TakeOp<T, C> {
    partials: SlotVec<C>,
    result: Arc<Mutex<C>>,
    _value: std::marker::PhantomData<fn() -> T>,
}

impl<T, C> TakeOp<T, C>
where
    T: Send + 'static,
    C: Default + Extend<T> + IntoIterator<Item = T> + Send + 'static,
{
    pub fn new(result: Arc<Mutex<C>>) -> Self {
        Self {
            partials: SlotVec::new(),
            result,
            _value: std::marker::PhantomData,
        }
    }

    pub fn init(&self, n_slots: usize) -> HelionResult<()> {
        self.partials.init(n_slots, C::default)
    }

    pub fn exec(&self, slot: usize, value: T) -> HelionResult<()> {
        self.partials
            .with(slot, |collection| collection.extend(std::iter::once(value)))
    }

    pub fn finalize(&self) -> HelionResult<()> {
        let mut merged = C::default();
        for partial in self.partials.drain() {
            merged.extend(partial);
        }
        store(&self.result, merged);
        Ok(())
    }

    pub fn release(&self) {
        self.partials.clear();
    }
}

// ============================================================================
// Min / Max / Mean
// ============================================================================

/// Running minimum per slot. The empty-input value is the seed, `+inf`.
pub(crate) struct MinOp {
    partials: SlotVec<f64>,
    result: Arc<Mutex<f64>>,
}

impl MinOp {
    pub fn new(result: Arc<Mutex<f64>>) -> Self {
        Self {
            partials: SlotVec::new(),
            result,
        }
    }

    pub fn init(&self, n_slots: usize) -> HelionResult<()> {
        self.partials.init(n_slots, || f64::INFINITY)
    }

    pub fn exec<T: Sample>(&self, slot: usize, value: &T) -> HelionResult<()> {
        self.partials.with(slot, |partial| {
            value.each_sample(&mut |x| {
                if x < *partial {
                    *partial = x;
                }
            });
        })
    }

    pub fn finalize(&self) -> HelionResult<()> {
        let min = self
            .partials
            .drain()
            .into_iter()
            .fold(f64::INFINITY, f64::min);
        store(&self.result, min);
        Ok(())
    }

    pub fn release(&self) {
        self.partials.clear();
    }
}

/// Running maximum per slot. The empty-input value is the seed, `-inf`.
pub(crate) struct MaxOp {
    partials: SlotVec<f64>,
    result: Arc<Mutex<f64>>,
}

impl MaxOp {
    pub fn new(result: Arc<Mutex<f64>>) -> Self {
        Self {
            partials: SlotVec::new(),
            result,
        }
    }

    pub fn init(&self, n_slots: usize) -> HelionResult<()> {
        self.partials.init(n_slots, || f64::NEG_INFINITY)
    }

    pub fn exec<T: Sample>(&self, slot: usize, value: &T) -> HelionResult<()> {
        self.partials.with(slot, |partial| {
            value.each_sample(&mut |x| {
                if x > *partial {
                    *partial = x;
                }
            });
        })
    }

    pub fn finalize(&self) -> HelionResult<()> {
        let max = self
            .partials
            .drain()
            .into_iter()
            .fold(f64::NEG_INFINITY, f64::max);
        store(&self.result, max);
        Ok(())
    }

    pub fn release(&self) {
        self.partials.clear();
    }
}

/// Per-slot (sum, count) pairs; the mean of an empty input is `0.0`.
pub(crate) struct MeanOp {
    partials: SlotVec<(f64, u64)>,
    result: Arc<Mutex<f64>>,
}

impl MeanOp {
    pub fn new(result: Arc<Mutex<f64>>) -> Self {
        Self {
            partials: SlotVec::new(),
            result,
        }
    }

    pub fn init(&self, n_slots: usize) -> HelionResult<()> {
        self.partials.init(n_slots, || (0.0, 0))
    }

    pub fn exec<T: Sample>(&self, slot: usize, value: &T) -> HelionResult<()> {
        self.partials.with(slot, |(sum, count)| {
            value.each_sample(&mut |x| {
                *sum += x;
                *count += 1;
            });
        })
    }

    pub fn finalize(&self) -> HelionResult<()> {
        let (sum, count) = self
            .partials
            .drain()
            .into_iter()
            .fold((0.0, 0u64), |(s, c), (ps, pc)| (s + ps, c + pc));
        let mean = if count == 0 { 0.0 } else { sum / count as f64 };
        store(&self.result, mean);
        Ok(())
    }

    pub fn release(&self) {
        self.partials.clear();
    }
}

// ============================================================================
// Histogram fills
// ============================================================================

/// Per-slot histogram clones, merged bin-wise. Used whenever the model has
/// explicit axis limits.
pub(crate) struct FillClonesOp<H: Histogram> {
    model: H,
    partials: SlotVec<H>,
    result: Arc<Mutex<H>>,
}

impl<H: Histogram> FillClonesOp<H> {
    pub fn new(model: H, result: Arc<Mutex<H>>) -> Self {
        Self {
            model,
            partials: SlotVec::new(),
            result,
        }
    }

    pub fn init(&self, n_slots: usize) -> HelionResult<()> {
        self.partials.init(n_slots, || self.model.clone_empty())
    }

    pub fn exec(&self, slot: usize, fill: impl FnOnce(&mut H)) -> HelionResult<()> {
        self.partials.with(slot, fill)
    }

    pub fn finalize(&self) -> HelionResult<()> {
        let mut merged = self.model.clone_empty();
        for partial in self.partials.drain() {
            merged.merge(&partial)?;
        }
        store(&self.result, merged);
        Ok(())
    }

    pub fn release(&self) {
        self.partials.clear();
    }
}

/// Deferred-limits fill for 1D histograms with unset axis limits.
///
/// Values and weights are buffered per slot during the pass; at merge time
/// the union extrema select the axis range and a single histogram is filled
/// in slot-id order. This trades memory for one-shot axis selection.
pub(crate) struct FillOp {
    nbins: usize,
    partials: SlotVec<Vec<(f64, f64)>>,
    result: Arc<Mutex<Hist1D>>,
}

impl FillOp {
    pub fn new(nbins: usize, result: Arc<Mutex<Hist1D>>) -> Self {
        Self {
            nbins,
            partials: SlotVec::new(),
            result,
        }
    }

    pub fn init(&self, n_slots: usize) -> HelionResult<()> {
        self.partials.init(n_slots, Vec::new)
    }

    pub fn exec<T: Sample>(&self, slot: usize, value: &T, weight: f64) -> HelionResult<()> {
        self.partials.with(slot, |buffer| {
            value.each_sample(&mut |x| buffer.push((x, weight)));
        })
    }

    pub fn finalize(&self) -> HelionResult<()> {
        let buffers = self.partials.drain();

        let mut low = f64::INFINITY;
        let mut high = f64::NEG_INFINITY;
        for buffer in &buffers {
            for &(x, _) in buffer {
                low = low.min(x);
                high = high.max(x);
            }
        }

        let hist = if low > high {
            // No samples reached the action; publish an empty histogram on
            // the unset axis.
            Hist1D::new(self.nbins, 0.0, 0.0)
        } else {
            let (low, high) = if low == high {
                (low - 0.5, high + 0.5)
            } else {
                (low, high)
            };
            let mut hist = Hist1D::new(self.nbins, low, high);
            for buffer in buffers {
                for (x, w) in buffer {
                    hist.fill_weighted(x, w);
                }
            }
            hist
        };

        store(&self.result, hist);
        Ok(())
    }

    pub fn release(&self) {
        self.partials.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_merge() {
        let result = Arc::new(Mutex::new(0u64));
        let op = CountOp::new(Arc::clone(&result));
        op.init(2).unwrap();
        op.exec(0).unwrap();
        op.exec(1).unwrap();
        op.exec(1).unwrap();
        op.finalize().unwrap();
        assert_eq!(*result.lock().unwrap(), 3);
    }

    #[test]
    fn test_reduce_fold_across_slots() {
        let result = Arc::new(Mutex::new(0.0_f64));
        let op = ReduceOp::new(|a: f64, b: f64| a + b, 0.0, Arc::clone(&result));
        op.init(3).unwrap();
        op.exec(0, 1.5).unwrap();
        op.exec(1, 2.5).unwrap();
        op.exec(2, 4.0).unwrap();
        op.finalize().unwrap();
        assert_eq!(*result.lock().unwrap(), 8.0);
    }

    #[test]
    fn test_min_empty_input_is_seed() {
        let result = Arc::new(Mutex::new(0.0_f64));
        let op = MinOp::new(Arc::clone(&result));
        op.init(2).unwrap();
        op.finalize().unwrap();
        assert_eq!(*result.lock().unwrap(), f64::INFINITY);
    }

    #[test]
    fn test_mean_with_array_samples() {
        let result = Arc::new(Mutex::new(0.0_f64));
        let op = MeanOp::new(Arc::clone(&result));
        op.init(1).unwrap();
        let view: ArrayView<f64> = vec![1.0, 2.0, 3.0].into();
        op.exec(0, &view).unwrap();
        op.finalize().unwrap();
        assert_eq!(*result.lock().unwrap(), 2.0);
    }

    #[test]
    fn test_take_slot_order() {
        let result = Arc::new(Mutex::new(Vec::<i32>::new()));
        let op: TakeOp<i32, Vec<i32>> = TakeOp::new(Arc::clone(&result));
        op.init(2).unwrap();
        op.exec(1, 30).unwrap();
        op.exec(0, 10).unwrap();
        op.exec(0, 20).unwrap();
        op.finalize().unwrap();
        assert_eq!(*result.lock().unwrap(), vec![10, 20, 30]);
    }

    #[test]
    fn test_deferred_fill_derives_limits() {
        let result = Arc::new(Mutex::new(Hist1D::new(4, 0.0, 0.0)));
        let op = FillOp::new(4, Arc::clone(&result));
        op.init(1).unwrap();
        for x in [0.0, 1.0, 2.0, 4.0] {
            op.exec(0, &x, 1.0).unwrap();
        }
        op.finalize().unwrap();

        let hist = result.lock().unwrap();
        assert!(hist.has_axis_limits());
        assert_eq!(hist.axis().low(), 0.0);
        assert_eq!(hist.axis().high(), 4.0);
        assert_eq!(hist.entries(), 4);
        assert_eq!(hist.underflow() + hist.overflow(), 0.0);
    }

    #[test]
    fn test_clone_fill_merge() {
        let model = Hist1D::new(2, 0.0, 2.0);
        let result = Arc::new(Mutex::new(model.clone()));
        let op = FillClonesOp::new(model, Arc::clone(&result));
        op.init(2).unwrap();
        op.exec(0, |h| h.fill(0.5)).unwrap();
        op.exec(1, |h| h.fill(0.5)).unwrap();
        op.exec(1, |h| h.fill(1.5)).unwrap();
        op.finalize().unwrap();

        let hist = result.lock().unwrap();
        assert_eq!(hist.value(0), 2.0);
        assert_eq!(hist.value(1), 1.0);
    }
}
