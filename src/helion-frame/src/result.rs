//! Lazy result handles.

use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use common_error::{HelionError, HelionResult};

use crate::engine::EngineCore;

/// A lazy handle to the result of a booked action.
///
/// The handle binds a user-visible aggregate to the frame's computation
/// graph: the first dereference triggers the event loop, which executes
/// every scheduled action in a single pass and then publishes all results.
///
/// ```ignore
/// let count = frame.filter(|x: i32| x > 2, &["x"])?.count()?;
/// assert_eq!(*count.get()?, 3); // runs the event loop here
/// ```
pub struct ResultHandle<T> {
    ready: Arc<AtomicBool>,
    value: Arc<Mutex<T>>,
    engine: Weak<EngineCore>,
}

impl<T> ResultHandle<T> {
    pub(crate) fn new(
        ready: Arc<AtomicBool>,
        value: Arc<Mutex<T>>,
        engine: Weak<EngineCore>,
    ) -> Self {
        Self {
            ready,
            value,
            engine,
        }
    }

    /// Borrow the aggregate, running the event loop first if no run has
    /// published it yet.
    ///
    /// Fails with `EngineGone` if the owning frame was dropped before the
    /// first run, or propagates any error of the run itself.
    pub fn get(&self) -> HelionResult<ResultRef<'_, T>> {
        if !self.ready.load(Ordering::Acquire) {
            let engine = self
                .engine
                .upgrade()
                .ok_or_else(HelionError::engine_gone)?;
            engine.run()?;
        }
        Ok(ResultRef {
            guard: self.value.lock().unwrap_or_else(PoisonError::into_inner),
        })
    }

    /// Clone the aggregate out of the handle, triggering the run if needed.
    pub fn cloned(&self) -> HelionResult<T>
    where
        T: Clone,
    {
        let value = self.get()?;
        Ok(value.clone())
    }

    /// Whether a run has already published this result.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }
}

/// Borrow of a published aggregate.
pub struct ResultRef<'a, T> {
    guard: MutexGuard<'a, T>,
}

impl<T> Deref for ResultRef<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for ResultRef<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.guard.fmt(f)
    }
}

impl<T> std::fmt::Debug for ResultHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultHandle")
            .field("ready", &self.ready.load(Ordering::Acquire))
            .finish()
    }
}
