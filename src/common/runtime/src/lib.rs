//! Async runtime utilities for Helion.
//!
//! The event loop itself is synchronous; the async runtime is only used at
//! the storage boundary (opening tables, listing catalogs).

use std::future::Future;

use common_error::{HelionError, HelionResult};
use tokio::runtime::Runtime;

/// Get or create a Tokio runtime for blocking operations.
pub fn get_runtime() -> HelionResult<Runtime> {
    Runtime::new().map_err(|e| HelionError::InternalError(format!("Failed to create runtime: {e}")))
}

/// Block on a future using the default runtime.
pub fn block_on<F: Future>(future: F) -> HelionResult<F::Output> {
    let runtime = get_runtime()?;
    Ok(runtime.block_on(future))
}

/// Spawn a task on the current runtime.
pub fn spawn<F>(future: F) -> tokio::task::JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::spawn(future)
}
