//! Configuration management for Helion.
//!
//! Provides runtime configuration for the execution engine and storage.
//! The execution parallelism recorded here is the process-wide concurrency
//! hint: a frame consults it exactly once, at construction, and the slot
//! count stays fixed for the life of the engine.

use serde::{Deserialize, Serialize};

/// Global Helion configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HelionConfig {
    /// Execution configuration.
    pub execution: ExecutionConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
}

/// Execution engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Number of parallel processing slots for the event loop.
    ///
    /// `None` selects serial execution (one slot). Use
    /// [`ExecutionConfig::multi_threaded`] to pick up the runtime's
    /// concurrency hint instead.
    pub parallelism: Option<usize>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self { parallelism: None }
    }
}

impl ExecutionConfig {
    /// Serial execution: a single processing slot.
    pub fn serial() -> Self {
        Self { parallelism: None }
    }

    /// Parallel execution with an explicit slot count.
    pub fn with_parallelism(n: usize) -> Self {
        Self {
            parallelism: Some(n.max(1)),
        }
    }

    /// Parallel execution sized by the runtime's concurrency hint.
    pub fn multi_threaded() -> Self {
        let hint = std::thread::available_parallelism()
            .map(std::num::NonZeroUsize::get)
            .unwrap_or(1);
        Self {
            parallelism: Some(hint),
        }
    }

    /// The number of slots this configuration resolves to.
    pub fn effective_parallelism(&self) -> usize {
        self.parallelism.unwrap_or(1).max(1)
    }
}

/// Storage layer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Base path for data storage.
    pub base_path: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { base_path: None }
    }
}
