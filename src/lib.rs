//! Helion - deferred, single-pass analysis engine for columnar event data
//!
//! Helion lets you compose a dataflow graph over a logical event table -
//! filters, derived columns and terminal actions - and evaluates the whole
//! graph in a single pass over the input the first time any result is
//! dereferenced.

#![forbid(unsafe_code)]
#![allow(clippy::module_name_repetitions)]

// Re-export core crates
pub use common_config as config;
pub use common_error as error;
pub use helion_core as core;
pub use helion_frame as frame;
pub use helion_hist as hist;
pub use helion_storage as storage;

/// Helion version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
