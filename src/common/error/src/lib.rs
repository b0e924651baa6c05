//! Error types and result aliases for Helion.
//!
//! This module provides the core error handling infrastructure shared by
//! every crate in the workspace: a single recoverable error channel.

mod error;

pub use error::{GenericError, HelionError, HelionResult};
