//! Core error types for Helion.

use thiserror::Error;

/// Result type alias using `HelionError`.
pub type HelionResult<T> = std::result::Result<T, HelionError>;

/// Generic boxed error for external error sources.
pub type GenericError = Box<dyn std::error::Error + Send + Sync>;

/// Core error type for Helion operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HelionError {
    /// Type mismatch or invalid type operation.
    #[error("TypeError: {0}")]
    TypeError(String),

    /// Invalid value provided.
    #[error("ValueError: {0}")]
    ValueError(String),

    /// Schema-related error (unsupported layout, malformed table, etc.).
    #[error("SchemaError: {0}")]
    SchemaError(String),

    /// Column not found among derived columns or the input schema.
    #[error("ColumnNotFound: {0}")]
    ColumnNotFound(String),

    /// Derived column name collides with a physical or derived column.
    #[error("DuplicateColumn: {0}")]
    DuplicateColumn(String),

    /// Default column list is too short for the requested callable arity.
    #[error("InsufficientDefaults: {0}")]
    InsufficientDefaults(String),

    /// Element type of a column could not be inferred from input metadata.
    #[error("CannotInferType: {0}")]
    CannotInferType(String),

    /// Array-valued row whose storage cannot produce a contiguous view.
    #[error("NonContiguousArray: {0}")]
    NonContiguousArray(String),

    /// Event-loop execution error.
    #[error("ExecutionError: {0}")]
    ExecutionError(String),

    /// Storage layer error.
    #[error("StorageError: {0}")]
    StorageError(String),

    /// Named table is not present in the storage catalog.
    #[error("TableNotFound: {0}")]
    TableNotFound(String),

    /// The engine behind a result handle has gone out of scope.
    #[error("EngineGone: {0}")]
    EngineGone(String),

    /// Report requested before the event loop has run.
    #[error("NotYetRun: {0}")]
    NotYetRun(String),

    /// Internal error (bug in Helion).
    #[error("InternalError: {0}")]
    InternalError(String),

    /// IO error.
    #[error("IoError: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("SerdeJsonError: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    /// External error from third-party libraries.
    #[error("ExternalError: {0}")]
    ExternalError(GenericError),
}

impl HelionError {
    /// Create a new `TypeError`.
    pub fn type_error<S: Into<String>>(msg: S) -> Self {
        Self::TypeError(msg.into())
    }

    /// Create a new `ValueError`.
    pub fn value_error<S: Into<String>>(msg: S) -> Self {
        Self::ValueError(msg.into())
    }

    /// Create a new `SchemaError`.
    pub fn schema_error<S: Into<String>>(msg: S) -> Self {
        Self::SchemaError(msg.into())
    }

    /// Create a new `ColumnNotFound` error.
    pub fn column_not_found<S: Into<String>>(msg: S) -> Self {
        Self::ColumnNotFound(msg.into())
    }

    /// Create a new `CannotInferType` error.
    pub fn cannot_infer<S: Into<String>>(msg: S) -> Self {
        Self::CannotInferType(msg.into())
    }

    /// Create a new `ExecutionError`.
    pub fn execution<S: Into<String>>(msg: S) -> Self {
        Self::ExecutionError(msg.into())
    }

    /// Create a new `StorageError`.
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        Self::StorageError(msg.into())
    }

    /// Create a new `InternalError`.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::InternalError(msg.into())
    }

    /// Create an error for a result handle whose engine was dropped.
    pub fn engine_gone() -> Self {
        Self::EngineGone("the owning frame is not reachable: did it go out of scope?".to_string())
    }
}

/// Ensure a condition holds, returning an `ExecutionError` if not.
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $msg:expr) => {
        if !$cond {
            return Err($crate::HelionError::ExecutionError($msg.to_string()));
        }
    };
    ($cond:expr, $variant:ident: $($msg:tt)*) => {
        if !$cond {
            return Err($crate::HelionError::$variant(format!($($msg)*)));
        }
    };
}

/// Return early with a `ValueError`.
#[macro_export]
macro_rules! value_err {
    ($($arg:tt)*) => {
        return Err($crate::HelionError::ValueError(format!($($arg)*)))
    };
}

/// Return early with a `TypeError`.
#[macro_export]
macro_rules! type_err {
    ($($arg:tt)*) => {
        return Err($crate::HelionError::TypeError(format!($($arg)*)))
    };
}
