//! Element type definitions for Helion columns.

use serde::{Deserialize, Serialize};

/// Element type of one row's value for a column.
///
/// Scalars cover the primitive integer/floating variants plus boolean and
/// byte; array tags describe array-of-primitive columns whose rows surface
/// as bounded views over contiguous elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementType {
    /// Boolean scalar.
    Bool,
    /// 8-bit signed integer scalar.
    Int8,
    /// 8-bit unsigned integer scalar (byte).
    UInt8,
    /// 32-bit signed integer scalar.
    Int32,
    /// 64-bit signed integer scalar.
    Int64,
    /// 32-bit floating point scalar.
    Float32,
    /// 64-bit floating point scalar.
    Float64,
    /// Array of 32-bit floats.
    ArrayFloat32,
    /// Array of 64-bit floats.
    ArrayFloat64,
}

impl ElementType {
    /// Check if this type is a numeric scalar.
    pub const fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::Int8 | Self::UInt8 | Self::Int32 | Self::Int64 | Self::Float32 | Self::Float64
        )
    }

    /// Check if this type is array-valued.
    pub const fn is_array(&self) -> bool {
        matches!(self, Self::ArrayFloat32 | Self::ArrayFloat64)
    }

    /// Check if this tag belongs to the closed set the runtime dispatcher
    /// may infer for an untyped action booking.
    ///
    /// The set is part of the external contract: `Int8`, `Int32`,
    /// `Float64`, `ArrayFloat64`, `ArrayFloat32`.
    pub const fn is_inferable(&self) -> bool {
        matches!(
            self,
            Self::Int8 | Self::Int32 | Self::Float64 | Self::ArrayFloat64 | Self::ArrayFloat32
        )
    }

    /// Get the display name for this type.
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Bool => "Bool",
            Self::Int8 => "Int8",
            Self::UInt8 => "UInt8",
            Self::Int32 => "Int32",
            Self::Int64 => "Int64",
            Self::Float32 => "Float32",
            Self::Float64 => "Float64",
            Self::ArrayFloat32 => "Array<Float32>",
            Self::ArrayFloat64 => "Array<Float64>",
        }
    }
}

impl std::fmt::Display for ElementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
