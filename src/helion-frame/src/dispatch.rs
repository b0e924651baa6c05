//! Booking-time element-type resolution.
//!
//! When the user omits the element type of an action's input column, the
//! dispatcher resolves it against input metadata: the recorded output type
//! for a derived column, the table schema for a physical one. The closed
//! set of inferable tags (`Int8`, `Int32`, `Float64`, `Array<Float64>`,
//! `Array<Float32>`) is part of the external contract; anything else fails
//! with `CannotInferType` at booking, never at run time.

use common_error::{HelionError, HelionResult};
use helion_core::ElementType;

use crate::engine::EngineCore;

pub(crate) fn resolve_type(
    engine: &EngineCore,
    visible_defines: &[String],
    column: &str,
) -> HelionResult<ElementType> {
    if visible_defines.iter().any(|name| name == column) {
        let node = engine.define_by_name(column).ok_or_else(|| {
            HelionError::internal(format!("derived column '{column}' is not booked"))
        })?;
        let ty = node.output_type().ok_or_else(|| {
            HelionError::cannot_infer(format!(
                "derived column '{column}' has a record type; specify the element type explicitly"
            ))
        })?;
        check_inferable(column, ty)
    } else if let Some(ty) = engine.table().schema().element_type(column) {
        check_inferable(column, ty)
    } else {
        Err(HelionError::column_not_found(format!(
            "column '{column}' is neither a derived column nor part of table '{}'",
            engine.table().name()
        )))
    }
}

fn check_inferable(column: &str, ty: ElementType) -> HelionResult<ElementType> {
    if ty.is_inferable() {
        Ok(ty)
    } else {
        Err(HelionError::cannot_infer(format!(
            "column '{column}' has type {ty}, which is outside the inferable set; \
             specify the element type explicitly"
        )))
    }
}
