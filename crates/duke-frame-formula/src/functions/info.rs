//! Missing-value functions

use duke_frame_core::Value;

use super::operand_refs;
use crate::error::FormulaResult;
use crate::evaluator::EvaluationContext;
use crate::operand::{map_binary, map_nary, map_unary, Operand};

/// ISNULL(value) - True for null, NaN and blank text
pub fn fn_isnull<'t>(args: &[Operand<'t>], ctx: &EvaluationContext<'_>) -> FormulaResult<Operand<'t>> {
    map_unary(&args[0], "ISNULL", ctx.row_count(), |value| {
        Ok(Value::Boolean(value.is_blank()))
    })
}

/// COALESCE(value, ...) - First non-blank argument per row
pub fn fn_coalesce<'t>(args: &[Operand<'t>], ctx: &EvaluationContext<'_>) -> FormulaResult<Operand<'t>> {
    map_nary(&operand_refs(args), "COALESCE", ctx.row_count(), |row| {
        Ok(row
            .iter()
            .find(|v| !v.is_blank())
            .map_or(Value::Null, |v| (*v).clone()))
    })
}

/// FILLBLANK(value, fill) - Replaces blank cells with `fill`
pub fn fn_fillblank<'t>(args: &[Operand<'t>], ctx: &EvaluationContext<'_>) -> FormulaResult<Operand<'t>> {
    map_binary(&args[0], &args[1], "FILLBLANK", ctx.row_count(), |value, fill| {
        Ok(if value.is_blank() { fill.clone() } else { value.clone() })
    })
}
