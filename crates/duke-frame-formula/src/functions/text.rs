//! Text functions

use duke_frame_core::Value;

use super::{operand_refs, scalar_arg, text_arg};
use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::EvaluationContext;
use crate::number::Number;
use crate::operand::{map_nary, map_unary, Operand};

/// Row-wise text function; missing values stay missing
fn text_unary<'t>(
    args: &[Operand<'t>],
    ctx: &EvaluationContext<'_>,
    name: &str,
    f: impl Fn(&str) -> Value,
) -> FormulaResult<Operand<'t>> {
    map_unary(&args[0], name, ctx.row_count(), |value| {
        Ok(match value.as_text() {
            Some(text) => f(&text),
            None => Value::Null,
        })
    })
}

/// LEN(value) - Number of characters
pub fn fn_len<'t>(args: &[Operand<'t>], ctx: &EvaluationContext<'_>) -> FormulaResult<Operand<'t>> {
    text_unary(args, ctx, "LEN", |s| Value::Int(s.chars().count() as i64))
}

/// LOWER(value)
pub fn fn_lower<'t>(args: &[Operand<'t>], ctx: &EvaluationContext<'_>) -> FormulaResult<Operand<'t>> {
    text_unary(args, ctx, "LOWER", |s| Value::String(s.to_lowercase()))
}

/// UPPER(value)
pub fn fn_upper<'t>(args: &[Operand<'t>], ctx: &EvaluationContext<'_>) -> FormulaResult<Operand<'t>> {
    text_unary(args, ctx, "UPPER", |s| Value::String(s.to_uppercase()))
}

/// TRIM(value) - Strips leading and trailing whitespace
pub fn fn_trim<'t>(args: &[Operand<'t>], ctx: &EvaluationContext<'_>) -> FormulaResult<Operand<'t>> {
    text_unary(args, ctx, "TRIM", |s| Value::string(s.trim()))
}

/// SUBSTR(value, start, [length]) - Characters from a 1-based position
pub fn fn_substr<'t>(args: &[Operand<'t>], ctx: &EvaluationContext<'_>) -> FormulaResult<Operand<'t>> {
    let null = Operand::Scalar(Value::Null);
    let length = args.get(2).unwrap_or(&null);

    map_nary(&[&args[0], &args[1], length], "SUBSTR", ctx.row_count(), |row| {
        let Some(text) = row[0].as_text() else {
            return Ok(Value::Null);
        };
        let Some(start) = Number::from_value(row[1], "SUBSTR")? else {
            return Ok(Value::Null);
        };
        let start = start.as_f64().trunc();
        if start < 1.0 {
            return Err(FormulaError::Argument(format!(
                "SUBSTR: 'start' must be at least 1, got {}",
                start
            )));
        }

        let count = match Number::from_value(row[2], "SUBSTR")? {
            None => usize::MAX,
            Some(n) if n.as_f64() < 0.0 => {
                return Err(FormulaError::Argument(format!(
                    "SUBSTR: 'length' must not be negative, got {}",
                    n
                )))
            }
            Some(n) => n.as_f64().trunc() as usize,
        };

        Ok(Value::String(
            text.chars().skip(start as usize - 1).take(count).collect(),
        ))
    })
}

/// STR_REPLACE(value, old, new) - Replaces every occurrence of `old`
///
/// With an empty `old` nothing is searched; blank cells are filled with `new`
/// instead and every other value passes through unchanged.
pub fn fn_str_replace<'t>(args: &[Operand<'t>], ctx: &EvaluationContext<'_>) -> FormulaResult<Operand<'t>> {
    let old = text_arg(args, 1, "STR_REPLACE", "old")?.unwrap_or_default();
    let new = scalar_arg(args, 2, "STR_REPLACE", "new")?
        .cloned()
        .unwrap_or(Value::Null);

    if old.is_empty() {
        return map_unary(&args[0], "STR_REPLACE", ctx.row_count(), |value| {
            Ok(if value.is_blank() { new.clone() } else { value.clone() })
        });
    }

    let replacement = new.as_text().unwrap_or_default().into_owned();
    map_unary(&args[0], "STR_REPLACE", ctx.row_count(), |value| {
        Ok(match value.as_text() {
            Some(text) => Value::String(text.replace(&old, &replacement)),
            None => Value::Null,
        })
    })
}

/// CONCAT(value, ...) - Joins the text of every argument; nulls count as empty
pub fn fn_concat<'t>(args: &[Operand<'t>], ctx: &EvaluationContext<'_>) -> FormulaResult<Operand<'t>> {
    map_nary(&operand_refs(args), "CONCAT", ctx.row_count(), |row| {
        let mut joined = String::new();
        for value in row {
            if let Some(text) = value.as_text() {
                joined.push_str(&text);
            }
        }
        Ok(Value::String(joined))
    })
}
