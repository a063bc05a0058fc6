//! Logical and comparison functions

use std::cmp::Ordering;

use duke_frame_core::{parse_datetime, Value};

use super::operand_refs;
use crate::error::FormulaResult;
use crate::evaluator::EvaluationContext;
use crate::operand::{map_binary, map_nary, map_unary, Operand};

/// Truthiness of a cell
///
/// Null and blank text are false; numbers are true when non-zero; text is
/// false for `"false"` and numeric zero, true otherwise.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Boolean(b) => *b,
        Value::Int(n) => *n != 0,
        Value::Float(n) => !n.is_nan() && *n != 0.0,
        Value::String(s) => {
            if s.trim().is_empty() {
                false
            } else if let Some(b) = value.as_bool() {
                b
            } else if let Some(n) = value.as_f64() {
                n != 0.0
            } else {
                true
            }
        }
        Value::DateTime(_) => true,
    }
}

/// IF(condition, then, [otherwise]) - Picks per row; `otherwise` defaults to null
pub fn fn_if<'t>(args: &[Operand<'t>], ctx: &EvaluationContext<'_>) -> FormulaResult<Operand<'t>> {
    let null = Operand::Scalar(Value::Null);
    let otherwise = args.get(2).unwrap_or(&null);

    map_nary(&[&args[0], &args[1], otherwise], "IF", ctx.row_count(), |row| {
        Ok(if truthy(row[0]) { row[1].clone() } else { row[2].clone() })
    })
}

/// AND(value, ...) - True when every argument is truthy
pub fn fn_and<'t>(args: &[Operand<'t>], ctx: &EvaluationContext<'_>) -> FormulaResult<Operand<'t>> {
    map_nary(&operand_refs(args), "AND", ctx.row_count(), |row| {
        Ok(Value::Boolean(row.iter().all(|v| truthy(v))))
    })
}

/// OR(value, ...) - True when any argument is truthy
pub fn fn_or<'t>(args: &[Operand<'t>], ctx: &EvaluationContext<'_>) -> FormulaResult<Operand<'t>> {
    map_nary(&operand_refs(args), "OR", ctx.row_count(), |row| {
        Ok(Value::Boolean(row.iter().any(|v| truthy(v))))
    })
}

/// NOT(value) - Negated truthiness; a missing value stays missing
pub fn fn_not<'t>(args: &[Operand<'t>], ctx: &EvaluationContext<'_>) -> FormulaResult<Operand<'t>> {
    map_unary(&args[0], "NOT", ctx.row_count(), |value| {
        Ok(if value.is_blank() {
            Value::Null
        } else {
            Value::Boolean(!truthy(value))
        })
    })
}

/// Compare two values
///
/// Numbers compare numerically, dates chronologically, and everything else
/// as case-insensitive text. Missing values are not comparable.
pub fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    if left.is_blank() || right.is_blank() {
        return None;
    }
    if let (Some(a), Some(b)) = (left.as_f64(), right.as_f64()) {
        return a.partial_cmp(&b);
    }
    if let (Some(a), Some(b)) = (as_datetime(left), as_datetime(right)) {
        if matches!(left, Value::DateTime(_)) || matches!(right, Value::DateTime(_)) {
            return Some(a.cmp(&b));
        }
    }
    let a = left.as_text()?.to_lowercase();
    let b = right.as_text()?.to_lowercase();
    Some(a.cmp(&b))
}

fn as_datetime(value: &Value) -> Option<chrono::NaiveDateTime> {
    match value {
        Value::DateTime(dt) => Some(*dt),
        Value::String(s) => parse_datetime(s),
        _ => None,
    }
}

fn comparison<'t>(
    args: &[Operand<'t>],
    ctx: &EvaluationContext<'_>,
    name: &str,
    test: fn(Ordering) -> bool,
) -> FormulaResult<Operand<'t>> {
    map_binary(&args[0], &args[1], name, ctx.row_count(), |a, b| {
        Ok(compare_values(a, b).map_or(Value::Null, |ord| Value::Boolean(test(ord))))
    })
}

/// EQ(left, right) - Equality
pub fn fn_eq<'t>(args: &[Operand<'t>], ctx: &EvaluationContext<'_>) -> FormulaResult<Operand<'t>> {
    comparison(args, ctx, "EQ", Ordering::is_eq)
}

/// NE(left, right) - Inequality
pub fn fn_ne<'t>(args: &[Operand<'t>], ctx: &EvaluationContext<'_>) -> FormulaResult<Operand<'t>> {
    comparison(args, ctx, "NE", Ordering::is_ne)
}

/// GT(left, right)
pub fn fn_gt<'t>(args: &[Operand<'t>], ctx: &EvaluationContext<'_>) -> FormulaResult<Operand<'t>> {
    comparison(args, ctx, "GT", Ordering::is_gt)
}

/// GE(left, right)
pub fn fn_ge<'t>(args: &[Operand<'t>], ctx: &EvaluationContext<'_>) -> FormulaResult<Operand<'t>> {
    comparison(args, ctx, "GE", Ordering::is_ge)
}

/// LT(left, right)
pub fn fn_lt<'t>(args: &[Operand<'t>], ctx: &EvaluationContext<'_>) -> FormulaResult<Operand<'t>> {
    comparison(args, ctx, "LT", Ordering::is_lt)
}

/// LE(left, right)
pub fn fn_le<'t>(args: &[Operand<'t>], ctx: &EvaluationContext<'_>) -> FormulaResult<Operand<'t>> {
    comparison(args, ctx, "LE", Ordering::is_le)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthy() {
        assert!(!truthy(&Value::Null));
        assert!(!truthy(&Value::string("  ")));
        assert!(!truthy(&Value::string("false")));
        assert!(!truthy(&Value::string("0")));
        assert!(!truthy(&Value::Int(0)));
        assert!(truthy(&Value::string("yes")));
        assert!(truthy(&Value::Float(0.5)));
        assert!(truthy(&Value::Boolean(true)));
    }

    #[test]
    fn test_compare_values() {
        assert_eq!(compare_values(&Value::Int(2), &Value::Float(10.0)), Some(Ordering::Less));
        assert_eq!(compare_values(&Value::string("10"), &Value::Int(9)), Some(Ordering::Greater));
        assert_eq!(compare_values(&Value::string("abc"), &Value::string("ABC")), Some(Ordering::Equal));
        assert_eq!(compare_values(&Value::Null, &Value::Int(1)), None);
        let day = chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(
            compare_values(&Value::from(day), &Value::string("2024-02-28")),
            Some(Ordering::Greater)
        );
    }
}
