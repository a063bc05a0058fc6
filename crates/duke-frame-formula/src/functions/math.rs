//! Math functions

use duke_frame_core::Value;
use rust_decimal::prelude::*;

use super::{collect_numbers, numbers_of, operand_refs};
use crate::ast::BinaryOperator;
use crate::error::FormulaResult;
use crate::evaluator::EvaluationContext;
use crate::number::{apply_arithmetic, Number};
use crate::operand::{map_binary, map_nary, map_unary, Operand};

/// The five reducers shared by whole-input and row-wise aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Aggregate {
    Sum,
    Avg,
    Max,
    Min,
    Prod,
}

impl Aggregate {
    fn name(self) -> &'static str {
        match self {
            Aggregate::Sum => "SUM",
            Aggregate::Avg => "AVG",
            Aggregate::Max => "MAX",
            Aggregate::Min => "MIN",
            Aggregate::Prod => "PROD",
        }
    }

    /// Reduce the present numbers; an empty input is 0 for SUM, 1 for PROD, null otherwise
    fn reduce(self, numbers: &[Number]) -> Value {
        let result = match self {
            Aggregate::Sum => Some(numbers.iter().fold(Number::Int(0), |acc, &n| acc.add(n))),
            Aggregate::Prod => Some(numbers.iter().fold(Number::Int(1), |acc, &n| acc.mul(n))),
            Aggregate::Avg if numbers.is_empty() => None,
            Aggregate::Avg => {
                let sum: f64 = numbers.iter().map(|n| n.as_f64()).sum();
                Some(Number::Float(sum / numbers.len() as f64))
            }
            Aggregate::Max => numbers.iter().copied().reduce(Number::max),
            Aggregate::Min => numbers.iter().copied().reduce(Number::min),
        };
        result.map_or(Value::Null, Number::into_value)
    }
}

/// One argument collapses the whole input to a scalar; several reduce row by row
fn aggregate<'t>(
    kind: Aggregate,
    args: &[Operand<'t>],
    ctx: &EvaluationContext<'_>,
) -> FormulaResult<Operand<'t>> {
    let name = kind.name();
    if let [single] = args {
        let numbers = collect_numbers(single, name)?;
        return Ok(Operand::Scalar(kind.reduce(&numbers)));
    }

    map_nary(&operand_refs(args), name, ctx.row_count(), |row| {
        let numbers = numbers_of(row.iter().copied(), name)?;
        Ok(kind.reduce(&numbers))
    })
}

/// SUM function
pub fn fn_sum<'t>(args: &[Operand<'t>], ctx: &EvaluationContext<'_>) -> FormulaResult<Operand<'t>> {
    aggregate(Aggregate::Sum, args, ctx)
}

/// AVG (AVERAGE) function
pub fn fn_avg<'t>(args: &[Operand<'t>], ctx: &EvaluationContext<'_>) -> FormulaResult<Operand<'t>> {
    aggregate(Aggregate::Avg, args, ctx)
}

/// MAX function
pub fn fn_max<'t>(args: &[Operand<'t>], ctx: &EvaluationContext<'_>) -> FormulaResult<Operand<'t>> {
    aggregate(Aggregate::Max, args, ctx)
}

/// MIN function
pub fn fn_min<'t>(args: &[Operand<'t>], ctx: &EvaluationContext<'_>) -> FormulaResult<Operand<'t>> {
    aggregate(Aggregate::Min, args, ctx)
}

/// PROD (PRODUCT) function
pub fn fn_prod<'t>(args: &[Operand<'t>], ctx: &EvaluationContext<'_>) -> FormulaResult<Operand<'t>> {
    aggregate(Aggregate::Prod, args, ctx)
}

/// DIV(value, divisor, ...) - Divides left to right, skipping zero divisors
///
/// A missing value or divisor makes the row null.
pub fn fn_div<'t>(args: &[Operand<'t>], ctx: &EvaluationContext<'_>) -> FormulaResult<Operand<'t>> {
    map_nary(&operand_refs(args), "DIV", ctx.row_count(), |row| {
        let Some(mut quotient) = Number::from_value(row[0], "DIV")? else {
            return Ok(Value::Null);
        };
        for divisor in &row[1..] {
            match Number::from_value(divisor, "DIV")? {
                None => return Ok(Value::Null),
                Some(d) if d.is_zero() => continue,
                Some(d) => quotient = Number::Float(quotient.as_f64() / d.as_f64()),
            }
        }
        Ok(quotient.into_value())
    })
}

/// ROUND(value, [digits]) - Rounds half away from zero
///
/// Negative `digits` round to the left of the decimal point.
pub fn fn_round<'t>(args: &[Operand<'t>], ctx: &EvaluationContext<'_>) -> FormulaResult<Operand<'t>> {
    let zero = Operand::Scalar(Value::Int(0));
    let digits = args.get(1).unwrap_or(&zero);

    map_binary(&args[0], digits, "ROUND", ctx.row_count(), |value, digits| {
        let (Some(number), Some(digits)) = (
            Number::from_value(value, "ROUND")?,
            Number::from_value(digits, "ROUND")?,
        ) else {
            return Ok(Value::Null);
        };
        let digits = digits.as_f64().trunc().clamp(-308.0, 308.0) as i32;

        Ok(match number {
            Number::Int(n) if digits >= 0 => Value::Int(n),
            Number::Int(n) => round_decimal(Decimal::from(n), digits)
                .and_then(|d| d.to_i64())
                .map_or_else(|| Value::finite(round_float(n as f64, digits)), Value::Int),
            Number::Float(n) => Value::finite(round_float(n, digits)),
        })
    })
}

fn round_decimal(value: Decimal, digits: i32) -> Option<Decimal> {
    const HALF_UP: RoundingStrategy = RoundingStrategy::MidpointAwayFromZero;
    if digits >= 0 {
        return Some(value.round_dp_with_strategy(digits.min(28) as u32, HALF_UP));
    }
    let scale = Decimal::from(10i64.checked_pow(digits.unsigned_abs())?);
    value
        .checked_div(scale)?
        .round_dp_with_strategy(0, HALF_UP)
        .checked_mul(scale)
}

fn round_float(number: f64, digits: i32) -> f64 {
    Decimal::from_f64(number)
        .and_then(|d| round_decimal(d, digits))
        .and_then(|d| d.to_f64())
        .unwrap_or_else(|| {
            // Out of decimal range: multiplier approach
            let multiplier = 10_f64.powi(digits);
            if number >= 0.0 {
                (number * multiplier + 0.5).floor() / multiplier
            } else {
                (number * multiplier - 0.5).ceil() / multiplier
            }
        })
}

/// Row-wise numeric function; `f` returning `None` gives null
fn numeric_unary<'t>(
    args: &[Operand<'t>],
    ctx: &EvaluationContext<'_>,
    name: &str,
    f: impl Fn(Number) -> Option<Number>,
) -> FormulaResult<Operand<'t>> {
    map_unary(&args[0], name, ctx.row_count(), |value| {
        Ok(Number::from_value(value, name)?
            .and_then(&f)
            .map_or(Value::Null, Number::into_value))
    })
}

fn positive_log(n: Number, log: fn(f64) -> f64) -> Option<Number> {
    let x = n.as_f64();
    (x > 0.0).then(|| Number::Float(log(x)))
}

/// ABS function
pub fn fn_abs<'t>(args: &[Operand<'t>], ctx: &EvaluationContext<'_>) -> FormulaResult<Operand<'t>> {
    numeric_unary(args, ctx, "ABS", |n| {
        Some(match n {
            Number::Int(i) => i.checked_abs().map_or(Number::Float((i as f64).abs()), Number::Int),
            Number::Float(f) => Number::Float(f.abs()),
        })
    })
}

/// SQRT function; negative input is null
pub fn fn_sqrt<'t>(args: &[Operand<'t>], ctx: &EvaluationContext<'_>) -> FormulaResult<Operand<'t>> {
    numeric_unary(args, ctx, "SQRT", |n| {
        let x = n.as_f64();
        (x >= 0.0).then(|| Number::Float(x.sqrt()))
    })
}

/// LN function; non-positive input is null
pub fn fn_ln<'t>(args: &[Operand<'t>], ctx: &EvaluationContext<'_>) -> FormulaResult<Operand<'t>> {
    numeric_unary(args, ctx, "LN", |n| positive_log(n, f64::ln))
}

/// LOG10 function; non-positive input is null
pub fn fn_log10<'t>(args: &[Operand<'t>], ctx: &EvaluationContext<'_>) -> FormulaResult<Operand<'t>> {
    numeric_unary(args, ctx, "LOG10", |n| positive_log(n, f64::log10))
}

/// EXP function
pub fn fn_exp<'t>(args: &[Operand<'t>], ctx: &EvaluationContext<'_>) -> FormulaResult<Operand<'t>> {
    numeric_unary(args, ctx, "EXP", |n| Some(Number::Float(n.as_f64().exp())))
}

/// MOD(value, divisor) - Same as the `%` operator
pub fn fn_mod<'t>(args: &[Operand<'t>], ctx: &EvaluationContext<'_>) -> FormulaResult<Operand<'t>> {
    map_binary(&args[0], &args[1], "MOD", ctx.row_count(), |a, b| {
        apply_arithmetic(BinaryOperator::Modulo, a, b)
    })
}

/// POWER(value, exponent) - Same as the `**` operator
pub fn fn_power<'t>(args: &[Operand<'t>], ctx: &EvaluationContext<'_>) -> FormulaResult<Operand<'t>> {
    map_binary(&args[0], &args[1], "POWER", ctx.row_count(), |a, b| {
        apply_arithmetic(BinaryOperator::Power, a, b)
    })
}
