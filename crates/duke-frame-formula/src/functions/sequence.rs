//! Order-dependent column functions
//!
//! These look at neighbouring rows, so a scalar argument is first broadcast
//! to a full column and the result is always a column.

use duke_frame_core::Value;

use super::{integer_arg, optional_numbers};
use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::EvaluationContext;
use crate::number::Number;
use crate::operand::Operand;

/// Running accumulation; missing values are skipped and stay missing
fn cumulative<'t>(
    args: &[Operand<'t>],
    ctx: &EvaluationContext<'_>,
    name: &str,
    combine: fn(Number, Number) -> Number,
) -> FormulaResult<Operand<'t>> {
    let values = args[0].to_column(name, ctx.row_count())?;
    let mut acc: Option<Number> = None;
    let mut out = Vec::with_capacity(values.len());

    for number in optional_numbers(&values, name)? {
        match number {
            None => out.push(Value::Null),
            Some(n) => {
                let next = acc.map_or(n, |a| combine(a, n));
                acc = Some(next);
                out.push(next.into_value());
            }
        }
    }
    Ok(Operand::column(out))
}

/// CUMSUM(value)
pub fn fn_cumsum<'t>(args: &[Operand<'t>], ctx: &EvaluationContext<'_>) -> FormulaResult<Operand<'t>> {
    cumulative(args, ctx, "CUMSUM", Number::add)
}

/// CUMPROD(value)
pub fn fn_cumprod<'t>(args: &[Operand<'t>], ctx: &EvaluationContext<'_>) -> FormulaResult<Operand<'t>> {
    cumulative(args, ctx, "CUMPROD", Number::mul)
}

/// CUMMAX(value)
pub fn fn_cummax<'t>(args: &[Operand<'t>], ctx: &EvaluationContext<'_>) -> FormulaResult<Operand<'t>> {
    cumulative(args, ctx, "CUMMAX", Number::max)
}

/// CUMMIN(value)
pub fn fn_cummin<'t>(args: &[Operand<'t>], ctx: &EvaluationContext<'_>) -> FormulaResult<Operand<'t>> {
    cumulative(args, ctx, "CUMMIN", Number::min)
}

/// Row `periods` rows back (forward when negative), if inside the table
fn shifted(row: usize, periods: i64, len: usize) -> Option<usize> {
    let source = i64::try_from(row).ok()?.checked_sub(periods)?;
    usize::try_from(source).ok().filter(|&i| i < len)
}

/// Combine each row with the row `periods` away
fn with_shifted<'t>(
    args: &[Operand<'t>],
    ctx: &EvaluationContext<'_>,
    name: &str,
    combine: fn(Number, Number) -> Option<Number>,
) -> FormulaResult<Operand<'t>> {
    let periods = integer_arg(args, 1, name, "periods", 1)?;
    let values = args[0].to_column(name, ctx.row_count())?;
    let numbers = optional_numbers(&values, name)?;

    let out = (0..numbers.len())
        .map(|row| {
            let previous = shifted(row, periods, numbers.len()).and_then(|i| numbers[i]);
            match (numbers[row], previous) {
                (Some(current), Some(previous)) => {
                    combine(current, previous).map_or(Value::Null, Number::into_value)
                }
                _ => Value::Null,
            }
        })
        .collect();
    Ok(Operand::column(out))
}

/// DIFF(value, [periods]) - Change from `periods` rows back
pub fn fn_diff<'t>(args: &[Operand<'t>], ctx: &EvaluationContext<'_>) -> FormulaResult<Operand<'t>> {
    with_shifted(args, ctx, "DIFF", |current, previous| {
        Some(current.sub(previous))
    })
}

/// PCT_CHANGE(value, [periods]) - Relative change from `periods` rows back
pub fn fn_pct_change<'t>(args: &[Operand<'t>], ctx: &EvaluationContext<'_>) -> FormulaResult<Operand<'t>> {
    with_shifted(args, ctx, "PCT_CHANGE", |current, previous| {
        current.sub(previous).div(previous)
    })
}

/// LAG(value, [periods]) - Value from `periods` rows back
pub fn fn_lag<'t>(args: &[Operand<'t>], ctx: &EvaluationContext<'_>) -> FormulaResult<Operand<'t>> {
    let periods = integer_arg(args, 1, "LAG", "periods", 1)?;
    let values = args[0].to_column("LAG", ctx.row_count())?;

    let out = (0..values.len())
        .map(|row| {
            shifted(row, periods, values.len()).map_or(Value::Null, |i| values[i].clone())
        })
        .collect();
    Ok(Operand::column(out))
}

/// Fold each full window of `window` rows ending at the current row
///
/// Rows before the first full window, and windows holding a missing value,
/// are null.
fn rolling<'t>(
    args: &[Operand<'t>],
    ctx: &EvaluationContext<'_>,
    name: &str,
    fold: fn(&[Number]) -> Number,
) -> FormulaResult<Operand<'t>> {
    let window = integer_arg(args, 1, name, "window", 0)?;
    if window < 1 {
        return Err(FormulaError::Argument(format!(
            "{}: 'window' must be at least 1, got {}",
            name, window
        )));
    }
    let window = usize::try_from(window).unwrap_or(usize::MAX);

    let values = args[0].to_column(name, ctx.row_count())?;
    let numbers = optional_numbers(&values, name)?;
    let mut frame = Vec::with_capacity(window.min(numbers.len()));

    let out = (0..numbers.len())
        .map(|row| {
            if row + 1 < window {
                return Value::Null;
            }
            frame.clear();
            for n in &numbers[row + 1 - window..=row] {
                match n {
                    Some(n) => frame.push(*n),
                    None => return Value::Null,
                }
            }
            fold(&frame).into_value()
        })
        .collect();
    Ok(Operand::column(out))
}

fn window_sum(numbers: &[Number]) -> Number {
    numbers.iter().fold(Number::Int(0), |acc, &n| acc.add(n))
}

fn window_avg(numbers: &[Number]) -> Number {
    Number::Float(window_sum(numbers).as_f64() / numbers.len() as f64)
}

/// ROLLING_SUM(value, window)
pub fn fn_rolling_sum<'t>(args: &[Operand<'t>], ctx: &EvaluationContext<'_>) -> FormulaResult<Operand<'t>> {
    rolling(args, ctx, "ROLLING_SUM", window_sum)
}

/// ROLLING_AVG(value, window)
pub fn fn_rolling_avg<'t>(args: &[Operand<'t>], ctx: &EvaluationContext<'_>) -> FormulaResult<Operand<'t>> {
    rolling(args, ctx, "ROLLING_AVG", window_avg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shifted() {
        assert_eq!(shifted(0, 1, 3), None);
        assert_eq!(shifted(2, 1, 3), Some(1));
        assert_eq!(shifted(0, -1, 3), Some(1));
        assert_eq!(shifted(2, -1, 3), None);
        assert_eq!(shifted(1, 0, 3), Some(1));
    }
}
