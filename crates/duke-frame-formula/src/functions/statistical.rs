//! Statistical functions

use duke_frame_core::Value;

use super::{collect_numbers, optional_numbers, scalar_arg};
use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::EvaluationContext;
use crate::number::Number;
use crate::operand::Operand;

/// ZSCORE(value) - Standardizes a column with its population mean and std
///
/// A column without spread (std at or below `1e-12 * (1 + |mean|)`) maps to
/// 0.0 instead of dividing by nearly nothing. Missing values stay missing.
pub fn fn_zscore<'t>(args: &[Operand<'t>], ctx: &EvaluationContext<'_>) -> FormulaResult<Operand<'t>> {
    if let Operand::Scalar(value) = &args[0] {
        return Ok(Operand::Scalar(match Number::from_value(value, "ZSCORE")? {
            Some(_) => Value::Float(0.0),
            None => Value::Null,
        }));
    }

    let values = args[0].to_column("ZSCORE", ctx.row_count())?;
    let numbers: Vec<Option<f64>> = optional_numbers(&values, "ZSCORE")?
        .into_iter()
        .map(|n| n.map(Number::as_f64))
        .collect();

    let present: Vec<f64> = numbers.iter().flatten().copied().collect();
    let Some((mean, variance)) = moments(&present, 0) else {
        return Ok(Operand::column(vec![Value::Null; numbers.len()]));
    };
    let std = variance.sqrt();
    // Equal values are flat even when summation leaves a rounding-sized std
    let flat = std == 0.0 || present.iter().all(|&x| x == present[0]);

    Ok(Operand::column(
        numbers
            .iter()
            .map(|n| match n {
                None => Value::Null,
                Some(_) if flat => Value::Float(0.0),
                Some(x) => Value::finite((x - mean) / std),
            })
            .collect(),
    ))
}

/// Mean and variance with `ddof` delta degrees of freedom
fn moments(numbers: &[f64], ddof: usize) -> Option<(f64, f64)> {
    if numbers.len() <= ddof || numbers.is_empty() {
        return None;
    }
    let mean = numbers.iter().sum::<f64>() / numbers.len() as f64;
    let squares: f64 = numbers.iter().map(|x| (x - mean).powi(2)).sum();
    Some((mean, squares / (numbers.len() - ddof) as f64))
}

fn sorted_floats(operand: &Operand<'_>, function: &str) -> FormulaResult<Vec<f64>> {
    let mut floats: Vec<f64> = collect_numbers(operand, function)?
        .into_iter()
        .map(Number::as_f64)
        .collect();
    floats.sort_by(f64::total_cmp);
    Ok(floats)
}

/// Linear interpolation between closest ranks
fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let position = q * last as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// COUNT(value, ...) - Number of non-blank values across all arguments
pub fn fn_count<'t>(args: &[Operand<'t>], _ctx: &EvaluationContext<'_>) -> FormulaResult<Operand<'t>> {
    let mut count: i64 = 0;
    for arg in args {
        count += arg.values("COUNT")?.iter().filter(|v| !v.is_blank()).count() as i64;
    }
    Ok(Operand::Scalar(Value::Int(count)))
}

/// MEDIAN(value) - Middle value of the input
pub fn fn_median<'t>(args: &[Operand<'t>], _ctx: &EvaluationContext<'_>) -> FormulaResult<Operand<'t>> {
    let sorted = sorted_floats(&args[0], "MEDIAN")?;
    Ok(Operand::Scalar(
        quantile(&sorted, 0.5).map_or(Value::Null, Value::finite),
    ))
}

/// STD(value) - Sample standard deviation
pub fn fn_std<'t>(args: &[Operand<'t>], _ctx: &EvaluationContext<'_>) -> FormulaResult<Operand<'t>> {
    let floats = sorted_floats(&args[0], "STD")?;
    Ok(Operand::Scalar(
        moments(&floats, 1).map_or(Value::Null, |(_, var)| Value::finite(var.sqrt())),
    ))
}

/// VAR(value) - Sample variance
pub fn fn_var<'t>(args: &[Operand<'t>], _ctx: &EvaluationContext<'_>) -> FormulaResult<Operand<'t>> {
    let floats = sorted_floats(&args[0], "VAR")?;
    Ok(Operand::Scalar(
        moments(&floats, 1).map_or(Value::Null, |(_, var)| Value::finite(var)),
    ))
}

/// PERCENTILE(value, q) - Value at quantile `q` in [0, 1]
pub fn fn_percentile<'t>(args: &[Operand<'t>], _ctx: &EvaluationContext<'_>) -> FormulaResult<Operand<'t>> {
    let q = scalar_arg(args, 1, "PERCENTILE", "q")?
        .map(|value| Number::from_value(value, "PERCENTILE"))
        .transpose()?
        .flatten()
        .ok_or_else(|| FormulaError::Argument("PERCENTILE: 'q' must be a number".into()))?
        .as_f64();
    if !(0.0..=1.0).contains(&q) {
        return Err(FormulaError::Argument(format!(
            "PERCENTILE: 'q' must be between 0 and 1, got {}",
            q
        )));
    }

    let sorted = sorted_floats(&args[0], "PERCENTILE")?;
    Ok(Operand::Scalar(
        quantile(&sorted, q).map_or(Value::Null, Value::finite),
    ))
}
