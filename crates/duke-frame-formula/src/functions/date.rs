//! Date/time functions
//!
//! Cells holding datetimes are used as-is; text cells are parsed with the
//! same formats the CSV reader recognises. Anything else is treated as
//! missing.

use chrono::{Datelike, NaiveDateTime};
use duke_frame_core::{parse_datetime, Value};

use super::text_arg;
use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::EvaluationContext;
use crate::operand::{map_binary, map_unary, Operand};

fn to_datetime(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::DateTime(dt) => Some(*dt),
        Value::String(s) => parse_datetime(s),
        _ => None,
    }
}

fn date_part<'t>(
    args: &[Operand<'t>],
    ctx: &EvaluationContext<'_>,
    name: &str,
    part: fn(&NaiveDateTime) -> i64,
) -> FormulaResult<Operand<'t>> {
    map_unary(&args[0], name, ctx.row_count(), |value| {
        Ok(to_datetime(value).map_or(Value::Null, |dt| Value::Int(part(&dt))))
    })
}

/// YEAR(value)
pub fn fn_year<'t>(args: &[Operand<'t>], ctx: &EvaluationContext<'_>) -> FormulaResult<Operand<'t>> {
    date_part(args, ctx, "YEAR", |dt| i64::from(dt.year()))
}

/// MONTH(value) - 1 to 12
pub fn fn_month<'t>(args: &[Operand<'t>], ctx: &EvaluationContext<'_>) -> FormulaResult<Operand<'t>> {
    date_part(args, ctx, "MONTH", |dt| i64::from(dt.month()))
}

/// DAY(value) - Day of the month
pub fn fn_day<'t>(args: &[Operand<'t>], ctx: &EvaluationContext<'_>) -> FormulaResult<Operand<'t>> {
    date_part(args, ctx, "DAY", |dt| i64::from(dt.day()))
}

/// WEEKDAY(value) - Monday is 0, Sunday is 6
pub fn fn_weekday<'t>(args: &[Operand<'t>], ctx: &EvaluationContext<'_>) -> FormulaResult<Operand<'t>> {
    date_part(args, ctx, "WEEKDAY", |dt| {
        i64::from(dt.weekday().num_days_from_monday())
    })
}

/// Units accepted by DATE_DIFF
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DiffUnit {
    Days,
    Weeks,
    Hours,
    Minutes,
    Seconds,
}

impl DiffUnit {
    fn parse(unit: &str) -> Option<Self> {
        match unit.trim().to_ascii_lowercase().as_str() {
            "days" | "day" | "d" => Some(DiffUnit::Days),
            "weeks" | "week" | "w" => Some(DiffUnit::Weeks),
            "hours" | "hour" | "h" => Some(DiffUnit::Hours),
            "minutes" | "minute" | "m" => Some(DiffUnit::Minutes),
            "seconds" | "second" | "s" => Some(DiffUnit::Seconds),
            _ => None,
        }
    }
}

/// DATE_DIFF(end, start, [unit]) - Whole units from `start` to `end`
///
/// Partial units are truncated toward zero. The unit defaults to days.
pub fn fn_date_diff<'t>(args: &[Operand<'t>], ctx: &EvaluationContext<'_>) -> FormulaResult<Operand<'t>> {
    let unit = match text_arg(args, 2, "DATE_DIFF", "unit")? {
        None => DiffUnit::Days,
        Some(text) => DiffUnit::parse(&text).ok_or_else(|| {
            FormulaError::Argument(format!(
                "DATE_DIFF: unknown unit '{}', expected days, weeks, hours, minutes or seconds",
                text
            ))
        })?,
    };

    map_binary(&args[0], &args[1], "DATE_DIFF", ctx.row_count(), |end, start| {
        let (Some(end), Some(start)) = (to_datetime(end), to_datetime(start)) else {
            return Ok(Value::Null);
        };
        let elapsed = end - start;
        Ok(Value::Int(match unit {
            DiffUnit::Days => elapsed.num_days(),
            DiffUnit::Weeks => elapsed.num_weeks(),
            DiffUnit::Hours => elapsed.num_hours(),
            DiffUnit::Minutes => elapsed.num_minutes(),
            DiffUnit::Seconds => elapsed.num_seconds(),
        }))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_parse() {
        assert_eq!(DiffUnit::parse(" Days "), Some(DiffUnit::Days));
        assert_eq!(DiffUnit::parse("week"), Some(DiffUnit::Weeks));
        assert_eq!(DiffUnit::parse("fortnights"), None);
    }

    #[test]
    fn test_to_datetime() {
        assert!(to_datetime(&Value::string("2024-01-15")).is_some());
        assert!(to_datetime(&Value::string("soon")).is_none());
        assert!(to_datetime(&Value::Int(20240115)).is_none());
    }
}
