//! Numeric coercion and arithmetic
//!
//! Integers stay integers as long as the result is exact; overflow falls back
//! to floating point. Results that are not finite become null when turned
//! back into a [`Value`].

use std::fmt;

use duke_frame_core::Value;

use crate::ast::BinaryOperator;
use crate::error::{FormulaError, FormulaResult};

/// A finite number taken from a cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    /// Coerce a cell value to a number
    ///
    /// Returns `Ok(None)` for missing values (null, NaN, blank text). Text that
    /// does not parse as a number, and datetimes, are a type mismatch for
    /// `operation`.
    pub fn from_value(value: &Value, operation: &str) -> FormulaResult<Option<Number>> {
        match value {
            Value::Null => Ok(None),
            Value::Int(n) => Ok(Some(Number::Int(*n))),
            Value::Float(n) => Ok(n.is_finite().then_some(Number::Float(*n))),
            Value::Boolean(b) => Ok(Some(Number::Int(i64::from(*b)))),
            Value::String(s) => {
                let text = s.trim();
                if text.is_empty() {
                    return Ok(None);
                }
                if let Ok(n) = text.parse::<i64>() {
                    return Ok(Some(Number::Int(n)));
                }
                match text.parse::<f64>() {
                    Ok(n) if n.is_finite() => Ok(Some(Number::Float(n))),
                    _ => Err(FormulaError::type_mismatch(operation, "string")),
                }
            }
            Value::DateTime(_) => Err(FormulaError::type_mismatch(operation, "datetime")),
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(n) => n as f64,
            Number::Float(n) => n,
        }
    }

    pub fn is_zero(self) -> bool {
        self.as_f64() == 0.0
    }

    /// Back to a cell value; non-finite floats become null
    pub fn into_value(self) -> Value {
        match self {
            Number::Int(n) => Value::Int(n),
            Number::Float(n) => Value::finite(n),
        }
    }

    fn float(n: f64) -> Option<Number> {
        n.is_finite().then_some(Number::Float(n))
    }

    pub fn add(self, rhs: Number) -> Number {
        match (self, rhs) {
            (Number::Int(a), Number::Int(b)) => a
                .checked_add(b)
                .map_or(Number::Float(a as f64 + b as f64), Number::Int),
            _ => Number::Float(self.as_f64() + rhs.as_f64()),
        }
    }

    pub fn sub(self, rhs: Number) -> Number {
        match (self, rhs) {
            (Number::Int(a), Number::Int(b)) => a
                .checked_sub(b)
                .map_or(Number::Float(a as f64 - b as f64), Number::Int),
            _ => Number::Float(self.as_f64() - rhs.as_f64()),
        }
    }

    pub fn mul(self, rhs: Number) -> Number {
        match (self, rhs) {
            (Number::Int(a), Number::Int(b)) => a
                .checked_mul(b)
                .map_or(Number::Float(a as f64 * b as f64), Number::Int),
            _ => Number::Float(self.as_f64() * rhs.as_f64()),
        }
    }

    /// True division, always a float; `None` for a zero divisor
    pub fn div(self, rhs: Number) -> Option<Number> {
        if rhs.is_zero() {
            return None;
        }
        Number::float(self.as_f64() / rhs.as_f64())
    }

    /// Remainder taking the sign of the divisor; `None` for a zero divisor
    pub fn rem(self, rhs: Number) -> Option<Number> {
        match (self, rhs) {
            (_, rhs) if rhs.is_zero() => None,
            (Number::Int(a), Number::Int(b)) => {
                let r = a.checked_rem(b).unwrap_or(0);
                Some(Number::Int(if r != 0 && (r < 0) != (b < 0) { r + b } else { r }))
            }
            _ => {
                let (a, b) = (self.as_f64(), rhs.as_f64());
                let r = a % b;
                Number::float(if r != 0.0 && (r < 0.0) != (b < 0.0) { r + b } else { r })
            }
        }
    }

    /// Exponentiation; `None` when the result is not a finite real number
    pub fn pow(self, rhs: Number) -> Option<Number> {
        if let (Number::Int(base), Number::Int(exp)) = (self, rhs) {
            if let Some(n) = u32::try_from(exp).ok().and_then(|e| base.checked_pow(e)) {
                return Some(Number::Int(n));
            }
        }
        Number::float(self.as_f64().powf(rhs.as_f64()))
    }

    pub fn neg(self) -> Number {
        match self {
            Number::Int(n) => n
                .checked_neg()
                .map_or(Number::Float(-(n as f64)), Number::Int),
            Number::Float(n) => Number::Float(-n),
        }
    }

    /// Larger of two numbers, keeping `self` on ties
    pub fn max(self, rhs: Number) -> Number {
        if rhs.as_f64() > self.as_f64() {
            rhs
        } else {
            self
        }
    }

    /// Smaller of two numbers, keeping `self` on ties
    pub fn min(self, rhs: Number) -> Number {
        if rhs.as_f64() < self.as_f64() {
            rhs
        } else {
            self
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(n) => write!(f, "{}", n),
            Number::Float(n) => write!(f, "{}", n),
        }
    }
}

/// Apply an arithmetic operator to two cell values
///
/// A missing operand, a zero divisor, or a non-finite result gives null.
pub fn apply_arithmetic(op: BinaryOperator, left: &Value, right: &Value) -> FormulaResult<Value> {
    let symbol = op.symbol();
    let left = Number::from_value(left, symbol)?;
    let right = Number::from_value(right, symbol)?;
    let (Some(a), Some(b)) = (left, right) else {
        return Ok(Value::Null);
    };

    let result = match op {
        BinaryOperator::Add => Some(a.add(b)),
        BinaryOperator::Subtract => Some(a.sub(b)),
        BinaryOperator::Multiply => Some(a.mul(b)),
        BinaryOperator::Divide => a.div(b),
        BinaryOperator::Power => a.pow(b),
        BinaryOperator::Modulo => a.rem(b),
        other => return Err(FormulaError::DisallowedOperator(other.symbol().to_string())),
    };
    Ok(result.map_or(Value::Null, Number::into_value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn arith(op: BinaryOperator, a: impl Into<Value>, b: impl Into<Value>) -> Value {
        apply_arithmetic(op, &a.into(), &b.into()).unwrap()
    }

    #[test]
    fn test_from_value() {
        assert_eq!(Number::from_value(&Value::Int(3), "+").unwrap(), Some(Number::Int(3)));
        assert_eq!(Number::from_value(&Value::string(" 2.5 "), "+").unwrap(), Some(Number::Float(2.5)));
        assert_eq!(Number::from_value(&Value::string("  "), "+").unwrap(), None);
        assert_eq!(Number::from_value(&Value::Float(f64::NAN), "+").unwrap(), None);
        assert_eq!(Number::from_value(&Value::Boolean(true), "+").unwrap(), Some(Number::Int(1)));
        assert!(matches!(
            Number::from_value(&Value::string("abc"), "+"),
            Err(FormulaError::TypeMismatch { type_name, .. }) if type_name == "string"
        ));
    }

    #[test]
    fn test_integer_arithmetic_stays_exact() {
        assert_eq!(arith(BinaryOperator::Add, 2, 3), Value::Int(5));
        assert_eq!(arith(BinaryOperator::Multiply, 4, 5), Value::Int(20));
        assert_eq!(arith(BinaryOperator::Power, 2, 10), Value::Int(1024));
        assert_eq!(arith(BinaryOperator::Divide, 30, 5), Value::Float(6.0));
    }

    #[test]
    fn test_overflow_falls_back_to_float() {
        assert_eq!(
            arith(BinaryOperator::Add, i64::MAX, 1),
            Value::Float(i64::MAX as f64 + 1.0)
        );
        assert_eq!(arith(BinaryOperator::Power, 2, -1), Value::Float(0.5));
    }

    #[test]
    fn test_zero_division_is_null() {
        assert_eq!(arith(BinaryOperator::Divide, 1, 0), Value::Null);
        assert_eq!(arith(BinaryOperator::Modulo, 1, 0.0), Value::Null);
        assert_eq!(arith(BinaryOperator::Power, 0, -1), Value::Null);
    }

    #[test]
    fn test_modulo_takes_divisor_sign() {
        assert_eq!(arith(BinaryOperator::Modulo, 7, 3), Value::Int(1));
        assert_eq!(arith(BinaryOperator::Modulo, -7, 3), Value::Int(2));
        assert_eq!(arith(BinaryOperator::Modulo, 7, -3), Value::Int(-2));
        assert_eq!(arith(BinaryOperator::Modulo, 5.5, 2), Value::Float(1.5));
    }

    #[test]
    fn test_null_propagates() {
        assert_eq!(arith(BinaryOperator::Add, Value::Null, 1), Value::Null);
        assert_eq!(arith(BinaryOperator::Multiply, "", 2), Value::Null);
    }

    #[test]
    fn test_non_finite_results_become_null() {
        assert_eq!(arith(BinaryOperator::Multiply, f64::MAX, 2.0), Value::Null);
        assert_eq!(arith(BinaryOperator::Power, -8, 0.5), Value::Null);
    }
}
