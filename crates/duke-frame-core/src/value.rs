//! Cell value types

use std::borrow::Cow;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, Timelike};

/// A single value stored in a [`Column`](crate::Column)
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    /// Missing value
    #[default]
    Null,

    /// Integer value
    Int(i64),

    /// Floating point value
    Float(f64),

    /// Text value
    String(String),

    /// Boolean value (TRUE/FALSE)
    Boolean(bool),

    /// Date and time without a timezone
    DateTime(NaiveDateTime),
}

impl Value {
    /// Create a new string value
    pub fn string<S: Into<String>>(s: S) -> Self {
        Value::String(s.into())
    }

    /// Create a float value, mapping NaN and infinities to [`Value::Null`]
    pub fn finite(n: f64) -> Self {
        if n.is_finite() {
            Value::Float(n)
        } else {
            Value::Null
        }
    }

    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if the value is null, NaN, or an empty/whitespace-only string
    ///
    /// Spreadsheet data routinely stores "nothing" as an empty cell, so blank
    /// text counts as missing everywhere the engine asks this question.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Float(n) => n.is_nan(),
            Value::String(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Check if the value is an integer or float
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    /// Try to get the value as a number
    ///
    /// Text is parsed after trimming. Booleans count as 1 and 0.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(n) if n.is_finite() => Some(*n),
            Value::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    /// Try to get the value as a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            Value::Int(n) => Some(*n != 0),
            Value::Float(n) if !n.is_nan() => Some(*n != 0.0),
            Value::String(s) => match s.trim().to_ascii_uppercase().as_str() {
                "TRUE" => Some(true),
                "FALSE" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Try to get the value as a string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the datetime if this is one
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Value::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    /// Text form of the value, `None` for null
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Value::Null => None,
            Value::String(s) => Some(Cow::Borrowed(s)),
            other => Some(Cow::Owned(other.to_string())),
        }
    }

    /// Get the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Boolean(_) => "boolean",
            Value::DateTime(_) => "datetime",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, ""),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Value::DateTime(dt) => {
                if dt.time().num_seconds_from_midnight() == 0 && dt.time().nanosecond() == 0 {
                    write!(f, "{}", dt.format("%Y-%m-%d"))
                } else {
                    write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S"))
                }
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(dt: NaiveDateTime) -> Self {
        Value::DateTime(dt)
    }
}

impl From<NaiveDate> for Value {
    fn from(date: NaiveDate) -> Self {
        date.and_hms_opt(0, 0, 0).map_or(Value::Null, Value::DateTime)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_blank_values() {
        assert!(Value::Null.is_blank());
        assert!(Value::string("").is_blank());
        assert!(Value::string("  \t").is_blank());
        assert!(Value::Float(f64::NAN).is_blank());
        assert!(!Value::string("0").is_blank());
        assert!(!Value::Int(0).is_blank());
        assert!(!Value::Boolean(false).is_blank());
    }

    #[test]
    fn test_numeric_coercion() {
        assert_eq!(Value::Int(3).as_f64(), Some(3.0));
        assert_eq!(Value::string(" 2.5 ").as_f64(), Some(2.5));
        assert_eq!(Value::Boolean(true).as_f64(), Some(1.0));
        assert_eq!(Value::string("abc").as_f64(), None);
        assert_eq!(Value::string("inf").as_f64(), None);
        assert_eq!(Value::Null.as_f64(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Float(5.0).to_string(), "5");
        assert_eq!(Value::Float(2.25).to_string(), "2.25");
        assert_eq!(Value::Boolean(true).to_string(), "TRUE");
        assert_eq!(Value::Null.to_string(), "");

        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(Value::from(date).to_string(), "2024-03-09");
        let dt = date.and_hms_opt(13, 5, 0).unwrap();
        assert_eq!(Value::from(dt).to_string(), "2024-03-09 13:05:00");
    }

    #[test]
    fn test_from_option() {
        assert_eq!(Value::from(Some(4)), Value::Int(4));
        assert_eq!(Value::from(None::<&str>), Value::Null);
    }

    #[test]
    fn test_finite() {
        assert_eq!(Value::finite(1.5), Value::Float(1.5));
        assert_eq!(Value::finite(f64::INFINITY), Value::Null);
        assert_eq!(Value::finite(f64::NAN), Value::Null);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_json() {
        use crate::Column;

        let dt = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(13, 5, 0)
            .unwrap();
        let column = Column::new(
            "Mixed",
            vec![
                Value::Null,
                Value::Int(-7),
                Value::Float(2.5),
                Value::string("North"),
                Value::Boolean(true),
                Value::DateTime(dt),
            ],
        );

        let json = serde_json::to_string(&column).unwrap();
        let back: Column = serde_json::from_str(&json).unwrap();
        assert_eq!(back, column);

        assert_eq!(serde_json::to_string(&Value::Int(4)).unwrap(), r#"{"Int":4}"#);
        assert_eq!(serde_json::to_string(&Value::Null).unwrap(), r#""Null""#);
    }
}
