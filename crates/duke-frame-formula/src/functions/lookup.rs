//! Lookup functions

use duke_frame_core::Value;

use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::EvaluationContext;
use crate::number::Number;
use crate::operand::{map_unary, Operand};

fn values_equal(key: &Value, value: &Value) -> bool {
    if value.is_blank() || key.is_blank() {
        return false;
    }
    match (key.as_f64(), value.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => key.as_text() == value.as_text(),
    }
}

fn json_to_value(json: serde_json::Value) -> FormulaResult<Value> {
    Ok(match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => n.as_f64().map_or(Value::Null, Value::finite),
        },
        serde_json::Value::String(s) => Value::String(s),
        other => {
            return Err(FormulaError::Argument(format!(
                "MAP: mapping values must be scalars, found {}",
                other
            )))
        }
    })
}

/// Mapping pairs from a literal or from a JSON object string
fn mapping_pairs(operand: &Operand<'_>) -> FormulaResult<Vec<(Value, Value)>> {
    match operand {
        Operand::Mapping(pairs) => Ok(pairs.clone()),
        Operand::Scalar(Value::String(json)) => {
            let parsed: serde_json::Value = serde_json::from_str(json)
                .map_err(|e| FormulaError::Argument(format!("MAP: mapping is not valid JSON: {}", e)))?;
            let serde_json::Value::Object(object) = parsed else {
                return Err(FormulaError::Argument(
                    "MAP: mapping must be a JSON object".into(),
                ));
            };
            object
                .into_iter()
                .map(|(key, value)| Ok((Value::String(key), json_to_value(value)?)))
                .collect()
        }
        other => Err(FormulaError::Argument(format!(
            "MAP: mapping must be an object literal or a JSON object string, found a {}",
            other.kind_name()
        ))),
    }
}

/// MAP(value, mapping) - Replaces values found among the mapping's keys
///
/// Keys match numerically when both sides are numbers and as text otherwise.
/// Values without a matching key pass through unchanged.
pub fn fn_map<'t>(args: &[Operand<'t>], ctx: &EvaluationContext<'_>) -> FormulaResult<Operand<'t>> {
    let pairs = mapping_pairs(&args[1])?;
    map_unary(&args[0], "MAP", ctx.row_count(), |value| {
        Ok(pairs
            .iter()
            .find(|(key, _)| values_equal(key, value))
            .map_or_else(|| value.clone(), |(_, mapped)| mapped.clone()))
    })
}

/// Bin edges from a list literal or a JSON array string
fn bin_edges(operand: &Operand<'_>) -> FormulaResult<Vec<Number>> {
    let values = match operand {
        Operand::Sequence(values) => values.clone(),
        Operand::Scalar(Value::String(json)) => {
            let parsed: Vec<serde_json::Value> = serde_json::from_str(json).map_err(|e| {
                FormulaError::Argument(format!("BIN: edges must be a list of numbers: {}", e))
            })?;
            parsed
                .into_iter()
                .map(json_to_value)
                .collect::<FormulaResult<Vec<_>>>()?
        }
        other => {
            return Err(FormulaError::Argument(format!(
                "BIN: edges must be a list such as [0, 10, 20], found a {}",
                other.kind_name()
            )))
        }
    };

    let mut edges = Vec::with_capacity(values.len());
    for value in &values {
        let edge = Number::from_value(value, "BIN")?
            .ok_or_else(|| FormulaError::Argument("BIN: edges must be numbers".into()))?;
        edges.push(edge);
    }
    if edges.is_empty() {
        return Err(FormulaError::Argument("BIN: at least one edge is required".into()));
    }
    if edges.windows(2).any(|w| w[0].as_f64() >= w[1].as_f64()) {
        return Err(FormulaError::Argument(
            "BIN: edges must be in strictly ascending order".into(),
        ));
    }
    Ok(edges)
}

/// BIN(value, edges) - Labels each number with the interval it falls in
///
/// Intervals are closed on the left: `[lo, hi)`. Values below the first edge
/// are labelled `<first`, values at or above the last edge `>=last`.
pub fn fn_bin<'t>(args: &[Operand<'t>], ctx: &EvaluationContext<'_>) -> FormulaResult<Operand<'t>> {
    let edges = bin_edges(&args[1])?;
    let last = edges.len() - 1;
    let below = format!("<{}", edges[0]);
    let above = format!(">={}", edges[last]);
    let interior: Vec<String> = edges
        .windows(2)
        .map(|w| format!("[{}, {})", w[0], w[1]))
        .collect();

    map_unary(&args[0], "BIN", ctx.row_count(), |value| {
        let Some(x) = Number::from_value(value, "BIN")? else {
            return Ok(Value::Null);
        };
        let x = x.as_f64();
        let label = match edges.partition_point(|edge| edge.as_f64() <= x) {
            0 => &below,
            i if i > last => &above,
            i => &interior[i - 1],
        };
        Ok(Value::string(label.as_str()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_equal() {
        assert!(values_equal(&Value::Int(1), &Value::Float(1.0)));
        assert!(values_equal(&Value::string("1"), &Value::Int(1)));
        assert!(values_equal(&Value::string("a"), &Value::string("a")));
        assert!(!values_equal(&Value::string("a"), &Value::string("A")));
        assert!(!values_equal(&Value::string("a"), &Value::Null));
    }

    #[test]
    fn test_bin_edges_must_ascend() {
        let edges = Operand::Sequence(vec![Value::Int(10), Value::Int(5)]);
        assert!(matches!(bin_edges(&edges), Err(FormulaError::Argument(_))));

        let repeated = Operand::Sequence(vec![Value::Int(1), Value::Int(1)]);
        assert!(bin_edges(&repeated).is_err());

        let json = Operand::Scalar(Value::string("[0, 2.5, 10]"));
        assert_eq!(bin_edges(&json).unwrap().len(), 3);
    }

    #[test]
    fn test_mapping_from_json() {
        let json = Operand::Scalar(Value::string(r#"{"N": "North", "S": 2}"#));
        let pairs = mapping_pairs(&json).unwrap();
        assert!(pairs.contains(&(Value::string("N"), Value::string("North"))));
        assert!(pairs.contains(&(Value::string("S"), Value::Int(2))));
        assert!(mapping_pairs(&Operand::Scalar(Value::string("[1]"))).is_err());
    }
}
