//! Formula evaluator
//!
//! Walks a validated AST against a table. Column references borrow the
//! table's values; everything computed is owned.

use std::f64::consts;

use ahash::AHashMap;
use duke_frame_core::{Column, Table, Value};
use tracing::trace;

use crate::ast::{BinaryOperator, Constant, FormulaExpr, Keyword, UnaryOperator};
use crate::error::{FormulaError, FormulaResult};
use crate::functions::{FunctionDef, FunctionRegistry};
use crate::number::{apply_arithmetic, Number};
use crate::operand::{map_binary, map_unary, Operand};
use crate::sanitizer::ColumnMapping;

/// Named constants a formula may use
pub const CONSTANTS: &[(&str, f64)] = &[("PI", consts::PI), ("E", consts::E)];

/// Everything one evaluation needs: the bound columns, the row count and a
/// function registry built for this call
pub struct EvaluationContext<'t> {
    columns: AHashMap<String, &'t Column>,
    row_count: usize,
    registry: FunctionRegistry,
}

impl<'t> EvaluationContext<'t> {
    /// Bind the safe identifiers of `mapping` to the table's columns
    pub fn new(table: &'t Table, mapping: &ColumnMapping) -> FormulaResult<Self> {
        let mut columns = AHashMap::with_capacity(mapping.len());
        for (original, safe) in mapping.iter() {
            let column = table
                .column(original)
                .ok_or_else(|| FormulaError::UnknownName(original.to_string()))?;
            columns.insert(safe.to_string(), column);
        }
        Ok(Self {
            columns,
            row_count: table.row_count(),
            registry: FunctionRegistry::new(),
        })
    }

    /// Context with no columns, for constant formulas
    pub fn with_row_count(row_count: usize) -> Self {
        Self {
            columns: AHashMap::new(),
            row_count,
            registry: FunctionRegistry::new(),
        }
    }

    /// Number of rows every column result must have
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Functions available to this evaluation
    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    /// Column bound to a safe identifier
    pub fn column(&self, id: &str) -> Option<&'t Column> {
        self.columns.get(id).copied()
    }
}

/// Evaluate an expression
pub fn evaluate<'t>(expr: &FormulaExpr, ctx: &EvaluationContext<'t>) -> FormulaResult<Operand<'t>> {
    match expr {
        FormulaExpr::Constant(constant) => Ok(Operand::Scalar(constant_value(constant))),

        FormulaExpr::Name(name) => {
            if let Some(column) = ctx.column(name) {
                return Ok(Operand::Column(column.values().into()));
            }
            CONSTANTS
                .iter()
                .find(|(constant, _)| constant == name)
                .map(|&(_, value)| Operand::Scalar(Value::Float(value)))
                .ok_or_else(|| FormulaError::UnknownName(name.clone()))
        }

        FormulaExpr::BinaryOp { op, left, right } => {
            let left = evaluate(left, ctx)?;
            let right = evaluate(right, ctx)?;
            evaluate_binary_op(*op, &left, &right, ctx)
        }

        FormulaExpr::UnaryOp { op, operand } => {
            let operand = evaluate(operand, ctx)?;
            evaluate_unary_op(*op, &operand, ctx)
        }

        FormulaExpr::Call {
            func,
            args,
            keywords,
        } => match func.as_ref() {
            FormulaExpr::Name(name) => evaluate_function(name, args, keywords, ctx),
            other => Err(FormulaError::InvalidCallTarget(other.kind_name().to_string())),
        },

        FormulaExpr::Sequence(items) => {
            let values = items
                .iter()
                .map(|item| literal_element(item, ctx))
                .collect::<FormulaResult<Vec<_>>>()?;
            Ok(Operand::Sequence(values))
        }

        FormulaExpr::Mapping(entries) => {
            let pairs = entries
                .iter()
                .map(|(key, value)| Ok((literal_element(key, ctx)?, literal_element(value, ctx)?)))
                .collect::<FormulaResult<Vec<_>>>()?;
            Ok(Operand::Mapping(pairs))
        }

        FormulaExpr::Attribute { .. }
        | FormulaExpr::Subscript { .. }
        | FormulaExpr::Lambda { .. }
        | FormulaExpr::Comprehension { .. } => {
            Err(FormulaError::DisallowedConstruct(expr.kind_name().to_string()))
        }
    }
}

fn constant_value(constant: &Constant) -> Value {
    match constant {
        Constant::Int(n) => Value::Int(*n),
        Constant::Float(n) => Value::finite(*n),
        Constant::String(s) => Value::String(s.clone()),
        Constant::Boolean(b) => Value::Boolean(*b),
    }
}

/// Elements of list and mapping literals must be single values
fn literal_element(expr: &FormulaExpr, ctx: &EvaluationContext<'_>) -> FormulaResult<Value> {
    match evaluate(expr, ctx)? {
        Operand::Scalar(value) => Ok(value),
        other => Err(FormulaError::Evaluation(format!(
            "list and mapping elements must be single values, found a {}",
            other.kind_name()
        ))),
    }
}

fn evaluate_binary_op<'t>(
    op: BinaryOperator,
    left: &Operand<'_>,
    right: &Operand<'_>,
    ctx: &EvaluationContext<'_>,
) -> FormulaResult<Operand<'t>> {
    map_binary(left, right, op.symbol(), ctx.row_count(), |a, b| {
        apply_arithmetic(op, a, b)
    })
}

fn evaluate_unary_op<'t>(
    op: UnaryOperator,
    operand: &Operand<'_>,
    ctx: &EvaluationContext<'_>,
) -> FormulaResult<Operand<'t>> {
    let symbol = op.symbol();
    map_unary(operand, symbol, ctx.row_count(), |value| {
        let number = Number::from_value(value, symbol)?;
        match op {
            UnaryOperator::Plus => Ok(number.map_or(Value::Null, Number::into_value)),
            UnaryOperator::Negate => Ok(number.map_or(Value::Null, |n| n.neg().into_value())),
            UnaryOperator::Invert | UnaryOperator::Not => {
                Err(FormulaError::DisallowedOperator(symbol.to_string()))
            }
        }
    })
}

/// Bind keyword arguments to parameter positions
///
/// Keywords may fill any slot after the positional arguments; a gap left
/// between them is filled with null.
fn bind_arguments<'a>(
    def: &FunctionDef,
    args: &'a [FormulaExpr],
    keywords: &'a [Keyword],
) -> FormulaResult<Vec<Option<&'a FormulaExpr>>> {
    let mut bound: Vec<Option<&FormulaExpr>> = args.iter().map(Some).collect();

    for keyword in keywords {
        let position = def
            .params
            .iter()
            .position(|param| param.eq_ignore_ascii_case(&keyword.name))
            .filter(|&i| def.max_args.map_or(true, |max| i < max))
            .ok_or_else(|| {
                FormulaError::Argument(format!(
                    "{}() got an unexpected keyword argument '{}'",
                    def.name, keyword.name
                ))
            })?;

        if position < args.len() {
            return Err(FormulaError::Argument(format!(
                "{}() got multiple values for argument '{}'",
                def.name, keyword.name
            )));
        }
        if bound.len() <= position {
            bound.resize(position + 1, None);
        }
        bound[position] = Some(&keyword.value);
    }

    if let Some(missing) = bound.iter().take(def.min_args).position(Option::is_none) {
        return Err(FormulaError::Argument(format!(
            "{}() missing required argument '{}'",
            def.name,
            def.params.get(missing).copied().unwrap_or("value")
        )));
    }

    Ok(bound)
}

fn evaluate_function<'t>(
    name: &str,
    args: &[FormulaExpr],
    keywords: &[Keyword],
    ctx: &EvaluationContext<'t>,
) -> FormulaResult<Operand<'t>> {
    let func = ctx
        .registry()
        .get(name)
        .ok_or_else(|| FormulaError::UnknownFunction(name.to_string()))?;

    let bound = bind_arguments(func, args, keywords)?;
    func.check_arity(bound.len())?;

    // Evaluate arguments
    let mut evaluated_args = Vec::with_capacity(bound.len());
    for arg in bound {
        evaluated_args.push(match arg {
            Some(expr) => evaluate(expr, ctx)?,
            None => Operand::Scalar(Value::Null),
        });
    }

    trace!(function = func.name, args = evaluated_args.len(), "calling function");
    (func.implementation)(&evaluated_args, ctx)
}

/// Turn an evaluation result into exactly `row_count` values
///
/// A single value is repeated on every row. A column or list must already
/// have `row_count` entries. Non-finite floats become null.
pub fn normalize(result: Operand<'_>, row_count: usize) -> FormulaResult<Vec<Value>> {
    let values = match result {
        Operand::Scalar(value) => vec![value; row_count],
        Operand::Column(values) => values.into_owned(),
        Operand::Sequence(values) => values,
        Operand::Mapping(_) => {
            return Err(FormulaError::Evaluation(
                "formula result must be a column or a single value, found a mapping".into(),
            ))
        }
    };
    if values.len() != row_count {
        return Err(FormulaError::ShapeMismatch {
            expected: row_count,
            actual: values.len(),
        });
    }

    Ok(values
        .into_iter()
        .map(|value| match value {
            Value::Float(n) if !n.is_finite() => Value::Null,
            other => other,
        })
        .collect())
}
