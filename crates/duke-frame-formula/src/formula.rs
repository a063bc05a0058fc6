//! Compile-then-evaluate pipeline
//!
//! sanitize → parse → validate happens once per expression; the compiled
//! formula can then be evaluated against any table that has the referenced
//! columns.

use ahash::AHashSet;
use duke_frame_core::{Column, Table};
use tracing::debug;

use crate::ast::FormulaExpr;
use crate::error::FormulaResult;
use crate::evaluator::{self, normalize, EvaluationContext, CONSTANTS};
use crate::functions::FunctionRegistry;
use crate::parser::parse_formula;
use crate::sanitizer::{sanitize, ColumnMapping};
use crate::validator::validate;

/// A parsed and validated formula
#[derive(Debug, Clone)]
pub struct CompiledFormula {
    expression: String,
    sanitized: String,
    mapping: ColumnMapping,
    ast: FormulaExpr,
}

/// Sanitize, parse and validate an expression against a set of column names
pub fn compile<'a, I>(expression: &str, column_names: I) -> FormulaResult<CompiledFormula>
where
    I: IntoIterator<Item = &'a str>,
{
    let (sanitized, mapping) = sanitize(expression, column_names)?;
    debug!(
        expression,
        sanitized = %sanitized,
        columns = mapping.len(),
        "sanitized formula"
    );

    let ast = parse_formula(&sanitized)?;

    let allowed_names: AHashSet<String> = mapping
        .safe_identifiers()
        .map(str::to_string)
        .chain(CONSTANTS.iter().map(|(name, _)| name.to_string()))
        .collect();
    validate(&ast, &allowed_names, &FunctionRegistry::new().function_names())?;
    debug!(expression, "formula validated");

    Ok(CompiledFormula {
        expression: expression.to_string(),
        sanitized,
        mapping,
        ast,
    })
}

/// Compile `expression` against `table` and evaluate it
///
/// # Example
/// ```rust
/// use duke_frame_core::{Column, Table, Value};
/// use duke_frame_formula::evaluate;
///
/// let table = Table::from_columns(vec![
///     Column::from_values("Unit Price", [2.5, 4.0]),
///     Column::from_values("Qty", [4, 2]),
/// ])
/// .unwrap();
///
/// let total = evaluate("Unit Price * Qty", &table).unwrap();
/// assert_eq!(total.values(), &[Value::Float(10.0), Value::Float(8.0)]);
/// ```
pub fn evaluate(expression: &str, table: &Table) -> FormulaResult<Column> {
    compile(expression, table.column_names())?.evaluate(table)
}

impl CompiledFormula {
    /// The expression as written
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// The expression with column names replaced by safe identifiers
    pub fn sanitized(&self) -> &str {
        &self.sanitized
    }

    /// Column names referenced by the formula and their safe identifiers
    pub fn mapping(&self) -> &ColumnMapping {
        &self.mapping
    }

    /// Validated syntax tree
    pub fn ast(&self) -> &FormulaExpr {
        &self.ast
    }

    /// Referenced column names, in order of first use
    pub fn referenced_columns(&self) -> impl Iterator<Item = &str> + '_ {
        self.mapping.iter().map(|(original, _)| original)
    }

    /// Evaluate against a table, producing one value per row
    ///
    /// The resulting column is named after the trimmed expression.
    pub fn evaluate(&self, table: &Table) -> FormulaResult<Column> {
        let ctx = EvaluationContext::new(table, &self.mapping)?;
        debug!(
            expression = %self.expression,
            rows = table.row_count(),
            "evaluating formula"
        );

        let result = evaluator::evaluate(&self.ast, &ctx)?;
        let values = normalize(result, table.row_count())?;
        Ok(Column::new(self.expression.trim(), values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FormulaError;
    use duke_frame_core::Value;
    use pretty_assertions::assert_eq;

    fn table() -> Table {
        Table::from_columns(vec![
            Column::from_values("Revenue", [100, 200]),
            Column::from_values("Revenue Growth", [0.1, 0.2]),
        ])
        .unwrap()
    }

    #[test]
    fn test_compile_records_mapping() {
        let formula = compile("Revenue * (1 + Revenue Growth)", ["Revenue", "Revenue Growth"]).unwrap();
        assert_eq!(formula.sanitized(), "Revenue * (1 + Revenue_Growth)");
        assert_eq!(
            formula.referenced_columns().collect::<Vec<_>>(),
            vec!["Revenue", "Revenue Growth"]
        );
    }

    #[test]
    fn test_evaluate_names_result_after_expression() {
        let column = evaluate("  Revenue * 2 ", &table()).unwrap();
        assert_eq!(column.name(), "Revenue * 2");
        assert_eq!(column.values(), &[Value::Int(200), Value::Int(400)]);
    }

    #[test]
    fn test_compiled_formula_needs_its_columns() {
        let formula = compile("Revenue + 1", ["Revenue"]).unwrap();
        let other = Table::from_columns(vec![Column::from_values("Cost", [1])]).unwrap();
        assert!(matches!(
            formula.evaluate(&other),
            Err(FormulaError::UnknownName(name)) if name == "Revenue"
        ));
    }

    #[test]
    fn test_errors_by_stage() {
        let table = table();
        assert!(evaluate("Revenue +", &table).unwrap_err().is_syntax());
        assert!(evaluate("Cost + 1", &table).unwrap_err().is_security());
        assert!(evaluate("SUBSTR(Revenue, 0)", &table).unwrap_err().is_evaluation());
    }
}
