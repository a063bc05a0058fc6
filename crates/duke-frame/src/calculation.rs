//! Table-level formula evaluation
//!
//! Adds formula methods to [`Table`]. Evaluation never touches the source
//! table; methods that add columns return a new table.
//!
//! # Example
//!
//! ```rust
//! use duke_frame::prelude::*;
//!
//! let table = Table::from_columns(vec![
//!     Column::from_values("Revenue", [100, 200]),
//!     Column::from_values("Cost", [60, 150]),
//! ])
//! .unwrap();
//!
//! let table = table
//!     .with_formula_columns([
//!         ("Margin", "Revenue - Cost"),
//!         ("Margin %", "ROUND(Margin / Revenue * 100, 1)"),
//!     ])
//!     .unwrap();
//!
//! assert_eq!(
//!     table.column("Margin %").unwrap().values(),
//!     &[Value::Float(40.0), Value::Float(25.0)]
//! );
//! ```

use tracing::debug;

use crate::{compile, CompiledFormula, Column, FormulaResult, Table};

/// Extension trait for Table to add formula methods
pub trait TableFormulaExt {
    /// Compile an expression against this table's column names
    fn compile_formula(&self, expression: &str) -> FormulaResult<CompiledFormula>;

    /// Evaluate an expression, producing one value per row
    ///
    /// The column is named after the trimmed expression.
    fn evaluate_formula(&self, expression: &str) -> FormulaResult<Column>;

    /// Copy of the table with the formula result appended as `name`
    fn with_formula_column(&self, name: &str, expression: &str) -> FormulaResult<Table>;

    /// Copy of the table with several formula columns appended in order
    ///
    /// Each formula can refer to the columns added before it.
    fn with_formula_columns<'a, I>(&self, formulas: I) -> FormulaResult<Table>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>;
}

impl TableFormulaExt for Table {
    fn compile_formula(&self, expression: &str) -> FormulaResult<CompiledFormula> {
        compile(expression, self.column_names())
    }

    fn evaluate_formula(&self, expression: &str) -> FormulaResult<Column> {
        self.compile_formula(expression)?.evaluate(self)
    }

    fn with_formula_column(&self, name: &str, expression: &str) -> FormulaResult<Table> {
        self.with_formula_columns([(name, expression)])
    }

    fn with_formula_columns<'a, I>(&self, formulas: I) -> FormulaResult<Table>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut table = self.clone();
        for (name, expression) in formulas {
            let column = table.evaluate_formula(expression)?.with_name(name);
            debug!(column = name, expression, "adding formula column");
            table.push_column(column)?;
        }
        Ok(table)
    }
}
