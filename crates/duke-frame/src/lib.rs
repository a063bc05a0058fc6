//! # duke-frame
//!
//! Evaluate Excel-style formulas column-wise over tables.
//!
//! Users write expressions such as `ROUND(SUM(Revenue) / SUM(Volume), 2)` or
//! `IF(ISNULL(Price), AVG(Price), Price)` against free-text column names. The
//! expression is sanitized, parsed, checked against an allow-list and then
//! evaluated over whole columns, yielding exactly one value per row.
//!
//! ## Features
//!
//! - Column names with spaces, punctuation or keyword clashes
//! - Arithmetic with integer/float promotion and null propagation
//! - Aggregation, statistics, text, date, lookup and window functions
//! - Untrusted input: no attribute access, subscripting or arbitrary calls
//! - CSV input and output (`csv` feature, on by default)
//!
//! ## Example
//!
//! ```rust
//! use duke_frame::prelude::*;
//!
//! let table = Table::from_columns(vec![
//!     Column::from_values("Sales", [50, 100, 120]),
//!     Column::from_values("Volume", [10, 20, 20]),
//! ])
//! .unwrap();
//!
//! let price = table.evaluate_formula("ROUND(Sales / Volume, 1)").unwrap();
//! assert_eq!(
//!     price.values(),
//!     &[Value::Float(5.0), Value::Float(5.0), Value::Float(6.0)]
//! );
//!
//! let table = table.with_formula_column("Price", "Sales / Volume").unwrap();
//! assert_eq!(table.column_count(), 3);
//! ```

pub mod calculation;
pub mod prelude;

// Re-export calculation types
pub use calculation::TableFormulaExt;

// Re-export core types
pub use duke_frame_core::{parse_datetime, Column, Error, Result, Table, Value};

// Re-export formula types
pub use duke_frame_formula::{
    compile, evaluate, parse_formula, sanitize, validate, ColumnMapping, CompiledFormula,
    ErrorKind, FormulaError, FormulaExpr, FormulaResult, FunctionDef, FunctionRegistry,
};

// Re-export I/O types
#[cfg(feature = "csv")]
pub use duke_frame_csv::{
    CsvError, CsvReadOptions, CsvReader, CsvResult, CsvWriteOptions, CsvWriter, LineTerminator,
};

#[cfg(feature = "csv")]
use std::path::Path;

/// Extension trait for Table to add file I/O
#[cfg(feature = "csv")]
pub trait TableExt: Sized {
    /// Open a table from a CSV file with default options
    fn open<P: AsRef<Path>>(path: P) -> CsvResult<Self>;

    /// Save the table to a CSV file with default options
    fn save<P: AsRef<Path>>(&self, path: P) -> CsvResult<()>;
}

#[cfg(feature = "csv")]
impl TableExt for Table {
    fn open<P: AsRef<Path>>(path: P) -> CsvResult<Table> {
        CsvReader::read_file(path, &CsvReadOptions::default())
    }

    fn save<P: AsRef<Path>>(&self, path: P) -> CsvResult<()> {
        CsvWriter::write_file(self, path, &CsvWriteOptions::default())
    }
}
