//! # duke-frame-formula
//!
//! Column-wise formula engine for duke-frame tables.
//!
//! This crate provides:
//! - Column-name sanitizing (free-text names → safe identifiers)
//! - Formula parsing (text → AST)
//! - Allow-list validation of the AST
//! - Built-in functions (aggregation, statistics, text, dates, windows)
//! - Evaluation to exactly one value per table row
//!
//! ## Example
//!
//! ```rust
//! use duke_frame_core::{Column, Table, Value};
//! use duke_frame_formula::evaluate;
//!
//! let table = Table::from_columns(vec![
//!     Column::from_values("Sales", [10, 20, 30]),
//!     Column::from_values("Cost ($)", [4, 5, 6]),
//! ])
//! .unwrap();
//!
//! let margin = evaluate("Sales - Cost ($)", &table).unwrap();
//! assert_eq!(margin.values(), &[Value::Int(6), Value::Int(15), Value::Int(24)]);
//! ```

pub mod ast;
pub mod error;
pub mod evaluator;
pub mod formula;
pub mod functions;
pub mod number;
pub mod operand;
pub mod parser;
pub mod sanitizer;
pub mod validator;

pub use ast::{BinaryOperator, Constant, FormulaExpr, Keyword, UnaryOperator};
pub use error::{ErrorKind, FormulaError, FormulaResult};
pub use evaluator::{normalize, EvaluationContext};
pub use formula::{compile, evaluate, CompiledFormula};
pub use functions::{FunctionDef, FunctionRegistry};
pub use operand::Operand;
pub use parser::parse_formula;
pub use sanitizer::{sanitize, ColumnMapping};
pub use validator::validate;
