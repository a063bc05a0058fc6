//! # duke-frame-core
//!
//! Core data structures for the duke-frame formula engine.
//!
//! This crate provides the fundamental types used throughout duke-frame:
//! - [`Value`] - A single cell value (integer, float, string, boolean, datetime or null)
//! - [`Column`] - A named, ordered sequence of values
//! - [`Table`] - An ordered collection of equally long columns
//!
//! ## Example
//!
//! ```rust
//! use duke_frame_core::{Column, Table, Value};
//!
//! let table = Table::from_columns(vec![
//!     Column::new("Sales", vec![Value::Int(10), Value::Int(20)]),
//!     Column::new("Region", vec!["North".into(), "South".into()]),
//! ])
//! .unwrap();
//!
//! assert_eq!(table.row_count(), 2);
//! assert_eq!(table.column("Sales").unwrap().get(1), Some(&Value::Int(20)));
//! ```

pub mod column;
pub mod datetime;
pub mod error;
pub mod table;
pub mod value;

// Re-exports for convenience
pub use column::Column;
pub use datetime::parse_datetime;
pub use error::{Error, Result};
pub use table::Table;
pub use value::Value;
