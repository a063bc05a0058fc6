//! Error types for duke-frame-core

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building tables
#[derive(Debug, Error)]
pub enum Error {
    /// Column name is empty or whitespace only
    #[error("Column name must not be blank")]
    BlankColumnName,

    /// A column with the same name already exists
    #[error("Column already exists: {0}")]
    DuplicateColumn(String),

    /// Column length differs from the table's row count
    #[error("Column '{column}' has {actual} rows, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    /// Column not found by name
    #[error("Column not found: {0}")]
    ColumnNotFound(String),
}
