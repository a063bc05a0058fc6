//! Formula error types

use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// The three failure classes a caller can tell apart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The expression text cannot be parsed
    Syntax,
    /// The expression uses a construct outside the allow-list
    Security,
    /// Evaluation failed on types, shapes or argument domains
    Evaluation,
}

/// Errors that can occur during formula compilation or evaluation
#[derive(Debug, Error)]
pub enum FormulaError {
    /// Formula parse error
    #[error("Syntax error at offset {offset}: {message}")]
    Syntax { message: String, offset: usize },

    /// Identifier that is neither a column nor a constant
    #[error("Unknown name: {0}")]
    UnknownName(String),

    /// Call to a function outside the registry
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// Operator outside the allowed arithmetic set
    #[error("Operator not allowed: {0}")]
    DisallowedOperator(String),

    /// Syntax node that is never evaluated (attribute access, subscript, lambda, ...)
    #[error("Construct not allowed: {0}")]
    DisallowedConstruct(String),

    /// Call whose callee is not a bare function name
    #[error("Only named functions can be called, found a call through {0}")]
    InvalidCallTarget(String),

    /// Formula evaluation error
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    Argument(String),

    /// Wrong number of arguments
    #[error("Wrong number of arguments for {function}: expected {expected}, got {actual}")]
    ArgumentCount {
        function: String,
        expected: String,
        actual: usize,
    },

    /// Operand type the operation cannot work with
    #[error("Unsupported operand type for {operation}: {type_name}")]
    TypeMismatch {
        operation: String,
        type_name: String,
    },

    /// Result length differs from the table's row count
    #[error("Result has {actual} rows, expected {expected}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// Error from the table model
    #[error("Table error: {0}")]
    Table(#[from] duke_frame_core::Error),
}

impl FormulaError {
    /// Create a syntax error at a byte offset of the parsed text
    pub fn syntax<S: Into<String>>(message: S, offset: usize) -> Self {
        FormulaError::Syntax {
            message: message.into(),
            offset,
        }
    }

    /// Create a type mismatch error
    pub fn type_mismatch(operation: &str, type_name: &str) -> Self {
        FormulaError::TypeMismatch {
            operation: operation.to_string(),
            type_name: type_name.to_string(),
        }
    }

    /// Which of the three failure classes this error belongs to
    pub fn kind(&self) -> ErrorKind {
        match self {
            FormulaError::Syntax { .. } => ErrorKind::Syntax,
            FormulaError::UnknownName(_)
            | FormulaError::UnknownFunction(_)
            | FormulaError::DisallowedOperator(_)
            | FormulaError::DisallowedConstruct(_)
            | FormulaError::InvalidCallTarget(_) => ErrorKind::Security,
            FormulaError::Evaluation(_)
            | FormulaError::Argument(_)
            | FormulaError::ArgumentCount { .. }
            | FormulaError::TypeMismatch { .. }
            | FormulaError::ShapeMismatch { .. }
            | FormulaError::Table(_) => ErrorKind::Evaluation,
        }
    }

    /// Check if this is a syntax error
    pub fn is_syntax(&self) -> bool {
        self.kind() == ErrorKind::Syntax
    }

    /// Check if this is a security (allow-list) error
    pub fn is_security(&self) -> bool {
        self.kind() == ErrorKind::Security
    }

    /// Check if this is an evaluation error
    pub fn is_evaluation(&self) -> bool {
        self.kind() == ErrorKind::Evaluation
    }
}
