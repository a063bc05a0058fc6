//! Prelude module - common imports for duke-frame users
//!
//! ```rust
//! use duke_frame::prelude::*;
//! ```

pub use crate::{
    Column,
    CompiledFormula,
    // Error types
    ErrorKind,
    FormulaError,
    FormulaResult,
    // Main types
    Table,
    // Extension traits
    TableFormulaExt,
    Value,
};

#[cfg(feature = "csv")]
pub use crate::{CsvReadOptions, CsvReader, CsvWriteOptions, CsvWriter, TableExt};
