//! Intermediate values flowing through evaluation

use std::borrow::Cow;

use duke_frame_core::Value;

use crate::error::{FormulaError, FormulaResult};

/// A value produced while evaluating a formula
///
/// Column references borrow the table's values; computed columns own theirs.
/// Lists and mappings only come from literals and are only meaningful as
/// function arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand<'t> {
    /// A single value that broadcasts against columns
    Scalar(Value),
    /// One value per table row
    Column(Cow<'t, [Value]>),
    /// List literal
    Sequence(Vec<Value>),
    /// Mapping literal, in source order
    Mapping(Vec<(Value, Value)>),
}

/// Row-wise view of a scalar or column operand
#[derive(Debug, Clone, Copy)]
pub enum Elements<'a> {
    Scalar(&'a Value),
    Column(&'a [Value]),
}

impl<'a> Elements<'a> {
    /// Value at a row; a scalar is the same in every row
    pub fn get(&self, row: usize) -> &'a Value {
        match *self {
            Elements::Scalar(value) => value,
            Elements::Column(values) => &values[row],
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Elements::Scalar(_))
    }
}

impl<'t> Operand<'t> {
    /// Build an owned column operand
    pub fn column(values: Vec<Value>) -> Self {
        Operand::Column(Cow::Owned(values))
    }

    /// Short name for error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Operand::Scalar(_) => "scalar",
            Operand::Column(_) => "column",
            Operand::Sequence(_) => "list",
            Operand::Mapping(_) => "mapping",
        }
    }

    /// The value, if this is a scalar
    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            Operand::Scalar(value) => Some(value),
            _ => None,
        }
    }

    /// Row-wise view; lists and mappings have no rows
    pub fn elements(&self, operation: &str) -> FormulaResult<Elements<'_>> {
        match self {
            Operand::Scalar(value) => Ok(Elements::Scalar(value)),
            Operand::Column(values) => Ok(Elements::Column(values)),
            Operand::Sequence(_) | Operand::Mapping(_) => {
                Err(FormulaError::type_mismatch(operation, self.kind_name()))
            }
        }
    }

    /// Values as a full column of `len` rows, broadcasting a scalar
    pub fn to_column(&self, operation: &str, len: usize) -> FormulaResult<Cow<'_, [Value]>> {
        match self.elements(operation)? {
            Elements::Scalar(value) => Ok(Cow::Owned(vec![value.clone(); len])),
            Elements::Column(values) => {
                check_len(values, len)?;
                Ok(Cow::Borrowed(values))
            }
        }
    }

    /// Every value the operand holds, for whole-input aggregation
    pub fn values(&self, operation: &str) -> FormulaResult<&[Value]> {
        match self {
            Operand::Scalar(value) => Ok(std::slice::from_ref(value)),
            Operand::Column(values) => Ok(values),
            Operand::Sequence(values) => Ok(values),
            Operand::Mapping(_) => Err(FormulaError::type_mismatch(operation, "mapping")),
        }
    }
}

fn check_len(values: &[Value], len: usize) -> FormulaResult<()> {
    if values.len() != len {
        return Err(FormulaError::ShapeMismatch {
            expected: len,
            actual: values.len(),
        });
    }
    Ok(())
}

/// Apply `f` row by row across any number of scalar or column operands
///
/// When every operand is a scalar the result is a scalar; otherwise scalars
/// broadcast and the result is a column of `len` rows.
pub fn map_nary<'t, F>(
    operands: &[&Operand<'_>],
    operation: &str,
    len: usize,
    mut f: F,
) -> FormulaResult<Operand<'t>>
where
    F: FnMut(&[&Value]) -> FormulaResult<Value>,
{
    let elements = operands
        .iter()
        .map(|operand| operand.elements(operation))
        .collect::<FormulaResult<Vec<_>>>()?;
    for element in &elements {
        if let Elements::Column(values) = element {
            check_len(values, len)?;
        }
    }

    let mut row: Vec<&Value> = Vec::with_capacity(elements.len());
    if elements.iter().all(Elements::is_scalar) {
        row.extend(elements.iter().map(|e| e.get(0)));
        return Ok(Operand::Scalar(f(&row)?));
    }

    let mut out = Vec::with_capacity(len);
    for i in 0..len {
        row.clear();
        row.extend(elements.iter().map(|e| e.get(i)));
        out.push(f(&row)?);
    }
    Ok(Operand::column(out))
}

/// Row-wise map of one operand
pub fn map_unary<'t, F>(operand: &Operand<'_>, operation: &str, len: usize, mut f: F) -> FormulaResult<Operand<'t>>
where
    F: FnMut(&Value) -> FormulaResult<Value>,
{
    map_nary(&[operand], operation, len, |row| f(row[0]))
}

/// Row-wise map of two operands
pub fn map_binary<'t, F>(
    left: &Operand<'_>,
    right: &Operand<'_>,
    operation: &str,
    len: usize,
    mut f: F,
) -> FormulaResult<Operand<'t>>
where
    F: FnMut(&Value, &Value) -> FormulaResult<Value>,
{
    map_nary(&[left, right], operation, len, |row| f(row[0], row[1]))
}
