//! Table type

use ahash::AHashMap;

use crate::column::Column;
use crate::error::{Error, Result};
use crate::value::Value;

/// An ordered collection of named columns sharing one row count
///
/// Column names are unique and never blank. A table with no columns still
/// carries a row count, so constant formulas can be evaluated against it.
#[derive(Debug, Clone, Default)]
pub struct Table {
    columns: Vec<Column>,
    index: AHashMap<String, usize>,
    row_count: usize,
}

impl Table {
    /// Create an empty table with no rows
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table with `row_count` rows and no columns
    pub fn with_row_count(row_count: usize) -> Self {
        Self {
            row_count,
            ..Self::default()
        }
    }

    /// Build a table from columns
    ///
    /// The first column fixes the row count; every other column must match it.
    pub fn from_columns(columns: Vec<Column>) -> Result<Self> {
        let mut table = Self::with_row_count(columns.first().map_or(0, Column::len));
        for column in columns {
            table.push_column(column)?;
        }
        Ok(table)
    }

    /// Append a column
    pub fn push_column(&mut self, column: Column) -> Result<()> {
        if column.name().trim().is_empty() {
            return Err(Error::BlankColumnName);
        }
        if self.index.contains_key(column.name()) {
            return Err(Error::DuplicateColumn(column.name().to_string()));
        }
        if self.columns.is_empty() && self.row_count == 0 {
            self.row_count = column.len();
        }
        if column.len() != self.row_count {
            return Err(Error::LengthMismatch {
                column: column.name().to_string(),
                expected: self.row_count,
                actual: column.len(),
            });
        }

        self.index
            .insert(column.name().to_string(), self.columns.len());
        self.columns.push(column);
        Ok(())
    }

    /// Look up a column by name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.index.get(name).map(|&i| &self.columns[i])
    }

    /// Look up a column by name, failing if it does not exist
    pub fn require_column(&self, name: &str) -> Result<&Column> {
        self.column(name)
            .ok_or_else(|| Error::ColumnNotFound(name.to_string()))
    }

    /// Column at a position (0-based)
    pub fn column_at(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    /// All columns in order
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column names in order
    pub fn column_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.columns.iter().map(Column::name)
    }

    /// Number of rows
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Check if the table has no rows
    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// Values of one row, in column order
    pub fn row(&self, row: usize) -> Option<Vec<&Value>> {
        if row >= self.row_count {
            return None;
        }
        Some(self.columns.iter().map(|c| &c.values()[row]).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Table {
        Table::from_columns(vec![
            Column::from_values("Sales", [10, 20, 30]),
            Column::from_values("Region", ["N", "S", "E"]),
        ])
        .unwrap()
    }

    #[test]
    fn test_from_columns() {
        let table = sample();
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.column_count(), 2);
        assert_eq!(table.column_names().collect::<Vec<_>>(), vec!["Sales", "Region"]);
        assert_eq!(table.column("Region").unwrap().get(0), Some(&Value::string("N")));
        assert!(table.column("Missing").is_none());
    }

    #[test]
    fn test_row() {
        let table = sample();
        assert_eq!(
            table.row(1),
            Some(vec![&Value::Int(20), &Value::string("S")])
        );
        assert_eq!(table.row(3), None);
    }

    #[test]
    fn test_rejects_duplicate_column() {
        let mut table = sample();
        let err = table
            .push_column(Column::from_values("Sales", [1, 2, 3]))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateColumn(name) if name == "Sales"));
    }

    #[test]
    fn test_rejects_blank_name() {
        let mut table = sample();
        let err = table
            .push_column(Column::from_values("  ", [1, 2, 3]))
            .unwrap_err();
        assert!(matches!(err, Error::BlankColumnName));
    }

    #[test]
    fn test_rejects_length_mismatch() {
        let err = Table::from_columns(vec![
            Column::from_values("a", [1, 2]),
            Column::from_values("b", [1]),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            Error::LengthMismatch {
                expected: 2,
                actual: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_with_row_count() {
        let mut table = Table::with_row_count(4);
        assert_eq!(table.row_count(), 4);
        assert!(table.push_column(Column::from_values("a", [1])).is_err());
        assert!(table.push_column(Column::from_values("a", [1, 2, 3, 4])).is_ok());
    }

    #[test]
    fn test_require_column() {
        let table = sample();
        assert!(table.require_column("Sales").is_ok());
        assert!(matches!(
            table.require_column("Nope"),
            Err(Error::ColumnNotFound(_))
        ));
    }
}
