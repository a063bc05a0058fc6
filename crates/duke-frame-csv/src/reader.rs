//! CSV reader

use std::fs::File;
use std::io::Read;
use std::path::Path;

use duke_frame_core::{parse_datetime, Column, Table, Value};
use tracing::debug;

use crate::error::CsvResult;
use crate::options::CsvReadOptions;

/// CSV file reader
pub struct CsvReader;

impl CsvReader {
    /// Read CSV file into a table
    pub fn read_file<P: AsRef<Path>>(path: P, options: &CsvReadOptions) -> CsvResult<Table> {
        let file = File::open(path)?;
        Self::read(file, options)
    }

    /// Read CSV from a reader into a table
    pub fn read<R: Read>(reader: R, options: &CsvReadOptions) -> CsvResult<Table> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(options.delimiter)
            .quote(options.quote)
            .has_headers(options.has_header)
            .from_reader(reader);

        let mut names: Vec<String> = Vec::new();
        if options.has_header {
            names = csv_reader
                .headers()?
                .iter()
                .enumerate()
                .map(|(i, name)| {
                    let name = name.trim();
                    if name.is_empty() {
                        default_name(i)
                    } else {
                        name.to_string()
                    }
                })
                .collect();
        }

        // Read records column-wise
        let mut columns: Vec<Vec<Value>> = vec![Vec::new(); names.len()];
        let mut row_count = 0;
        for result in csv_reader.records() {
            let record = result?;
            if columns.len() < record.len() {
                columns.resize(record.len(), Vec::new());
            }

            for (col, field) in record.iter().enumerate() {
                let value = if options.auto_detect_types {
                    Self::detect_type(field)
                } else if field.is_empty() {
                    Value::Null
                } else {
                    Value::string(field)
                };
                columns[col].push(value);
            }
            row_count += 1;
        }

        while names.len() < columns.len() {
            names.push(default_name(names.len()));
        }

        let mut table = Table::with_row_count(row_count);
        for (name, values) in names.into_iter().zip(columns) {
            table.push_column(Column::new(name, values))?;
        }

        debug!(
            rows = table.row_count(),
            columns = table.column_count(),
            "read CSV table"
        );
        Ok(table)
    }

    /// Detect the type of a field value
    ///
    /// Tried in order: empty, boolean, integer, float, date/datetime, text.
    pub fn detect_type(field: &str) -> Value {
        let trimmed = field.trim();

        if trimmed.is_empty() {
            return Value::Null;
        }

        // Try boolean
        if trimmed.eq_ignore_ascii_case("true") {
            return Value::Boolean(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return Value::Boolean(false);
        }

        // Try number
        if let Ok(n) = trimmed.parse::<i64>() {
            return Value::Int(n);
        }
        if let Ok(n) = trimmed.parse::<f64>() {
            if n.is_finite() {
                return Value::Float(n);
            }
        }

        // Try date
        if let Some(dt) = parse_datetime(trimmed) {
            return Value::DateTime(dt);
        }

        // Default to string, as written
        Value::string(field)
    }
}

fn default_name(index: usize) -> String {
    format!("column_{}", index + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_detect_type() {
        assert_eq!(CsvReader::detect_type(""), Value::Null);
        assert_eq!(CsvReader::detect_type("  "), Value::Null);
        assert_eq!(CsvReader::detect_type("TRUE"), Value::Boolean(true));
        assert_eq!(CsvReader::detect_type("false"), Value::Boolean(false));
        assert_eq!(CsvReader::detect_type("42"), Value::Int(42));
        assert_eq!(CsvReader::detect_type("-1.5"), Value::Float(-1.5));
        assert_eq!(CsvReader::detect_type("NaN"), Value::string("NaN"));
        assert!(matches!(CsvReader::detect_type("2024-01-15"), Value::DateTime(_)));
        assert_eq!(CsvReader::detect_type("North"), Value::string("North"));
    }

    #[test]
    fn test_read_with_header() {
        let data = "Sales,Region\n10,North\n20.5,\n";
        let table = CsvReader::read(data.as_bytes(), &CsvReadOptions::default()).unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column_names().collect::<Vec<_>>(), vec!["Sales", "Region"]);
        assert_eq!(
            table.column("Sales").unwrap().values(),
            &[Value::Int(10), Value::Float(20.5)]
        );
        assert_eq!(
            table.column("Region").unwrap().values(),
            &[Value::string("North"), Value::Null]
        );
    }

    #[test]
    fn test_read_without_header() {
        let options = CsvReadOptions {
            has_header: false,
            ..Default::default()
        };
        let table = CsvReader::read("1,a\n2,b\n".as_bytes(), &options).unwrap();
        assert_eq!(
            table.column_names().collect::<Vec<_>>(),
            vec!["column_1", "column_2"]
        );
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn test_blank_header_gets_default_name() {
        let table = CsvReader::read(",b\n1,2\n".as_bytes(), &CsvReadOptions::default()).unwrap();
        assert_eq!(table.column_names().collect::<Vec<_>>(), vec!["column_1", "b"]);
    }

    #[test]
    fn test_header_only() {
        let table = CsvReader::read("a,b\n".as_bytes(), &CsvReadOptions::default()).unwrap();
        assert_eq!(table.column_count(), 2);
        assert_eq!(table.row_count(), 0);
    }

    #[test]
    fn test_duplicate_header_is_an_error() {
        let err = CsvReader::read("a,a\n1,2\n".as_bytes(), &CsvReadOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            crate::CsvError::Table(duke_frame_core::Error::DuplicateColumn(_))
        ));
    }

    #[test]
    fn test_ragged_rows_are_an_error() {
        let err = CsvReader::read("a,b\n1\n".as_bytes(), &CsvReadOptions::default()).unwrap_err();
        assert!(matches!(err, crate::CsvError::Csv(_)));
    }
}
