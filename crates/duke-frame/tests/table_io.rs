//! CSV files in, formula columns out

#![cfg(feature = "csv")]

use duke_frame::prelude::*;
use duke_frame::CsvError;
use pretty_assertions::assert_eq;

#[test]
fn open_add_formula_column_and_save() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("sales.csv");
    std::fs::write(
        &input,
        "Region,Unit Price,Qty\nNorth,2.5,4\nSouth,10,\nEast,1.5,2\n",
    )
    .unwrap();

    let table = Table::open(&input).unwrap();
    assert_eq!(table.row_count(), 3);

    let table = table
        .with_formula_column("Total", "Unit Price * Qty")
        .unwrap();
    let output = dir.path().join("totals.csv");
    table.save(&output).unwrap();

    let written = std::fs::read_to_string(&output).unwrap();
    assert_eq!(
        written,
        "Region,Unit Price,Qty,Total\nNorth,2.5,4,10\nSouth,10,,\nEast,1.5,2,3\n"
    );

    let reread = Table::open(&output).unwrap();
    assert_eq!(
        reread.column("Total").unwrap().values(),
        &[Value::Int(10), Value::Null, Value::Int(3)]
    );
}

#[test]
fn open_missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Table::open(dir.path().join("absent.csv")).unwrap_err();
    assert!(matches!(err, CsvError::Io(_)), "{}", err);
}
