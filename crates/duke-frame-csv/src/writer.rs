//! CSV writer

use std::fs::File;
use std::io::Write;
use std::path::Path;

use duke_frame_core::Table;

use crate::error::CsvResult;
use crate::options::{CsvWriteOptions, LineTerminator};

/// CSV file writer
pub struct CsvWriter;

impl CsvWriter {
    /// Write a table to a CSV file
    pub fn write_file<P: AsRef<Path>>(
        table: &Table,
        path: P,
        options: &CsvWriteOptions,
    ) -> CsvResult<()> {
        let file = File::create(path)?;
        Self::write(table, file, options)
    }

    /// Write a table to a writer
    ///
    /// Nulls are written as empty fields.
    pub fn write<W: Write>(table: &Table, writer: W, options: &CsvWriteOptions) -> CsvResult<()> {
        let terminator = match options.line_terminator {
            LineTerminator::LF => csv::Terminator::Any(b'\n'),
            LineTerminator::CRLF => csv::Terminator::CRLF,
        };

        let mut csv_writer = csv::WriterBuilder::new()
            .delimiter(options.delimiter)
            .quote(options.quote)
            .terminator(terminator)
            .from_writer(writer);

        if options.write_header && table.column_count() > 0 {
            csv_writer.write_record(table.column_names())?;
        }

        let mut record = Vec::with_capacity(table.column_count());
        for row in 0..table.row_count() {
            record.clear();
            for column in table.columns() {
                record.push(column.values()[row].to_string());
            }
            csv_writer.write_record(&record)?;
        }

        csv_writer.flush()?;
        Ok(())
    }
}
