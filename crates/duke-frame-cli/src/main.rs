//! Duke Frame CLI - evaluate formulas over CSV files

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use duke_frame::prelude::*;
use duke_frame::{compile, FunctionRegistry, LineTerminator};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "duke-frame")]
#[command(
    author,
    version,
    about = "Evaluate Excel-style formulas column-wise over CSV files"
)]
struct Cli {
    /// More logging (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a formula and write the table with the result column as CSV
    #[command(alias = "e")]
    Eval {
        /// Input CSV file
        input: PathBuf,

        /// Formula, e.g. "ROUND(Sales / Volume, 2)"
        formula: String,

        /// Name of the result column (default: the formula text)
        #[arg(short, long)]
        name: Option<String>,

        /// Output CSV file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write only the result column
        #[arg(long)]
        only: bool,

        #[command(flatten)]
        csv: CsvArgs,
    },

    /// Check that a formula compiles against a set of column names
    Check {
        /// Formula to check
        formula: String,

        /// CSV file whose header supplies the column names
        #[arg(short, long, conflicts_with = "columns")]
        input: Option<PathBuf>,

        /// Column names, comma separated
        #[arg(short, long, value_delimiter = ',')]
        columns: Vec<String>,

        #[command(flatten)]
        csv: CsvArgs,
    },

    /// List the columns of a CSV file with their detected types
    Columns {
        /// Input CSV file
        input: PathBuf,

        #[command(flatten)]
        csv: CsvArgs,
    },

    /// List the built-in functions
    Functions,
}

#[derive(clap::Args)]
struct CsvArgs {
    /// Field delimiter
    #[arg(short, long, default_value = ",")]
    delimiter: char,

    /// The first row holds data, not column names
    #[arg(long)]
    no_header: bool,

    /// Read every field as text
    #[arg(long)]
    raw: bool,

    /// Write CRLF line endings
    #[arg(long)]
    crlf: bool,
}

impl CsvArgs {
    fn delimiter(&self) -> Result<u8> {
        u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .with_context(|| format!("Delimiter must be an ASCII character, got '{}'", self.delimiter))
    }

    fn read_options(&self) -> Result<CsvReadOptions> {
        Ok(CsvReadOptions {
            delimiter: self.delimiter()?,
            has_header: !self.no_header,
            auto_detect_types: !self.raw,
            ..Default::default()
        })
    }

    fn write_options(&self) -> Result<CsvWriteOptions> {
        Ok(CsvWriteOptions {
            delimiter: self.delimiter()?,
            line_terminator: if self.crlf {
                LineTerminator::CRLF
            } else {
                LineTerminator::LF
            },
            ..Default::default()
        })
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Eval {
            input,
            formula,
            name,
            output,
            only,
            csv,
        } => eval(&input, &formula, name.as_deref(), output.as_deref(), only, &csv),
        Commands::Check {
            formula,
            input,
            columns,
            csv,
        } => check(&formula, input.as_deref(), &columns, &csv),
        Commands::Columns { input, csv } => list_columns(&input, &csv),
        Commands::Functions => list_functions(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::from(exit_code(&err))
        }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

/// Exit status by failure class: 2 syntax, 3 security, 4 evaluation, 1 anything else
fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<FormulaError>().map(FormulaError::kind) {
        Some(ErrorKind::Syntax) => 2,
        Some(ErrorKind::Security) => 3,
        Some(ErrorKind::Evaluation) => 4,
        None => 1,
    }
}

fn read_table(input: &Path, csv: &CsvArgs) -> Result<Table> {
    let table = CsvReader::read_file(input, &csv.read_options()?)
        .with_context(|| format!("Failed to read '{}'", input.display()))?;
    debug!(
        path = %input.display(),
        rows = table.row_count(),
        columns = table.column_count(),
        "loaded table"
    );
    Ok(table)
}

fn eval(
    input: &Path,
    formula: &str,
    name: Option<&str>,
    output: Option<&Path>,
    only: bool,
    csv: &CsvArgs,
) -> Result<()> {
    let table = read_table(input, csv)?;

    let mut column = table.evaluate_formula(formula)?;
    if let Some(name) = name {
        column = column.with_name(name);
    }
    let result = if only {
        Table::from_columns(vec![column])?
    } else {
        let mut result = table;
        result.push_column(column)?;
        result
    };

    let options = csv.write_options()?;
    if let Some(output_path) = output {
        CsvWriter::write_file(&result, output_path, &options)
            .with_context(|| format!("Failed to write '{}'", output_path.display()))?;
        eprintln!(
            "Wrote {} rows to '{}'",
            result.row_count(),
            output_path.display()
        );
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        CsvWriter::write(&result, &mut handle, &options).context("Failed to write to stdout")?;
        handle.flush().context("Failed to write to stdout")?;
    }

    Ok(())
}

fn check(formula: &str, input: Option<&Path>, columns: &[String], csv: &CsvArgs) -> Result<()> {
    let names: Vec<String> = match input {
        Some(path) => read_table(path, csv)?
            .column_names()
            .map(str::to_string)
            .collect(),
        None => columns.iter().map(|c| c.trim().to_string()).collect(),
    };

    let compiled = compile(formula, names.iter().map(String::as_str))?;

    println!("Formula:   {}", compiled.expression());
    println!("Sanitized: {}", compiled.sanitized());
    if compiled.mapping().is_empty() {
        println!("Columns:   (none)");
    } else {
        println!("Columns:");
        for (original, safe) in compiled.mapping().iter() {
            println!("  {} -> {}", original, safe);
        }
    }
    Ok(())
}

fn list_columns(input: &Path, csv: &CsvArgs) -> Result<()> {
    let table = read_table(input, csv)?;

    println!("File: {}", input.display());
    println!("Rows: {}", table.row_count());
    println!("Columns: {}", table.column_count());
    for (i, column) in table.columns().iter().enumerate() {
        println!("  [{}] {} ({})", i, column.name(), column.inferred_type());
    }
    Ok(())
}

fn list_functions() -> Result<()> {
    let registry = FunctionRegistry::new();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for def in registry.definitions() {
        let arity = match def.max_args {
            Some(max) if max == def.min_args => format!("{}", max),
            Some(max) => format!("{}-{}", def.min_args, max),
            None => format!("{}+", def.min_args),
        };
        writeln!(out, "{:<14} {:<6} {}", def.name, arity, def.params.join(", "))?;
    }
    Ok(())
}
