use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use csvchart::parser::parse_chart_request;
use csvchart::{chart_data, ChartRequest, Dataset, EngineError, EngineOptions};
use serde::Serialize;
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "csvchart")]
#[command(about = "Summary statistics and chart-ready data from messy CSV files", long_about = None)]
struct Args {
    /// CSV file to read (defaults to stdin)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// JSON file with engine options
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List columns and the ones that coerce to numbers
    Columns,
    /// Show the first rows as text
    Preview {
        /// Rows to show (capped by the preview limit)
        #[arg(short, long)]
        rows: Option<usize>,
    },
    /// Descriptive statistics of the numeric columns
    Describe,
    /// Chart data, e.g. 'bar(x: region, y: sales)'
    Chart {
        /// Chart expression
        #[arg(required_unless_present = "json")]
        expr: Option<String>,
        /// Chart request as JSON instead of an expression
        #[arg(long, conflicts_with = "expr")]
        json: Option<String>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ColumnsOutput {
    columns: Vec<String>,
    numeric_columns: Vec<String>,
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let options = match &args.config {
        Some(path) => EngineOptions::from_json_file(path)
            .with_context(|| format!("Failed to load options from {}", path.display()))?,
        None => EngineOptions::default(),
    };

    match run(&args, &options) {
        Ok(json) => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            writeln!(handle, "{}", json).context("Failed to write to stdout")?;
            handle.flush().context("Failed to flush stdout")?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => match err.downcast_ref::<EngineError>() {
            Some(engine_err) if engine_err.is_client_error() => {
                let body = serde_json::to_string(&engine_err.to_body())?;
                eprintln!("{}", body);
                Ok(ExitCode::from(2))
            }
            _ => Err(err.context("Failed to process CSV")),
        },
    }
}

fn run(args: &Args, options: &EngineOptions) -> Result<String> {
    let dataset = match &args.input {
        Some(path) => Dataset::from_reader(File::open(path)?)?,
        None => Dataset::from_reader(io::stdin().lock())?,
    };

    let output = match &args.command {
        Command::Columns => to_json(&ColumnsOutput {
            columns: dataset.columns(),
            numeric_columns: dataset.numeric_columns(),
        }),
        Command::Preview { rows } => {
            let limit = rows.unwrap_or(options.preview_limit).min(options.preview_limit);
            to_json(&dataset.preview(limit))
        }
        Command::Describe => to_json(&dataset.describe()),
        Command::Chart { expr, json } => {
            let request = match (expr, json) {
                (_, Some(json)) => serde_json::from_str::<ChartRequest>(json).map_err(|e| {
                    EngineError::validation(format!("invalid chart request JSON: {}", e))
                })?,
                (Some(expr), None) => parse_chart_request(expr)?,
                (None, None) => {
                    return Err(EngineError::validation("a chart expression is required").into())
                }
            };
            to_json(&chart_data(&dataset, &request, options)?)
        }
    };

    output.context("Failed to serialize output")
}

fn to_json<T: Serialize>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(value)
}
