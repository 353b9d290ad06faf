use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use sqlviz::csv_reader;
use sqlviz::logging::init_logging;
use sqlviz::markers::{self, parse_reply};
use sqlviz::{ArtifactStore, ChartError, ChartIntent, Dispatcher, ResultTable, VizConfig};

#[derive(Parser, Debug)]
#[command(name = "sqlviz")]
#[command(about = "Render charts from SQL query results", long_about = None)]
struct Args {
    /// JSON config file (output_dir, render, histogram_bins, ...)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory charts are written to (overrides config and SQLVIZ_OUTPUT_DIR)
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a chart and print its artifact reference as JSON
    Render {
        /// Result table: a .json or .csv file, or '-' for JSON on stdin
        #[arg(long)]
        data: String,

        /// Chart intent JSON, e.g. '{"kind": "bar", "columns": ["state", "orders"]}'
        #[arg(long)]
        intent: String,
    },
    /// Split an agent reply into text and chart markers
    Markers {
        #[arg(long)]
        reply: String,
    },
}

fn main() -> ExitCode {
    init_logging();
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::from(2);
        }
    };

    let outcome = match &args.command {
        Command::Render { data, intent } => render(&config, data, intent),
        Command::Markers { reply } => Ok(markers_json(&config, reply)),
    };

    match outcome {
        Ok(value) => match print_json(&value) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Error: {:#}", e);
                ExitCode::FAILURE
            }
        },
        Err(err) => {
            let body = json!({"error": err.code(), "message": err.to_string()});
            // Structured error still goes to stdout for the calling tool
            let _ = print_json(&body);
            ExitCode::FAILURE
        }
    }
}

fn load_config(args: &Args) -> Result<VizConfig> {
    let config = match &args.config {
        Some(path) => VizConfig::from_json_file(path)?,
        None => VizConfig::default(),
    };
    let mut config = config.apply_env()?;
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    Ok(config)
}

fn render(config: &VizConfig, data: &str, intent: &str) -> sqlviz::Result<Value> {
    let intent = ChartIntent::from_json_str(intent)?;
    let table = read_table(data, config.categorical_max_distinct)?;
    let reference = Dispatcher::new(config).dispatch(&intent, &table)?;
    let marker = reference.marker();
    let mut value =
        serde_json::to_value(&reference).map_err(|e| ChartError::RenderFailure(e.to_string()))?;
    if let Value::Object(obj) = &mut value {
        obj.insert("marker".to_string(), Value::String(marker));
    }
    Ok(value)
}

fn read_table(data: &str, categorical_max_distinct: usize) -> sqlviz::Result<ResultTable> {
    let text = if data == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| ChartError::MalformedTable(format!("Failed to read stdin: {}", e)))?;
        buf
    } else {
        std::fs::read_to_string(data)
            .map_err(|e| ChartError::MalformedTable(format!("Failed to read {}: {}", data, e)))?
    };

    let is_csv = Path::new(data)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if is_csv {
        csv_reader::read_csv_str(&text, categorical_max_distinct)
    } else {
        let value: Value = serde_json::from_str(&text)
            .map_err(|e| ChartError::MalformedTable(format!("Could not parse data as JSON: {}", e)))?;
        ResultTable::from_json_with(&value, categorical_max_distinct)
    }
}

fn markers_json(config: &VizConfig, reply: &str) -> Value {
    let store = ArtifactStore::new(config.output_dir.clone());
    let (text, _) = markers::strip_markers(reply);
    json!({
        "text": text,
        "segments": parse_reply(reply),
        "images": markers::resolve_markers(reply, &store),
    })
}

fn print_json(value: &Value) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    serde_json::to_writer_pretty(&mut handle, value).context("Failed to write JSON to stdout")?;
    writeln!(handle).context("Failed to write JSON to stdout")?;
    handle.flush().context("Failed to flush stdout")?;
    Ok(())
}
