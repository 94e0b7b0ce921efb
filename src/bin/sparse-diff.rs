//! sparse-diff - compare JSON/YAML documents and print what changed.

use std::fs;
use std::io::{self, Write};
use std::path::{Path as FsPath, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use sparse_diff::value::{self, Value};
use sparse_diff::{compare_lists, compare_objects, ComparisonConfig, ComparisonConfigBuilder};
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(name = "sparse-diff", version)]
#[command(about = "Compare two documents and report the paths that changed", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compare two objects
    Compare {
        old: PathBuf,
        new: PathBuf,
        #[command(flatten)]
        options: Options,
    },
    /// Compare two lists of objects, by position or by key
    CompareLists {
        old: PathBuf,
        new: PathBuf,
        /// Path of the field identifying list items (e.g. `Id`)
        #[arg(short, long)]
        key: Option<String>,
        #[command(flatten)]
        options: Options,
    },
}

#[derive(Args)]
struct Options {
    /// Comparison config file (YAML, or JSON with a .json extension)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path pattern to ignore (repeatable)
    #[arg(long)]
    ignore: Vec<String>,

    /// Path pattern to always include (repeatable)
    #[arg(long)]
    always_include: Vec<String>,

    /// Only report always-included paths alongside a real change
    #[arg(long)]
    skip_unchanged_always_included: bool,

    /// Record shape mismatches below the root instead of failing
    #[arg(long)]
    lenient: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: Format,

    /// Output location. Use '-' for stdout
    #[arg(short, long, default_value = "-")]
    output: String,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Yaml,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.to_string()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(io::stderr))
        .init();

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn run(command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Compare { old, new, options } => {
            let config = build_config(&options, None)?;
            let old = read_document(&old)?;
            let new = read_document(&new)?;
            let mut output = open_output(&options.output)?;
            match compare_objects(&old, &new, Some(&config))? {
                Some(record) => write_result(&record, options.format, &mut output)?,
                None => writeln!(output, "no changes")?,
            }
        }
        Command::CompareLists {
            old,
            new,
            key,
            options,
        } => {
            let config = build_config(&options, key)?;
            let old = read_list(&old)?;
            let new = read_list(&new)?;
            let mut output = open_output(&options.output)?;
            let changes = compare_lists(&old, &new, Some(&config))?;
            if changes.is_empty() {
                writeln!(output, "no changes")?;
            } else {
                write_result(&changes, options.format, &mut output)?;
            }
        }
    }
    Ok(())
}

fn build_config(
    options: &Options,
    key: Option<String>,
) -> Result<ComparisonConfig, Box<dyn std::error::Error>> {
    let mut builder = match &options.config {
        Some(path) => sparse_diff::diff::ConfigFile::load(path)?.into_builder(),
        None => ComparisonConfigBuilder::new(),
    };
    builder = builder
        .ignore_all(options.ignore.iter().cloned())
        .always_include_all(options.always_include.iter().cloned());
    if options.skip_unchanged_always_included {
        builder = builder.include_unchanged_always_included(false);
    }
    if options.lenient {
        builder = builder.strict_shapes(false);
    }
    if let Some(key) = key {
        builder = builder.key_path(key);
    }
    Ok(builder.build()?)
}

fn read_document(path: &FsPath) -> Result<Value, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read file {:?}: {}", path, e))?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let document = if is_json {
        value::from_json(&content).map_err(|e| format!("Failed to parse {:?}: {}", path, e))?
    } else {
        value::from_yaml(&content).map_err(|e| format!("Failed to parse {:?}: {}", path, e))?
    };
    tracing::debug!("read {} from {}", document.kind_name(), path.display());
    Ok(document)
}

fn read_list(path: &FsPath) -> Result<Vec<Value>, Box<dyn std::error::Error>> {
    match read_document(path)? {
        Value::List(items) => Ok(items),
        Value::Null => Ok(Vec::new()),
        other => Err(format!("{:?} holds a {}, expected a list", path, other.kind_name()).into()),
    }
}

fn open_output(output: &str) -> Result<Box<dyn Write>, Box<dyn std::error::Error>> {
    if output == "-" {
        Ok(Box::new(io::stdout()))
    } else {
        let file = fs::File::create(output)
            .map_err(|e| format!("Failed to create output file {:?}: {}", output, e))?;
        Ok(Box::new(file))
    }
}

fn write_result<T: Serialize>(
    result: &T,
    format: Format,
    output: &mut dyn Write,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        Format::Json => writeln!(output, "{}", serde_json::to_string_pretty(result)?)?,
        Format::Yaml => write!(output, "{}", serde_yaml::to_string(result)?)?,
    }
    Ok(())
}
