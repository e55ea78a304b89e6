//! LineKV CLI
//!
//! Runs a single addressed operation against a storage directory.

use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use linekv::{Engine, Options, Reply, Value};
use tracing_subscriber::{fmt, EnvFilter};

/// LineKV CLI
#[derive(Parser, Debug)]
#[command(name = "linekv-cli")]
#[command(about = "CLI for the LineKV flat-file key/value store")]
#[command(version)]
struct Args {
    /// Storage directory
    #[arg(short, long)]
    path: String,

    /// Database allowed to exist (repeatable)
    #[arg(short, long = "create")]
    create: Vec<String>,

    /// Database file extension
    #[arg(long)]
    ext: Option<String>,

    /// Store databases gzip-compressed
    #[arg(long)]
    gzip: bool,

    /// Exit with the error instead of printing `false`
    #[arg(long)]
    raise: bool,

    /// Extra option as name=value (unknown names are ignored)
    #[arg(short = 'o', long = "option", value_parser = parse_pair)]
    options: Vec<(String, String)>,

    /// Address: database[.key][:action]
    address: String,

    /// Value to insert or update with
    value: Option<String>,

    /// How to interpret VALUE
    #[arg(short = 't', long = "type", value_enum, default_value_t = ValueType::Str)]
    value_type: ValueType,

    /// Rows to skip for `:select`
    #[arg(long)]
    offset: Option<i64>,

    /// Maximum rows for `:select`
    #[arg(long)]
    limit: Option<i64>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ValueType {
    Str,
    Int,
    Float,
}

fn parse_pair(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected name=value, got \"{}\"", s))
}

fn parse_value(raw: &str, value_type: ValueType) -> Result<Value, String> {
    match value_type {
        ValueType::Str => Ok(Value::from(raw)),
        ValueType::Int => raw
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|e| format!("invalid integer \"{}\": {}", raw, e)),
        ValueType::Float => raw
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|e| format!("invalid float \"{}\": {}", raw, e)),
    }
}

fn main() -> ExitCode {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,linekv=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let extra = match Options::from_pairs(args.options) {
        Ok(options) => options,
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let engine = Engine::default();
    engine.configure(extra);

    let mut options = Options::new().path(&args.path).create_also(args.create);
    if args.raise {
        options = options.errors(true);
    }
    if args.gzip {
        options = options.gzip(true);
    }
    if let Some(ext) = args.ext {
        options = options.ext(ext);
    }
    engine.configure(options);

    // select takes a window, everything else takes a value
    let arg = match (args.offset, args.limit) {
        (Some(offset), Some(limit)) => Some(Value::List(vec![Value::Int(offset), Value::Int(limit)])),
        (None, Some(limit)) => Some(Value::List(vec![Value::Int(limit)])),
        (Some(offset), None) => Some(Value::List(vec![Value::Int(offset), Value::Int(i64::MAX)])),
        (None, None) => match args.value.as_deref().map(|raw| parse_value(raw, args.value_type)) {
            Some(Ok(value)) => Some(value),
            Some(Err(e)) => {
                tracing::error!("{}", e);
                return ExitCode::FAILURE;
            }
            None => None,
        },
    };

    match engine.call(&args.address, arg) {
        Ok(Reply::Failed) => {
            if let Some(message) = engine.last_error() {
                eprintln!("{}", message);
            }
            println!("{}", Reply::Failed);
            ExitCode::FAILURE
        }
        Ok(reply) => {
            println!("{}", reply);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
