use std::io::{self, BufWriter, Read, Write};
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use planscope_core::engine::Engine;
use planscope_core::engine::session::Session;
use planscope_error::{ExplainError, Result};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for tracing::Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

#[derive(Parser)]
#[clap(name = "planscope")]
struct Arguments {
    /// Execute file containing sql statements then exit.
    #[clap(short = 'f', long)]
    files: Vec<PathBuf>,
    /// Default log level, overridden by RUST_LOG.
    #[clap(long, value_enum, default_value = "error")]
    log_level: LogLevel,
    /// Emit logs as json.
    #[clap(long)]
    json_logs: bool,
    /// Print explain output as json instead of lines.
    #[clap(long)]
    json: bool,
    /// Skip creating the demo `src` table.
    #[clap(long)]
    no_demo: bool,
    /// Queries to execute.
    ///
    /// If omitted, and no files were given via the `files` argument, then
    /// statements are read from stdin.
    #[clap(trailing_var_arg = true)]
    queries: Vec<String>,
}

/// Print the plans for arbitrary statements.
fn main() {
    let args = Arguments::parse();
    let format = if args.json_logs {
        logutil::LogFormat::Json
    } else {
        logutil::LogFormat::HumanReadable
    };
    logutil::configure_global_logger(args.log_level.into(), format, io::stderr);

    if let Err(err) = inner(args) {
        println!("ERROR: {err}");
        std::process::exit(1);
    }
}

fn inner(args: Arguments) -> Result<()> {
    let engine = Engine::new();
    let mut session = engine.new_session();
    if !args.no_demo {
        session.sql("CREATE TABLE src (key INT, value STRING)")?;
    }

    let mut stdout = BufWriter::new(io::stdout());

    if !args.files.is_empty() {
        for path in &args.files {
            let content = std::fs::read_to_string(path).map_err(|e| {
                ExplainError::Internal(format!("Failed to read {}: {e}", path.display()))
            })?;
            run(&mut session, &content, args.json, &mut stdout)?;
        }
        return Ok(());
    }

    if !args.queries.is_empty() {
        for query in &args.queries {
            run(&mut session, query, args.json, &mut stdout)?;
        }
        return Ok(());
    }

    let mut content = String::new();
    io::stdin()
        .read_to_string(&mut content)
        .map_err(|e| ExplainError::Internal(format!("Failed to read stdin: {e}")))?;
    run(&mut session, &content, args.json, &mut stdout)
}

fn run(session: &mut Session, sql: &str, json: bool, out: &mut impl Write) -> Result<()> {
    for result in session.sql(sql)? {
        match (&result.explain, json) {
            (Some(explain), true) => {
                let s = serde_json::to_string_pretty(explain).map_err(|e| {
                    ExplainError::Internal(format!("Failed to serialize explain: {e}"))
                })?;
                write_line(out, &s)?;
            }
            _ => {
                for line in &result.lines {
                    write_line(out, line)?;
                }
            }
        }
    }
    out.flush()
        .map_err(|e| ExplainError::Internal(format!("Failed to flush output: {e}")))
}

fn write_line(out: &mut impl Write, line: &str) -> Result<()> {
    writeln!(out, "{line}")
        .map_err(|e| ExplainError::Internal(format!("Failed to write output: {e}")))
}
