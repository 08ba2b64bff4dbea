use clap::{Parser, Subcommand};
use colored::Colorize;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use steady_core::demo::{Session, StepReport, Summary, DEFAULT_FILTER, DEFAULT_STATE};
use steady_core::{Commit, EqualityPolicy, Options, StabilizedCell, Value};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Steady — referentially stable state, from the command line
///
/// Feed JSON values through a stabilized cell and a memoized filtered view,
/// and see which updates stabilization suppressed.
#[derive(Parser)]
#[command(name = "steady", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay newline-delimited JSON values through a cell and a filtered view
    Run {
        /// Path to a file with one JSON value per line ("-" for stdin)
        file: PathBuf,
        /// Initial state (JSON text)
        #[arg(long, default_value = DEFAULT_STATE)]
        initial: String,
        /// Equality policy for the state and the view
        #[arg(long, default_value = "serialized")]
        equality: EqualityPolicy,
        /// JSON config file; overrides --equality
        #[arg(long)]
        config: Option<PathBuf>,
        /// Drop view entries whose JSON contains this text
        #[arg(long, default_value = DEFAULT_FILTER)]
        filter: String,
        /// Output as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Write two values in sequence and report whether the second kept the first's identity
    Compare {
        /// First value (JSON text)
        first: String,
        /// Second value (JSON text)
        second: String,
        /// Equality policy
        #[arg(long, default_value = "structural")]
        equality: EqualityPolicy,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show version information
    Version,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("line {line}: invalid JSON: {source}")]
    InvalidInput {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid {what}: {source}")]
    InvalidArgument {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Core(#[from] steady_core::Error),
}

impl CliError {
    /// 1 = bad input data, 2 = usage/IO/config error
    fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidInput { .. } => 1,
            _ => 2,
        }
    }
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            file,
            initial,
            equality,
            config,
            filter,
            json,
        } => cmd_run(&file, &initial, equality, config.as_deref(), &filter, json),
        Commands::Compare {
            first,
            second,
            equality,
            json,
        } => cmd_compare(&first, &second, equality, json),
        Commands::Version => {
            println!(
                "steady {} (steady-core {})",
                env!("CARGO_PKG_VERSION"),
                steady_core::VERSION
            );
            Ok(())
        }
    };

    let exit_code = match result {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            e.exit_code()
        }
    };

    process::exit(exit_code);
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("STEADY_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_options(equality: EqualityPolicy, config: Option<&Path>) -> Result<Options, CliError> {
    match config {
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(|source| CliError::Io {
                path: path.display().to_string(),
                source,
            })?;
            let options = Options::from_json(&text)?;
            tracing::debug!(config = %path.display(), policy = ?options.policy(), "loaded config");
            Ok(options)
        }
        None => Ok(Options::from_policy(equality)),
    }
}

fn open_input(file: &Path) -> Result<Box<dyn BufRead>, CliError> {
    if file == Path::new("-") {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let handle = std::fs::File::open(file).map_err(|source| CliError::Io {
        path: file.display().to_string(),
        source,
    })?;
    Ok(Box::new(BufReader::new(handle)))
}

fn parse_arg(what: &'static str, text: &str) -> Result<Value, CliError> {
    serde_json::from_str(text).map_err(|source| CliError::InvalidArgument { what, source })
}

fn cmd_run(
    file: &Path,
    initial: &str,
    equality: EqualityPolicy,
    config: Option<&Path>,
    filter: &str,
    json: bool,
) -> Result<(), CliError> {
    let options = load_options(equality, config)?;
    let initial = parse_arg("initial state", initial)?;
    let mut session = Session::new(initial, options, filter);

    let input = open_input(file)?;
    for (idx, line) in input.lines().enumerate() {
        let line = line.map_err(|source| CliError::Io {
            path: file.display().to_string(),
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(&line)
            .map_err(|source| CliError::InvalidInput { line: idx + 1, source })?;
        let report = session.submit(value);
        if json {
            print_json_line(&report);
        } else {
            print_report(&report);
        }
    }

    let summary = session.summary();
    if json {
        print_json_line(&summary);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn cmd_compare(first: &str, second: &str, equality: EqualityPolicy, json: bool) -> Result<(), CliError> {
    let first = Arc::new(parse_arg("first value", first)?);
    let second = parse_arg("second value", second)?;

    let mut cell = StabilizedCell::new(Arc::clone(&first), Options::from_policy(equality));
    let before = cell.read();
    let commit = cell.write(second);
    let kept = Arc::ptr_eq(&before, &cell.read());

    if json {
        print_json_line(&serde_json::json!({
            "equality": equality,
            "commit": commit,
            "kept_identity": kept,
        }));
    } else if kept {
        println!("{} ({}, {})", "same".green().bold(), describe(commit), equality);
    } else {
        println!("{} ({}, {})", "changed".yellow().bold(), describe(commit), equality);
    }
    Ok(())
}

fn describe(commit: Commit) -> String {
    match commit {
        Commit::Canonical { kind, .. } => format!("canonical {}", kind),
        Commit::Unchanged => "gate matched".to_string(),
        Commit::Replaced => "replaced".to_string(),
    }
}

fn print_json_line<T: serde::Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(line) => println!("{}", line),
        Err(e) => eprintln!("{} failed to serialize output: {}", "error:".red().bold(), e),
    }
}

fn print_report(report: &StepReport) {
    let state = if report.state_changed {
        "state changed".yellow()
    } else {
        "state unchanged".green()
    };
    let view = if report.view_changed {
        "view changed".yellow()
    } else {
        "view unchanged".green()
    };
    println!(
        "step {}: {} ({}), {} -> {}",
        report.step,
        state,
        describe(report.commit),
        view,
        report.view
    );
}

fn print_summary(summary: &Summary) {
    println!(
        "State updated {} times, memoized value updated {} times ({} submissions, {} recomputations)",
        summary.state_updates, summary.view_updates, summary.submissions, summary.recomputations
    );
}
