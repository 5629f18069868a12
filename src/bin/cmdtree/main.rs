//! Demo runner for `cmdtree`
//!
//! Builds a command tree from a `.cmdtree.yaml` (or `.yml`, `.json`) file
//! whose leaves run shell commands, then dispatches the command line to it.
//! Built with the default `cli` feature.

mod config;
mod logger;
mod shell;

use std::fs::File;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use log::{debug, info};

use cmdtree::{Context, Delim, split_command};

use crate::config::load_config;

#[derive(Parser, Debug)]
#[command(
    name = "cmdtree",
    version,
    about = "Run shell commands from a declarative command tree"
)]
struct Cli {
    /// Path to config file (auto-detected if not specified)
    #[arg(short, long)]
    config: Option<String>,

    /// Log file path (logs go to stderr otherwise)
    #[arg(long)]
    log_file: Option<String>,

    /// Run several commands, separated by this word
    #[arg(short, long)]
    delimiter: Option<String>,

    /// Also split where the delimiter is attached to a word
    #[arg(long, value_enum, value_delimiter = ',', requires = "delimiter")]
    split: Vec<SplitPolicy>,

    /// Command to run, followed by its flags and arguments
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SplitPolicy {
    /// `build; test`
    Trailing,
    /// `build ;test`
    Preceding,
    /// `build;test`
    Any,
}

impl From<SplitPolicy> for Delim {
    fn from(policy: SplitPolicy) -> Self {
        match policy {
            SplitPolicy::Trailing => Delim::TRAILING,
            SplitPolicy::Preceding => Delim::PRECEDING,
            SplitPolicy::Any => Delim::ANY,
        }
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let log_file = cli.log_file.as_deref().map(File::create).transpose()?;
    logger::init(log_file)?;

    let (root, config_path) = load_config(cli.config.as_deref())?;
    info!("Loaded command tree from {}", config_path.display());

    let mut invocations = match &cli.delimiter {
        Some(delimiter) => {
            let policy = cli
                .split
                .iter()
                .fold(Delim::STRICT, |policy, split| policy | Delim::from(*split));
            split_command(&cli.args, delimiter, policy)
        }
        None => vec![cli.args.clone()],
    };
    if invocations.is_empty() {
        invocations.push(Vec::new());
    }

    let ctx = Context::new();
    for args in &invocations {
        debug!("Running {args:?}");
        if let Err(err) = root.run(&ctx, args, &[]) {
            // usage errors were already reported together with help
            if !err.is_usage() {
                eprintln!("Command failed: {err}");
            }
            return Ok(ExitCode::FAILURE);
        }
    }
    Ok(ExitCode::SUCCESS)
}
