//! smctl - declarative state machine controller
//!
//! Runs a JSON controller definition against the wall clock, checks
//! definitions for fragments the runtime would skip, and evaluates single
//! expressions.

mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use smctl_core::Numeric;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "smctl")]
#[command(about = "Runs declarative JSON state machine controllers")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a controller until Ctrl+C or the cycle limit
    Run {
        /// YAML configuration file
        #[arg(short, long, env = "SMCTL_CONFIG")]
        config: Option<PathBuf>,

        /// Definition file (overrides the configured path)
        #[arg(short, long)]
        definition: Option<PathBuf>,

        /// Stop after this many cycles
        #[arg(short = 'n', long)]
        cycles: Option<u64>,

        /// Print machine states and variables as JSON on exit
        #[arg(long)]
        snapshot: bool,
    },

    /// Check a definition for fragments the runtime would skip
    Check {
        /// Definition file
        file: PathBuf,

        /// Machine capacity to check against
        #[arg(short, long, default_value = "16")]
        max_machines: usize,
    },

    /// Evaluate a math expression or a condition
    Eval {
        /// Expression JSON (or @file.json to read from file)
        expr: String,

        /// Evaluate as a condition
        #[arg(short, long)]
        condition: bool,

        /// Variable assignment, e.g. --var temp=31.5 (repeatable)
        #[arg(long = "var", value_parser = commands::parse_var)]
        vars: Vec<(String, Numeric)>,

        /// Scope for local variables
        #[arg(long, default_value = "sm")]
        device_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            config,
            definition,
            cycles,
            snapshot,
        } => commands::run(config, definition, cycles, snapshot).await,
        Commands::Check { file, max_machines } => commands::check(&file, max_machines),
        Commands::Eval {
            expr,
            condition,
            vars,
            device_id,
        } => commands::eval(&expr, condition, vars, device_id),
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red(), e);
        std::process::exit(1);
    }

    Ok(())
}
