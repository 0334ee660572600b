//! helmwork: conventional helm build tasks for charts and releases.
//!
//! # Usage
//!
//! ```text
//! helmwork tasks [--json]
//! helmwork plan <task>... [--json]
//! helmwork run <task>... [--dry-run] [--jobs N] [--json]
//!
//! global: --project <path/to/helmwork.yaml>  -v/-vv  --log-json
//! ```

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

use commands::{plan::PlanArgs, run::RunArgs, tasks::TasksArgs};
use helmwork_core::project::PROJECT_FILE;
use helmwork_engine::{init_tracing, LogFormat};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "helmwork",
    version,
    about = "Synthesize and run helm build tasks from naming conventions",
    long_about = None,
)]
struct Cli {
    /// Project file to load.
    #[arg(long, global = true, default_value = PROJECT_FILE)]
    project: PathBuf,

    /// Raise log verbosity (-v info, -vv debug). `RUST_LOG` takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List every conventional task the project supports.
    Tasks(TasksArgs),

    /// Show the ordered plan for the given tasks without running anything.
    Plan(PlanArgs),

    /// Run the given tasks and everything they depend on.
    Run(RunArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let format = if cli.log_json {
        LogFormat::Json
    } else {
        LogFormat::Text
    };
    init_tracing(level, format);

    match cli.command {
        Commands::Tasks(args) => args.run(&cli.project),
        Commands::Plan(args) => args.run(&cli.project),
        Commands::Run(args) => args.run(&cli.project),
    }
}
