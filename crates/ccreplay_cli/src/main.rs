//! ccreplay CLI
//!
//! Replays concurrency-control schedules from the command line.
//!
//! # Commands
//!
//! - `tpl` - Replay a schedule under two-phase locking
//! - `occ` - Replay a scenario under optimistic concurrency control
//! - `samples` - List the built-in sample schedules

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Concurrency-control schedule replay.
#[derive(Parser)]
#[command(name = "ccreplay")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a schedule under rigorous two-phase locking
    Tpl {
        /// Schedule text, e.g. "R1(X); W2(X); C1; C2"
        #[arg(short, long, conflicts_with_all = ["file", "sample"])]
        schedule: Option<String>,

        /// Read the schedule from a file
        #[arg(long, conflicts_with = "sample")]
        file: Option<PathBuf>,

        /// Use a built-in sample schedule (1-6)
        #[arg(long)]
        sample: Option<usize>,

        /// Use shared locks and lock upgrading
        #[arg(short, long)]
        upgrade: bool,

        /// Prevent deadlocks with wound-wait
        #[arg(short, long)]
        rollback: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Replay a scenario under optimistic concurrency control
    Occ {
        /// JSON scenario file
        #[arg(long, conflicts_with = "sample")]
        scenario: Option<PathBuf>,

        /// Use the built-in two-transaction scenario
        #[arg(long)]
        sample: bool,

        /// Apply committed work to a value store in this directory
        #[arg(long)]
        store: Option<PathBuf>,

        /// Maximum rollbacks of a single transaction
        #[arg(long)]
        max_rollbacks: Option<usize>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// List the built-in sample schedules
    Samples,

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Tpl {
            schedule,
            file,
            sample,
            upgrade,
            rollback,
            format,
        } => {
            let input = commands::tpl::load_input(schedule, file.as_deref(), sample)?;
            let options = commands::tpl::Options {
                upgrade,
                rollback,
                verbose: cli.verbose,
            };
            commands::tpl::run(&input, options, &format)?;
        }
        Commands::Occ {
            scenario,
            sample,
            store,
            max_rollbacks,
            format,
        } => {
            let scenario = match (scenario, sample) {
                (Some(path), _) => commands::occ::Scenario::load(&path)?,
                (None, true) => commands::occ::Scenario::sample(),
                (None, false) => return Err("Either --scenario or --sample is required".into()),
            };
            commands::occ::run(
                scenario,
                store.as_deref(),
                max_rollbacks,
                cli.verbose,
                &format,
            )?;
        }
        Commands::Samples => {
            commands::samples::run();
        }
        Commands::Version => {
            println!("ccreplay CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("ccreplay Core v{}", ccreplay_core::VERSION);
        }
    }

    Ok(())
}
