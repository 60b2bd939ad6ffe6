//! jobshard: sharded job configuration tree tool.
//!
//! # Usage
//!
//! ```text
//! jobshard [--job-dir <dir>] [--workers <n>] [-v] \
//!     shard <generated.yaml> --org <org> --repo <repo> [--dry-run]
//! jobshard [--job-dir <dir>] diff <generated.yaml> --org <org> --repo <repo>
//! jobshard [--job-dir <dir>] list [--json]
//! jobshard [--job-dir <dir>] dump
//! ```

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{diff::DiffArgs, dump::DumpArgs, list::ListArgs, shard::ShardArgs};
use jobshard_sync::Scanner;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "jobshard",
    version,
    about = "Load, reconcile and write sharded CI job configuration trees",
    long_about = None,
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every subcommand.
#[derive(clap::Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Root of the job configuration tree.
    #[arg(long, global = true, env = "JOBSHARD_JOB_DIR", default_value = ".")]
    pub job_dir: PathBuf,

    /// Number of file loading workers (defaults to available parallelism).
    #[arg(long, global = true, env = "JOBSHARD_WORKERS")]
    pub workers: Option<usize>,

    /// Log at debug level.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl GlobalArgs {
    pub fn scanner(&self) -> Scanner {
        match self.workers {
            Some(workers) => Scanner::new().with_workers(workers),
            None => Scanner::new(),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Shard a repository's generated jobs into the tree, preserving hand edits.
    Shard(ShardArgs),

    /// Show unified diff of what `shard` would write for a repository.
    Diff(DiffArgs),

    /// List the identity of every job configuration file in the tree.
    List(ListArgs),

    /// Aggregate the whole tree into one sorted document on stdout.
    Dump(DumpArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    match cli.command {
        Commands::Shard(args) => args.run(&cli.global),
        Commands::Diff(args) => args.run(&cli.global),
        Commands::List(args) => args.run(&cli.global),
        Commands::Dump(args) => args.run(&cli.global),
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}
