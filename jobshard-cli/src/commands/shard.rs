//! `jobshard shard`: reconcile a repository's generated jobs into the tree.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use jobshard_sync::{read_job_set, write_to_dir, WriteOptions, WriteResult};

use crate::GlobalArgs;

/// Arguments for `jobshard shard`.
#[derive(Args, Debug)]
pub struct ShardArgs {
    /// File holding the freshly generated jobs (plain or gzip YAML).
    pub generated: PathBuf,

    /// Organization the generated jobs belong to.
    #[arg(long)]
    pub org: String,

    /// Repository the generated jobs belong to.
    #[arg(long)]
    pub repo: String,

    /// Show what would be written without touching any file.
    #[arg(long)]
    pub dry_run: bool,
}

impl ShardArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let generated = read_job_set(&self.generated)
            .with_context(|| format!("failed to load {}", self.generated.display()))?;

        let options = WriteOptions {
            dry_run: self.dry_run,
            scanner: global.scanner(),
        };
        let results = write_to_dir(&global.job_dir, &self.org, &self.repo, &generated, &options)
            .with_context(|| format!("shard failed for '{}/{}'", self.org, self.repo))?;

        print_results(&format!("{}/{}", self.org, self.repo), &results, self.dry_run);
        Ok(())
    }
}

fn print_results(repo: &str, writes: &[WriteResult], dry_run: bool) {
    let prefix = if dry_run { "[dry-run] " } else { "" };
    let changed = writes
        .iter()
        .filter(|r| !matches!(r, WriteResult::Unchanged { .. }))
        .count();

    if changed == 0 {
        println!("{prefix}'{repo}': nothing to do");
        return;
    }

    println!(
        "{prefix}'{repo}' sharded ({changed} changed, {} unchanged)",
        writes.len() - changed
    );

    for r in writes {
        let marker = match r {
            WriteResult::Written { .. } => "written",
            WriteResult::WouldWrite { .. } => "would write",
            WriteResult::Deleted { .. } => "deleted",
            WriteResult::WouldDelete { .. } => "would delete",
            WriteResult::Unchanged { .. } => "unchanged",
        };
        println!("  {marker:<12} {}", r.path().display());
    }
}
