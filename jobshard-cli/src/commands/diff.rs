//! `jobshard diff`: show unified diffs for what `shard` would write.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use jobshard_sync::{diff_repo, read_job_set};

use crate::GlobalArgs;

/// Arguments for `jobshard diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// File holding the freshly generated jobs.
    pub generated: PathBuf,

    #[arg(long)]
    pub org: String,

    #[arg(long)]
    pub repo: String,
}

impl DiffArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let generated = read_job_set(&self.generated)
            .with_context(|| format!("failed to load {}", self.generated.display()))?;

        let diffs = diff_repo(
            &global.job_dir,
            &self.org,
            &self.repo,
            &generated,
            &global.scanner(),
        )
        .with_context(|| format!("diff failed for '{}/{}'", self.org, self.repo))?;

        if diffs.is_empty() {
            println!("No differences for '{}/{}'.", self.org, self.repo);
            return Ok(());
        }

        for diff in diffs {
            print!("{}", diff.unified_diff);
            if !diff.unified_diff.ends_with('\n') {
                println!();
            }
        }

        Ok(())
    }
}
