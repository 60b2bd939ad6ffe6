//! `jobshard dump`: the whole tree as one sorted document.

use anyhow::{Context, Result};
use clap::Args;

use jobshard_sync::sort_job_set;

use crate::GlobalArgs;

/// Arguments for `jobshard dump`.
#[derive(Args, Debug)]
pub struct DumpArgs {}

impl DumpArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let mut job_set = global
            .scanner()
            .read_from_dir(&global.job_dir)
            .with_context(|| format!("failed to load {}", global.job_dir.display()))?;
        log::info!(
            "loaded {} job(s) from {}",
            job_set.job_count(),
            global.job_dir.display()
        );

        sort_job_set(&mut job_set);
        print!("{}", serde_yaml::to_string(&job_set)?);
        Ok(())
    }
}
