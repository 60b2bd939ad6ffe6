//! `jobshard list`: identities of every configuration file in the tree.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use jobshard_core::JobIdentity;

use crate::GlobalArgs;

/// Arguments for `jobshard list`.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct ListJson<'a> {
    job_dir: &'a Path,
    files: &'a [JobIdentity],
}

impl ListArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let mut files = Vec::new();
        global
            .scanner()
            .for_each_identity(&global.job_dir, Path::new(""), |info| {
                files.push(info);
                Ok(())
            })
            .with_context(|| format!("failed to scan {}", global.job_dir.display()))?;

        if self.json {
            let report = ListJson {
                job_dir: &global.job_dir,
                files: &files,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(());
        }

        if files.is_empty() {
            println!("No job configuration files under {}.", global.job_dir.display());
            return Ok(());
        }
        for info in &files {
            let branch = if info.branch.is_empty() { "-" } else { info.branch.as_str() };
            println!(
                "{}/{}\t{}\t{}\t{}",
                info.org,
                info.repo,
                branch,
                info.kind,
                info.filename.display()
            );
        }
        Ok(())
    }
}
