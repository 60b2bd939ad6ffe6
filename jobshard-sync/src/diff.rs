//! Dry-run unified diff support for `jobshard diff`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use similar::TextDiff;

use jobshard_core::JobSet;

use crate::error::{io_err, SyncError};
use crate::scan::Scanner;
use crate::writer::{plan_repo, serialize};

/// A single planned file diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub path: PathBuf,
    pub unified_diff: String,
}

/// Reconcile `job_set` for `org/repo` the way [`crate::write_to_dir`] would
/// and compare the result with current on-disk content.
///
/// No files are written. Files that would be deleted diff against empty
/// content.
pub fn diff_repo(
    job_dir: &Path,
    org: &str,
    repo: &str,
    job_set: &JobSet,
    scanner: &Scanner,
) -> Result<Vec<FileDiff>, SyncError> {
    let mut diffs = Vec::new();
    for planned in plan_repo(job_dir, org, repo, job_set, scanner)? {
        let rendered = if planned.job_set.is_empty() {
            String::new()
        } else {
            serialize(&planned.job_set)?
        };
        let existing = read_existing_or_empty(&planned.path)?;
        if existing == rendered {
            continue;
        }

        let relative = planned
            .path
            .strip_prefix(job_dir)
            .unwrap_or(planned.path.as_path());
        let old_header = format!("a/{}", relative.display());
        let new_header = format!("b/{}", relative.display());
        let unified = TextDiff::from_lines(&existing, &rendered)
            .unified_diff()
            .header(&old_header, &new_header)
            .context_radius(3)
            .to_string();

        diffs.push(FileDiff {
            path: planned.path,
            unified_diff: unified,
        });
    }
    Ok(diffs)
}

fn read_existing_or_empty(path: &Path) -> Result<String, SyncError> {
    match std::fs::read(path) {
        Ok(content) => Ok(String::from_utf8_lossy(&content).into_owned()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(String::new()),
        Err(err) => Err(io_err(path, err)),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::fs;

    use jobshard_core::{JobBase, Presubmit, GENERATION_LABEL, NEWLY_GENERATED};
    use tempfile::TempDir;

    use crate::writer::{write_to_dir, WriteOptions};

    use super::*;

    fn generated_set(names: &[&str]) -> JobSet {
        let jobs = names
            .iter()
            .map(|name| {
                let mut base = JobBase::new(*name);
                base.labels
                    .insert(GENERATION_LABEL.to_string(), NEWLY_GENERATED.to_string());
                Presubmit {
                    base,
                    branches: vec!["master".to_string()],
                    ..Presubmit::default()
                }
            })
            .collect();
        JobSet {
            presubmits: BTreeMap::from([("org/repo".to_string(), jobs)]),
            ..JobSet::default()
        }
    }

    #[test]
    fn no_diffs_after_clean_write() {
        let tmp = TempDir::new().expect("tmp");
        let set = generated_set(&["pull-a"]);
        write_to_dir(tmp.path(), "org", "repo", &set, &WriteOptions::default()).expect("write");

        let diffs = diff_repo(tmp.path(), "org", "repo", &set, &Scanner::new()).expect("diff");
        assert!(diffs.is_empty(), "written repo should have no diff: {diffs:?}");
    }

    #[test]
    fn new_job_produces_unified_diff() {
        let tmp = TempDir::new().expect("tmp");
        write_to_dir(
            tmp.path(),
            "org",
            "repo",
            &generated_set(&["pull-a"]),
            &WriteOptions::default(),
        )
        .expect("write");

        let diffs = diff_repo(
            tmp.path(),
            "org",
            "repo",
            &generated_set(&["pull-a", "pull-b"]),
            &Scanner::new(),
        )
        .expect("diff");
        assert_eq!(diffs.len(), 1);
        let diff = &diffs[0].unified_diff;
        assert!(diff.contains("--- a/org/repo/org-repo-master-presubmits.yaml"));
        assert!(diff.contains("+++ b/org/repo/org-repo-master-presubmits.yaml"));
        assert!(
            diff.lines()
                .any(|l| l.starts_with('+') && l.contains("name: pull-b")),
            "{diff}"
        );
    }

    #[test]
    fn diff_does_not_write() {
        let tmp = TempDir::new().expect("tmp");
        let diffs = diff_repo(
            tmp.path(),
            "org",
            "repo",
            &generated_set(&["pull-a"]),
            &Scanner::new(),
        )
        .expect("diff");
        assert_eq!(diffs.len(), 1);
        assert!(fs::read_dir(tmp.path()).expect("read tmp").next().is_none());
    }
}
