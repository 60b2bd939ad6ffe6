//! File identity recovered from the job configuration directory layout.
//!
//! # Layout
//!
//! ```text
//! <root>/
//!   <org>/
//!     <repo>/
//!       <org>-<repo>-<branch>-<kind>.yaml
//!       <org>-<repo>-periodics.yaml      (periodics not tied to a branch)
//! ```
//!
//! `<kind>` is always the final dash-delimited segment, so branches that
//! contain dashes parse correctly.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::error::PathInfoError;
use crate::types::JobKind;

/// Identity of a single job configuration file. Derived once from its path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct JobIdentity {
    pub org: String,
    pub repo: String,
    /// Empty only for branchless periodics.
    pub branch: String,
    pub kind: JobKind,
    /// Full path of the file on disk.
    pub filename: PathBuf,
}

impl JobIdentity {
    /// Parse the identity of `path` from its directory layout and basename.
    pub fn from_path(path: &Path) -> Result<Self, PathInfoError> {
        let repo_dir = path.parent().unwrap_or_else(|| Path::new(""));
        let repo = dir_name(repo_dir).ok_or_else(|| PathInfoError::NoRepo {
            path: path.to_path_buf(),
        })?;
        let org_dir = repo_dir.parent().unwrap_or_else(|| Path::new(""));
        let org = dir_name(org_dir).ok_or_else(|| PathInfoError::NoOrg {
            path: path.to_path_buf(),
        })?;

        let basename = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let prefix = format!("{org}-{repo}-");
        let Some(branch_kind) = basename.strip_prefix(&prefix) else {
            return Err(PathInfoError::MissingPrefix { prefix, basename });
        };

        let (branch, kind) = match branch_kind.rfind('-') {
            None if branch_kind == JobKind::Periodic.file_token() => {
                (String::new(), JobKind::Periodic)
            }
            None => return Err(PathInfoError::MissingKind { basename }),
            Some(idx) => {
                let token = &branch_kind[idx + 1..];
                let kind = JobKind::from_file_token(token).ok_or_else(|| {
                    PathInfoError::UnknownKind {
                        token: token.to_string(),
                        basename: basename.clone(),
                    }
                })?;
                (branch_kind[..idx].to_string(), kind)
            }
        };

        Ok(Self {
            org,
            repo,
            branch,
            kind,
            filename: path.to_path_buf(),
        })
    }

    /// The file name this identity maps to, e.g. `org-repo-master-presubmits.yaml`.
    pub fn basename(&self) -> String {
        basename_for(&self.org, &self.repo, &self.branch, self.kind)
    }
}

/// Build a configuration file name. An empty `branch` on a periodic yields
/// the branchless `<org>-<repo>-periodics.yaml` form.
pub fn basename_for(org: &str, repo: &str, branch: &str, kind: JobKind) -> String {
    if kind == JobKind::Periodic && branch.is_empty() {
        format!("{org}-{repo}-{kind}.yaml")
    } else {
        format!("{org}-{repo}-{branch}-{kind}.yaml")
    }
}

fn dir_name(dir: &Path) -> Option<String> {
    dir.file_name().map(|n| n.to_string_lossy().into_owned())
}

// ---------------------------------------------------------------------------
// Filename labels
// ---------------------------------------------------------------------------

fn unsafe_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9_.\-]+").expect("static regex"))
}

/// Turn a branch name or branch regex into a label safe for file names.
///
/// Strips every character outside `[A-Za-z0-9_.-]`, then trims `-`, `.` and
/// `_` from both ends. An empty result becomes `master`.
pub fn make_filename_label(possible_regex: &str) -> String {
    let stripped = unsafe_chars().replace_all(possible_regex, "");
    let label = stripped.trim_matches(|c| matches!(c, '-' | '.' | '_'));
    if label.is_empty() {
        "master".to_string()
    } else {
        label.to_string()
    }
}
