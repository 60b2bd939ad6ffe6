//! Sharding writer: splits one repository's generated jobs into per-branch,
//! per-kind files and reconciles each with what is already on disk.
//!
//! ## `write_to_dir` protocol
//!
//! 1. Partition the generated jobs into target files
//!    `<org>-<repo>-<branch-label>-<kind>.yaml`.
//! 2. Scan every existing file under `<job_dir>/<org>/<repo>/`.
//! 3. Existing file with new content → merge, prune, sort.
//!    Existing file without new content → prune, sort.
//! 4. Target files with no existing counterpart → prune, sort.
//! 5. Write each result; an empty result deletes the file.
//!
//! Writes are content-gated (identical bytes are left alone) and atomic
//! (`<path>.jobshard.tmp` + rename). The first write failure aborts.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use jobshard_core::{
    basename_for, make_filename_label, repo_key, JobKind, JobSet, Periodic, Postsubmit, Presubmit,
};

use crate::error::{io_err, SyncError};
use crate::merge::{merge_job_sets, ConsideredNames};
use crate::prune::prune;
use crate::scan::Scanner;
use crate::sort::sort_job_set;

// ---------------------------------------------------------------------------
// Write result
// ---------------------------------------------------------------------------

/// Outcome of an individual file write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteResult {
    /// File was written (content changed or did not previously exist).
    Written { path: PathBuf },
    /// File was skipped: serialized content matches what is on disk.
    Unchanged { path: PathBuf },
    /// File was removed because it no longer holds any job.
    Deleted { path: PathBuf },
    /// Dry run: the file *would* have been written.
    WouldWrite { path: PathBuf },
    /// Dry run: the file *would* have been removed.
    WouldDelete { path: PathBuf },
}

impl WriteResult {
    pub fn path(&self) -> &Path {
        match self {
            WriteResult::Written { path }
            | WriteResult::Unchanged { path }
            | WriteResult::Deleted { path }
            | WriteResult::WouldWrite { path }
            | WriteResult::WouldDelete { path } => path,
        }
    }
}

/// Knobs for [`write_to_dir`].
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    /// Report what would change without touching the filesystem.
    pub dry_run: bool,
    /// Scanner used to load the existing files.
    pub scanner: Scanner,
}

/// A reconciled target file. An empty `job_set` means the file should not exist.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedFile {
    pub path: PathBuf,
    pub job_set: JobSet,
}

// ---------------------------------------------------------------------------
// Sharding
// ---------------------------------------------------------------------------

/// Partition `job_set`'s jobs for `org/repo` into target files, keyed by basename.
///
/// Presubmits and postsubmits are placed by their first branch (`master` when
/// none is declared); periodics by the base ref of their primary execution
/// context. Periodics whose primary context is not `org/repo`, or that have
/// none, are left out.
pub fn shard_job_set(org: &str, repo: &str, job_set: &JobSet) -> BTreeMap<String, JobSet> {
    let key = repo_key(org, repo);
    let mut files: BTreeMap<String, JobSet> = BTreeMap::new();

    for job in job_set.presubmits.get(&key).into_iter().flatten() {
        let file = basename_for(org, repo, &branch_label(&job.branches), JobKind::Presubmit);
        push_presubmit(files.entry(file).or_default(), &key, job);
    }
    for job in job_set.postsubmits.get(&key).into_iter().flatten() {
        let file = basename_for(org, repo, &branch_label(&job.branches), JobKind::Postsubmit);
        push_postsubmit(files.entry(file).or_default(), &key, job);
    }
    for job in &job_set.periodics {
        let Some(refs) = job.primary_ref() else {
            continue;
        };
        if refs.org != org || refs.repo != repo {
            continue;
        }
        let label = make_filename_label(&refs.base_ref);
        let file = basename_for(org, repo, &label, JobKind::Periodic);
        push_periodic(files.entry(file).or_default(), job);
    }

    files
}

fn branch_label(branches: &[String]) -> String {
    match branches.first() {
        Some(branch) => make_filename_label(branch),
        None => "master".to_string(),
    }
}

fn push_presubmit(set: &mut JobSet, key: &str, job: &Presubmit) {
    set.presubmits
        .entry(key.to_string())
        .or_default()
        .push(job.clone());
}

fn push_postsubmit(set: &mut JobSet, key: &str, job: &Postsubmit) {
    set.postsubmits
        .entry(key.to_string())
        .or_default()
        .push(job.clone());
}

fn push_periodic(set: &mut JobSet, job: &Periodic) {
    set.periodics.push(job.clone());
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

/// `<job_dir>/<org>/<repo>/`
pub fn repo_dir(job_dir: &Path, org: &str, repo: &str) -> PathBuf {
    job_dir.join(org).join(repo)
}

/// Reconcile `job_set` with the files under `<job_dir>/<org>/<repo>/` in
/// memory. Nothing is written. Results are ordered by path.
pub fn plan_repo(
    job_dir: &Path,
    org: &str,
    repo: &str,
    job_set: &JobSet,
    scanner: &Scanner,
) -> Result<Vec<PlannedFile>, SyncError> {
    let mut files = shard_job_set(org, repo, job_set);
    let mut considered = ConsideredNames::default();
    for shard in files.values() {
        considered.extend_from(shard);
    }

    let dir = repo_dir(job_dir, org, repo);
    let mut planned = Vec::new();
    if dir.is_dir() {
        scanner.for_each_job_set(&dir, Path::new(""), |mut existing, info| {
            let file = info
                .filename
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if let Some(generated) = files.remove(&file) {
                if !generated.is_empty() {
                    merge_job_sets(&mut existing, &generated, &considered);
                }
            }
            let mut reconciled = prune(existing);
            sort_job_set(&mut reconciled);
            planned.push(PlannedFile {
                path: info.filename,
                job_set: reconciled,
            });
            Ok(())
        })?;
    }

    for (file, generated) in files {
        let mut fresh = prune(generated);
        sort_job_set(&mut fresh);
        planned.push(PlannedFile {
            path: dir.join(file),
            job_set: fresh,
        });
    }

    planned.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(planned)
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Shard `job_set` for `org/repo` into `job_dir`, merging with existing files.
///
/// Callers must not run two writers against the same repository directory
/// at once.
pub fn write_to_dir(
    job_dir: &Path,
    org: &str,
    repo: &str,
    job_set: &JobSet,
    options: &WriteOptions,
) -> Result<Vec<WriteResult>, SyncError> {
    let dir = repo_dir(job_dir, org, repo);
    if !options.dry_run {
        std::fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
    }

    plan_repo(job_dir, org, repo, job_set, &options.scanner)?
        .iter()
        .map(|file| write_to_file(&file.path, &file.job_set, options.dry_run))
        .collect()
}

/// Serialize `job_set` to `path`. An empty set removes the file instead.
pub fn write_to_file(
    path: &Path,
    job_set: &JobSet,
    dry_run: bool,
) -> Result<WriteResult, SyncError> {
    if job_set.is_empty() {
        return remove_file(path, dry_run);
    }

    let content = serialize(job_set)?;
    match std::fs::read(path) {
        Ok(existing) if existing == content.as_bytes() => {
            tracing::debug!("unchanged: {}", path.display());
            return Ok(WriteResult::Unchanged {
                path: path.to_path_buf(),
            });
        }
        Ok(_) => {}
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => return Err(io_err(path, err)),
    }

    if dry_run {
        tracing::info!("[dry-run] would write: {}", path.display());
        return Ok(WriteResult::WouldWrite {
            path: path.to_path_buf(),
        });
    }

    let tmp = PathBuf::from(format!("{}.jobshard.tmp", path.display()));
    atomic_write(path, &content, &tmp)?;
    tracing::info!("wrote: {}", path.display());
    Ok(WriteResult::Written {
        path: path.to_path_buf(),
    })
}

/// The YAML a job set is written as.
pub fn serialize(job_set: &JobSet) -> Result<String, SyncError> {
    Ok(serde_yaml::to_string(job_set)?)
}

fn remove_file(path: &Path, dry_run: bool) -> Result<WriteResult, SyncError> {
    let path_buf = path.to_path_buf();
    if !path.exists() {
        return Ok(WriteResult::Unchanged { path: path_buf });
    }
    if dry_run {
        tracing::info!("[dry-run] would delete: {}", path.display());
        return Ok(WriteResult::WouldDelete { path: path_buf });
    }
    match std::fs::remove_file(path) {
        Ok(()) => {
            tracing::info!("deleted: {}", path.display());
            Ok(WriteResult::Deleted { path: path_buf })
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {
            Ok(WriteResult::Unchanged { path: path_buf })
        }
        Err(err) => Err(io_err(path, err)),
    }
}

fn atomic_write(path: &Path, content: &str, tmp: &Path) -> Result<(), SyncError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    std::fs::write(tmp, content).map_err(|e| io_err(tmp, e))?;
    if let Err(e) = std::fs::rename(tmp, path) {
        let _ = std::fs::remove_file(tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
