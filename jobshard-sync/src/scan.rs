//! Concurrent job configuration directory scanner.
//!
//! A walker thread discovers candidate files and parses their
//! [`JobIdentity`]; a pool of worker threads pulls identities from a bounded
//! queue and loads each file into a [`JobSet`]; the calling thread receives
//! loaded pairs and hands them to the caller's handler.
//!
//! Files that do not follow the naming convention and files that fail to
//! load are logged and skipped. Handler errors are collected and reported
//! together once every worker has finished. Delivery order is unspecified.

use std::io::Read;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::thread;

use crossbeam_channel::{bounded, unbounded};
use flate2::read::GzDecoder;

use jobshard_core::{JobIdentity, JobSet};

use crate::aggregate::append;
use crate::error::{io_err, SyncError};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Scanner configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scanner {
    workers: usize,
    extension: String,
}

impl Default for Scanner {
    fn default() -> Self {
        Self {
            workers: thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
            extension: "yaml".to_string(),
        }
    }
}

impl Scanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the worker pool size (at least one).
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Walk `config_dir/sub_dir` and call `callback` with the identity of every
    /// file carrying the configuration extension. Files whose names do not
    /// follow the convention are skipped with a warning. An error from
    /// `callback` stops the walk and is returned.
    pub fn for_each_identity<F>(
        &self,
        config_dir: &Path,
        sub_dir: &Path,
        mut callback: F,
    ) -> Result<(), SyncError>
    where
        F: FnMut(JobIdentity) -> Result<(), SyncError>,
    {
        let root = scan_root(config_dir, sub_dir);
        match std::fs::symlink_metadata(&root) {
            Ok(meta) if !meta.is_dir() => self.visit_file(&root, &mut callback),
            Ok(_) => self.walk(&root, &mut callback),
            Err(err) => {
                tracing::error!("failed to walk {}: {err}", root.display());
                Ok(())
            }
        }
    }

    fn walk(
        &self,
        dir: &Path,
        callback: &mut dyn FnMut(JobIdentity) -> Result<(), SyncError>,
    ) -> Result<(), SyncError> {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::error!("failed to walk {}: {err}", dir.display());
                return Ok(());
            }
        };
        let mut entries: Vec<_> = entries
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    tracing::error!("failed to walk {}: {err}", dir.display());
                    None
                }
            })
            .collect();
        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            let path = entry.path();
            match entry.file_type() {
                Ok(ft) if ft.is_dir() => self.walk(&path, callback)?,
                Ok(_) => self.visit_file(&path, callback)?,
                Err(err) => tracing::error!("failed to walk {}: {err}", path.display()),
            }
        }
        Ok(())
    }

    fn visit_file(
        &self,
        path: &Path,
        callback: &mut dyn FnMut(JobIdentity) -> Result<(), SyncError>,
    ) -> Result<(), SyncError> {
        if path.extension().map_or(true, |ext| ext != self.extension.as_str()) {
            return Ok(());
        }
        match JobIdentity::from_path(path) {
            Ok(info) => callback(info),
            Err(err) => {
                tracing::warn!(
                    "failed to determine info for job config {}: {err}",
                    path.display()
                );
                Ok(())
            }
        }
    }

    /// Load every job configuration file under `config_dir/sub_dir` in
    /// parallel and call `handler` with each loaded set and its identity.
    ///
    /// `handler` runs on the calling thread. Its errors do not stop delivery
    /// of the remaining files; they are returned together after the scan.
    pub fn for_each_job_set<F>(
        &self,
        config_dir: &Path,
        sub_dir: &Path,
        mut handler: F,
    ) -> Result<(), SyncError>
    where
        F: FnMut(JobSet, JobIdentity) -> Result<(), SyncError>,
    {
        let (path_tx, path_rx) = bounded::<JobIdentity>(self.workers * 2);
        let (item_tx, item_rx) = unbounded::<(JobSet, JobIdentity)>();
        let mut errors = Vec::new();

        thread::scope(|scope| {
            let walker = scope.spawn(move || {
                self.for_each_identity(config_dir, sub_dir, |info| {
                    path_tx.send(info).map_err(|_| SyncError::WorkerPanicked)
                })
            });

            let mut workers = Vec::with_capacity(self.workers);
            for _ in 0..self.workers {
                let rx = path_rx.clone();
                let tx = item_tx.clone();
                workers.push(scope.spawn(move || {
                    for info in rx.iter() {
                        match read_job_set(&info.filename) {
                            Ok(set) => {
                                if tx.send((set, info)).is_err() {
                                    break;
                                }
                            }
                            Err(err) => tracing::error!(
                                "failed to read job config {}: {err}",
                                info.filename.display()
                            ),
                        }
                    }
                }));
            }
            // Channels disconnect once the walker and every worker are done.
            drop(path_rx);
            drop(item_tx);

            let mut delivered = 0usize;
            for (set, info) in item_rx.iter() {
                delivered += 1;
                if let Err(err) = handler(set, info) {
                    errors.push(err);
                }
            }

            match walker.join() {
                Ok(Ok(())) => {}
                Ok(Err(err)) => errors.push(err),
                Err(_) => errors.push(SyncError::WorkerPanicked),
            }
            for worker in workers {
                if worker.join().is_err() {
                    errors.push(SyncError::WorkerPanicked);
                }
            }
            tracing::debug!(
                "scanned {}: {delivered} job config(s) loaded",
                scan_root(config_dir, sub_dir).display()
            );
        });

        SyncError::aggregate(errors)
    }

    /// Load every job configuration file under `dir` and fold them into one
    /// set. Job names are assumed not to collide across files.
    pub fn read_from_dir(&self, dir: &Path) -> Result<JobSet, SyncError> {
        let mut job_set = JobSet::default();
        self.for_each_job_set(dir, Path::new(""), |part, _| {
            append(&mut job_set, part);
            Ok(())
        })?;
        Ok(job_set)
    }
}

/// [`Scanner::for_each_job_set`] with the default scanner over a whole tree.
pub fn for_each_job_set<F>(config_dir: &Path, handler: F) -> Result<(), SyncError>
where
    F: FnMut(JobSet, JobIdentity) -> Result<(), SyncError>,
{
    Scanner::default().for_each_job_set(config_dir, Path::new(""), handler)
}

/// [`Scanner::read_from_dir`] with the default scanner.
pub fn read_from_dir(dir: &Path) -> Result<JobSet, SyncError> {
    Scanner::default().read_from_dir(dir)
}

/// Load a single job configuration file, decompressing gzip content.
///
/// Empty content is an error, not an empty set.
pub fn read_job_set(path: &Path) -> Result<JobSet, SyncError> {
    let mut data = std::fs::read(path).map_err(|e| io_err(path, e))?;
    if data.starts_with(&GZIP_MAGIC) {
        let mut decoded = Vec::new();
        GzDecoder::new(data.as_slice())
            .read_to_end(&mut decoded)
            .map_err(|e| io_err(path, e))?;
        data = decoded;
    }
    if data.iter().all(u8::is_ascii_whitespace) {
        return Err(SyncError::EmptyContent {
            path: path.to_path_buf(),
        });
    }

    let parsed: Option<JobSet> =
        serde_yaml::from_slice(&data).map_err(|source| SyncError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    parsed.ok_or_else(|| SyncError::EmptyContent {
        path: path.to_path_buf(),
    })
}

fn scan_root(config_dir: &Path, sub_dir: &Path) -> PathBuf {
    if sub_dir.as_os_str().is_empty() {
        config_dir.to_path_buf()
    } else {
        config_dir.join(sub_dir)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
