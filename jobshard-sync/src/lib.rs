//! # jobshard-sync
//!
//! Loading, reconciling and writing sharded job configuration trees.
//!
//! Read path: [`Scanner`] → [`append`]. Reconciliation path: [`write_to_dir`]
//! shards a repository's generated jobs, then runs [`merge_job_sets`],
//! [`prune`] and [`sort_job_set`] against each existing file before writing.

pub mod aggregate;
pub mod diff;
pub mod error;
pub mod merge;
pub mod prune;
pub mod scan;
pub mod sort;
pub mod writer;

pub use aggregate::append;
pub use diff::{diff_repo, FileDiff};
pub use error::SyncError;
pub use merge::{merge_job_sets, ConsideredNames};
pub use prune::prune;
pub use scan::{for_each_job_set, read_from_dir, read_job_set, Scanner};
pub use sort::sort_job_set;
pub use writer::{
    plan_repo, shard_job_set, write_to_dir, write_to_file, PlannedFile, WriteOptions, WriteResult,
};
