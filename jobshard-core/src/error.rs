//! Error types for jobshard-core.

use std::path::PathBuf;

use thiserror::Error;

/// A file path that does not follow the job configuration naming convention.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathInfoError {
    /// The parent directory name could not be resolved.
    #[error("could not extract repo from '{}'", .path.display())]
    NoRepo { path: PathBuf },

    /// The grandparent directory name could not be resolved.
    #[error("could not extract org from '{}'", .path.display())]
    NoOrg { path: PathBuf },

    /// The basename does not start with `<org>-<repo>-`.
    #[error("file name was not prefixed with {prefix:?}: {basename:?}")]
    MissingPrefix { prefix: String, basename: String },

    /// No kind-separating dash and the suffix is not `periodics`.
    #[error("file name does not contain job type: {basename:?}")]
    MissingKind { basename: String },

    /// The final dash-delimited segment is not a known job kind.
    #[error("file name has unknown job type {token:?}: {basename:?}")]
    UnknownKind { token: String, basename: String },
}
