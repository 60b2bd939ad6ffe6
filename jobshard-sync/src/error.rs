//! Error types for jobshard-sync.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from scanning, reconciling and writing job files.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A job configuration file whose content is not a valid job set.
    #[error("failed to load job config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A job configuration file with no content at all.
    #[error("failed to load job config at {path}: file is empty")]
    EmptyContent { path: PathBuf },

    /// A job set could not be serialized for writing.
    #[error("failed to marshal the job config: {0}")]
    Serialize(#[from] serde_yaml::Error),

    /// A scan worker thread panicked.
    #[error("scan worker thread panicked")]
    WorkerPanicked,

    /// Several independent failures, reported together.
    #[error("{}", AggregateDisplay(.0))]
    Aggregate(Vec<SyncError>),
}

impl SyncError {
    /// Collapse collected errors: none is success, one is returned as is,
    /// more become [`SyncError::Aggregate`].
    pub fn aggregate(mut errors: Vec<SyncError>) -> Result<(), SyncError> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(SyncError::Aggregate(errors)),
        }
    }
}

struct AggregateDisplay<'a>(&'a [SyncError]);

impl fmt::Display for AggregateDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{err}")?;
        }
        f.write_str("]")
    }
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
