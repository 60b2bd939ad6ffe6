//! jobshard core library: the job record schema and file identity.
//!
//! - [`types`]: job records and [`JobSet`]
//! - [`identity`]: [`JobIdentity`] parsing and filename labels
//! - [`error`]: [`PathInfoError`]

pub mod error;
pub mod identity;
pub mod types;

pub use error::PathInfoError;
pub use identity::{basename_for, make_filename_label, JobIdentity};
pub use types::{
    repo_key, Container, EnvVar, Job, JobBase, JobKind, JobSet, PodSpec, Periodic, Postsubmit,
    Presubmit, Refs, Volume, VolumeMount, GENERATED, GENERATION_LABEL, JOB_RUNNER_ENTRYPOINT,
    NEWLY_GENERATED, PROMOTION_LABEL,
};
