//! Job definition records as they appear in the job configuration tree.
//!
//! Only the fields that reconciliation reads or rewrites are modelled
//! explicitly. Everything else is carried through the `extra` catch-all maps so
//! a load → merge → write cycle never drops fields this crate does not know.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

// ---------------------------------------------------------------------------
// Labels
// ---------------------------------------------------------------------------

/// Label key carrying the generation marker.
pub const GENERATION_LABEL: &str = "ci-operator.openshift.io/prowgen-controlled";

/// Marker value for a job produced by a previous run and confirmed still wanted.
pub const GENERATED: &str = "generated";

/// Marker value for a job produced by the current run and not yet finalized.
pub const NEWLY_GENERATED: &str = "newly-generated";

/// Label key present on postsubmits that promote build outputs.
pub const PROMOTION_LABEL: &str = "ci-operator.openshift.io/is-promotion";

/// Container command whose arguments are position-independent flags.
pub const JOB_RUNNER_ENTRYPOINT: &str = "ci-operator";

/// Extra fields this crate passes through without interpreting.
pub type Extra = BTreeMap<String, Value>;

// ---------------------------------------------------------------------------
// JobKind
// ---------------------------------------------------------------------------

/// The three kinds of job a configuration file can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Presubmit,
    Postsubmit,
    Periodic,
}

impl JobKind {
    /// All kinds, in file-layout order.
    pub fn all() -> &'static [JobKind] {
        &[JobKind::Presubmit, JobKind::Postsubmit, JobKind::Periodic]
    }

    /// Token used as the final segment of a file name (`presubmits`, ...).
    pub fn file_token(self) -> &'static str {
        match self {
            JobKind::Presubmit => "presubmits",
            JobKind::Postsubmit => "postsubmits",
            JobKind::Periodic => "periodics",
        }
    }

    /// Inverse of [`JobKind::file_token`].
    pub fn from_file_token(token: &str) -> Option<Self> {
        match token {
            "presubmits" => Some(JobKind::Presubmit),
            "postsubmits" => Some(JobKind::Postsubmit),
            "periodics" => Some(JobKind::Periodic),
            _ => None,
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_token())
    }
}

// ---------------------------------------------------------------------------
// Execution spec
// ---------------------------------------------------------------------------

/// Pod-like execution spec. Copied and reordered, never interpreted.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PodSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<Volume>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub containers: Vec<Container>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Container {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
    #[serde(
        default,
        rename = "volumeMounts",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub volume_mounts: Vec<VolumeMount>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Container {
    /// True when the command is exactly the job-runner entrypoint.
    pub fn runs_job_runner(&self) -> bool {
        self.command.len() == 1 && self.command[0] == JOB_RUNNER_ENTRYPOINT
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Volume {
    pub name: String,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VolumeMount {
    pub name: String,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    #[serde(flatten)]
    pub extra: Extra,
}

// ---------------------------------------------------------------------------
// Jobs
// ---------------------------------------------------------------------------

/// Fields shared by every job kind.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct JobBase {
    /// Merge key: unique per kind and repo within one file.
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub max_concurrency: u32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cluster: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<PodSpec>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl JobBase {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Value of the generation marker, if the job carries one.
    pub fn generation_marker(&self) -> Option<&str> {
        self.labels.get(GENERATION_LABEL).map(String::as_str)
    }

    /// True if the job was produced by the generator (any marker value).
    pub fn is_generated(&self) -> bool {
        self.generation_marker().is_some()
    }

    /// True if the job was generated by an earlier run and not refreshed by
    /// this one.
    pub fn is_stale(&self) -> bool {
        matches!(self.generation_marker(), Some(marker) if marker != NEWLY_GENERATED)
    }
}

/// A job run against proposed changes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Presubmit {
    #[serde(flatten)]
    pub base: JobBase,
    #[serde(default, skip_serializing_if = "is_false")]
    pub always_run: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub run_if_changed: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub skip_if_only_changed: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub skip_report: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub branches: Vec<String>,
}

/// A job run after changes merge.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Postsubmit {
    #[serde(flatten)]
    pub base: JobBase,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub branches: Vec<String>,
}

/// A job run on a schedule.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Periodic {
    #[serde(flatten)]
    pub base: JobBase,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_refs: Vec<Refs>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reporter_config: Option<Value>,
}

impl Periodic {
    /// The primary execution context, if any.
    pub fn primary_ref(&self) -> Option<&Refs> {
        self.extra_refs.first()
    }
}

/// A repository reference a periodic executes against.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Refs {
    pub org: String,
    pub repo: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub base_ref: String,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Uniform access to the common fields of every job kind.
pub trait Job {
    fn base(&self) -> &JobBase;
    fn base_mut(&mut self) -> &mut JobBase;

    fn name(&self) -> &str {
        &self.base().name
    }
}

impl Job for Presubmit {
    fn base(&self) -> &JobBase {
        &self.base
    }
    fn base_mut(&mut self) -> &mut JobBase {
        &mut self.base
    }
}

impl Job for Postsubmit {
    fn base(&self) -> &JobBase {
        &self.base
    }
    fn base_mut(&mut self) -> &mut JobBase {
        &mut self.base
    }
}

impl Job for Periodic {
    fn base(&self) -> &JobBase {
        &self.base
    }
    fn base_mut(&mut self) -> &mut JobBase {
        &mut self.base
    }
}

// ---------------------------------------------------------------------------
// JobSet
// ---------------------------------------------------------------------------

/// The content of one job configuration file, or the fold of many.
///
/// Presubmits and postsubmits are grouped under an `org/repo` key; periodics
/// carry their repository in [`Periodic::extra_refs`] instead.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct JobSet {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub presubmits: BTreeMap<String, Vec<Presubmit>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub postsubmits: BTreeMap<String, Vec<Postsubmit>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub periodics: Vec<Periodic>,
}

impl JobSet {
    /// True when no member holds any grouping or job.
    pub fn is_empty(&self) -> bool {
        self.presubmits.is_empty() && self.postsubmits.is_empty() && self.periodics.is_empty()
    }

    /// Total number of jobs across all kinds.
    pub fn job_count(&self) -> usize {
        self.presubmits.values().map(Vec::len).sum::<usize>()
            + self.postsubmits.values().map(Vec::len).sum::<usize>()
            + self.periodics.len()
    }
}

/// `org/repo` grouping key.
pub fn repo_key(org: &str, repo: &str) -> String {
    format!("{org}/{repo}")
}

fn is_false(b: &bool) -> bool {
    !*b
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
