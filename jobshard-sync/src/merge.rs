//! Reconciliation of freshly generated jobs with the jobs already on disk.
//!
//! Jobs are matched by name within each kind and repo grouping. Generated
//! jobs replace their on-disk counterparts except for the fields operators
//! are expected to tune by hand, which are carried over from the old job.
//! On-disk jobs with no generated counterpart survive only if the generator
//! did not consider them at all during this run.

use std::collections::{BTreeMap, BTreeSet};

use jobshard_core::{Job, JobSet, Periodic, Postsubmit, Presubmit, PROMOTION_LABEL};

/// Names of every job the generator produced during this run, per kind.
///
/// An on-disk job whose name is considered but which is missing from the
/// generated set it is being merged with was moved or removed on purpose.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsideredNames {
    pub presubmits: BTreeSet<String>,
    pub postsubmits: BTreeSet<String>,
    pub periodics: BTreeSet<String>,
}

impl ConsideredNames {
    /// Every job name in `job_set`, kept apart by kind.
    pub fn from_job_set(job_set: &JobSet) -> Self {
        let mut names = Self::default();
        names.extend_from(job_set);
        names
    }

    /// Add the names of every job in `job_set`.
    pub fn extend_from(&mut self, job_set: &JobSet) {
        self.presubmits.extend(
            job_set
                .presubmits
                .values()
                .flatten()
                .map(|j| j.name().to_string()),
        );
        self.postsubmits.extend(
            job_set
                .postsubmits
                .values()
                .flatten()
                .map(|j| j.name().to_string()),
        );
        self.periodics
            .extend(job_set.periodics.iter().map(|j| j.name().to_string()));
    }

    /// One set shared by all kinds: a name considered for any kind counts as
    /// considered for every kind.
    pub fn flat<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let all: BTreeSet<String> = names.into_iter().map(Into::into).collect();
        Self {
            presubmits: all.clone(),
            postsubmits: all.clone(),
            periodics: all,
        }
    }
}

/// Merge `source` (generated) into `destination` (on disk).
///
/// Only groupings present in `source` are reconciled; other groupings of
/// `destination` are left as they are. Periodics are reconciled only when
/// `source` has any. The order of merged lists is unspecified until sorted.
pub fn merge_job_sets(destination: &mut JobSet, source: &JobSet, considered: &ConsideredNames) {
    for (repo, jobs) in &source.presubmits {
        let old = destination.presubmits.remove(repo).unwrap_or_default();
        let merged = merge_jobs(old, jobs, &considered.presubmits, merge_presubmits);
        destination.presubmits.insert(repo.clone(), merged);
    }
    for (repo, jobs) in &source.postsubmits {
        let old = destination.postsubmits.remove(repo).unwrap_or_default();
        let merged = merge_jobs(old, jobs, &considered.postsubmits, merge_postsubmits);
        destination.postsubmits.insert(repo.clone(), merged);
    }
    if !source.periodics.is_empty() {
        let old = std::mem::take(&mut destination.periodics);
        destination.periodics =
            merge_jobs(old, &source.periodics, &considered.periodics, merge_periodics);
    }
}

fn merge_jobs<J, F>(old: Vec<J>, new: &[J], considered: &BTreeSet<String>, merge: F) -> Vec<J>
where
    J: Job + Clone,
    F: Fn(&J, &J) -> J,
{
    let mut old_jobs: BTreeMap<String, J> = old
        .into_iter()
        .map(|job| (job.name().to_string(), job))
        .collect();
    let new_jobs: BTreeMap<&str, &J> = new.iter().map(|job| (job.name(), job)).collect();

    let mut merged = Vec::with_capacity(new_jobs.len() + old_jobs.len());
    for (name, new_job) in &new_jobs {
        match old_jobs.remove(*name) {
            Some(old_job) => merged.push(merge(&old_job, *new_job)),
            None => merged.push((*new_job).clone()),
        }
    }
    for (name, old_job) in old_jobs {
        if !considered.contains(&name) {
            merged.push(old_job);
        }
    }
    merged
}

/// Start from `new`; keep hand-tunable trigger fields from `old` unless the
/// generator now sets its own change-path filter.
pub fn merge_presubmits(old: &Presubmit, new: &Presubmit) -> Presubmit {
    let mut merged = new.clone();

    merged.always_run = old.always_run;
    merged.run_if_changed = old.run_if_changed.clone();
    merged.skip_if_only_changed = old.skip_if_only_changed.clone();
    merged.optional = old.optional;
    merged.base.max_concurrency = old.base.max_concurrency;
    merged.skip_report = old.skip_report;
    if !old.base.cluster.is_empty() {
        merged.base.cluster = old.base.cluster.clone();
    }
    if !new.run_if_changed.is_empty() {
        merged.run_if_changed = new.run_if_changed.clone();
        merged.always_run = new.always_run;
    }
    if !new.skip_if_only_changed.is_empty() {
        merged.skip_if_only_changed = new.skip_if_only_changed.clone();
        merged.always_run = new.always_run;
    }

    merged
}

/// Start from `new`; keep `old`'s concurrency unless `new` is a promotion job.
pub fn merge_postsubmits(old: &Postsubmit, new: &Postsubmit) -> Postsubmit {
    let mut merged = new.clone();

    if !merged.base.labels.contains_key(PROMOTION_LABEL) {
        merged.base.max_concurrency = old.base.max_concurrency;
    }
    if !old.base.cluster.is_empty() {
        merged.base.cluster = old.base.cluster.clone();
    }

    merged
}

/// Start from `new`; keep `old`'s concurrency and reporting configuration.
pub fn merge_periodics(old: &Periodic, new: &Periodic) -> Periodic {
    let mut merged = new.clone();

    merged.base.max_concurrency = old.base.max_concurrency;
    merged.reporter_config = old.reporter_config.clone();
    if !old.base.cluster.is_empty() {
        merged.base.cluster = old.base.cluster.clone();
    }

    merged
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use jobshard_core::{JobBase, GENERATED, GENERATION_LABEL, NEWLY_GENERATED};
    use rstest::rstest;
    use serde_yaml::Value;

    use crate::sort::sort_job_set;

    use super::*;

    const KEY: &str = "org/repo";

    fn base(name: &str, marker: Option<&str>) -> JobBase {
        let mut base = JobBase::new(name);
        if let Some(marker) = marker {
            base.labels
                .insert(GENERATION_LABEL.to_string(), marker.to_string());
        }
        base
    }

    fn presubmit(name: &str, marker: Option<&str>) -> Presubmit {
        Presubmit {
            base: base(name, marker),
            ..Presubmit::default()
        }
    }

    fn postsubmit(name: &str, marker: Option<&str>) -> Postsubmit {
        Postsubmit {
            base: base(name, marker),
            ..Postsubmit::default()
        }
    }

    fn periodic(name: &str, marker: Option<&str>) -> Periodic {
        Periodic {
            base: base(name, marker),
            ..Periodic::default()
        }
    }

    fn presubmits(jobs: Vec<Presubmit>) -> JobSet {
        JobSet {
            presubmits: BTreeMap::from([(KEY.to_string(), jobs)]),
            ..JobSet::default()
        }
    }

    fn mixed() -> JobSet {
        JobSet {
            presubmits: BTreeMap::from([(
                KEY.to_string(),
                vec![presubmit("pull-a", Some(NEWLY_GENERATED)), presubmit("pull-b", None)],
            )]),
            postsubmits: BTreeMap::from([(
                KEY.to_string(),
                vec![postsubmit("branch-a", Some(NEWLY_GENERATED))],
            )]),
            periodics: vec![periodic("periodic-a", Some(NEWLY_GENERATED))],
        }
    }

    // -----------------------------------------------------------------------
    // Job set level
    // -----------------------------------------------------------------------

    #[test]
    fn merging_a_set_with_itself_is_identity() {
        let source = mixed();
        let mut destination = source.clone();
        merge_job_sets(&mut destination, &source, &ConsideredNames::from_job_set(&source));
        sort_job_set(&mut destination);
        let mut expected = source;
        sort_job_set(&mut expected);
        assert_eq!(destination, expected);
    }

    #[test]
    fn hand_authored_job_not_considered_passes_through() {
        let mut hand = presubmit("pull-hand", None);
        hand.base.max_concurrency = 7;
        let mut destination = presubmits(vec![hand.clone()]);
        let source = presubmits(vec![presubmit("pull-gen", Some(NEWLY_GENERATED))]);

        merge_job_sets(&mut destination, &source, &ConsideredNames::from_job_set(&source));

        let jobs = &destination.presubmits[KEY];
        assert_eq!(jobs.len(), 2);
        assert!(jobs.contains(&hand));
    }

    #[test]
    fn considered_job_missing_from_source_is_dropped() {
        let mut destination = presubmits(vec![presubmit("pull-moved", Some(GENERATED))]);
        let source = presubmits(vec![presubmit("pull-gen", Some(NEWLY_GENERATED))]);
        let considered = ConsideredNames::flat(["pull-gen", "pull-moved"]);

        merge_job_sets(&mut destination, &source, &considered);

        let names: Vec<_> = destination.presubmits[KEY].iter().map(|j| j.name()).collect();
        assert_eq!(names, ["pull-gen"]);
    }

    #[test]
    fn considered_names_are_scoped_per_kind() {
        let mut destination = JobSet {
            postsubmits: BTreeMap::from([(KEY.to_string(), vec![postsubmit("shared", None)])]),
            ..JobSet::default()
        };
        let source = JobSet {
            presubmits: BTreeMap::from([(KEY.to_string(), vec![presubmit("shared", None)])]),
            postsubmits: BTreeMap::from([(KEY.to_string(), vec![postsubmit("other", None)])]),
            ..JobSet::default()
        };

        let mut scoped = destination.clone();
        merge_job_sets(&mut scoped, &source, &ConsideredNames::from_job_set(&source));
        assert_eq!(scoped.postsubmits[KEY].len(), 2, "per-kind scope keeps the postsubmit");

        merge_job_sets(&mut destination, &source, &ConsideredNames::flat(["shared", "other"]));
        assert_eq!(destination.postsubmits[KEY].len(), 1, "flat scope drops it");
    }

    #[test]
    fn groupings_absent_from_source_are_untouched() {
        let mut destination = JobSet {
            presubmits: BTreeMap::from([(
                "org/other".to_string(),
                vec![presubmit("x", Some(GENERATED))],
            )]),
            periodics: vec![periodic("nightly", Some(GENERATED))],
            ..JobSet::default()
        };
        let before = destination.clone();
        let source = presubmits(vec![presubmit("pull-gen", Some(NEWLY_GENERATED))]);

        merge_job_sets(&mut destination, &source, &ConsideredNames::flat(["x", "nightly"]));

        assert_eq!(destination.presubmits["org/other"], before.presubmits["org/other"]);
        assert_eq!(destination.periodics, before.periodics);
        assert_eq!(destination.presubmits[KEY].len(), 1);
    }

    // -----------------------------------------------------------------------
    // Field rules
    // -----------------------------------------------------------------------

    #[test]
    fn presubmit_keeps_hand_tuned_fields() {
        let mut old = presubmit("job", None);
        old.always_run = false;
        old.optional = true;
        old.skip_report = true;
        old.run_if_changed = "^docs/".to_string();
        old.base.max_concurrency = 3;
        old.base.cluster = "build02".to_string();

        let mut new = presubmit("job", Some(NEWLY_GENERATED));
        new.always_run = true;
        new.base.cluster = "build01".to_string();
        new.branches = vec!["main".to_string()];

        let merged = merge_presubmits(&old, &new);
        assert!(!merged.always_run);
        assert!(merged.optional);
        assert!(merged.skip_report);
        assert_eq!(merged.run_if_changed, "^docs/");
        assert_eq!(merged.base.max_concurrency, 3);
        assert_eq!(merged.base.cluster, "build02");
        assert_eq!(merged.branches, ["main"]);
        assert_eq!(merged.base.generation_marker(), Some(NEWLY_GENERATED));
    }

    #[test]
    fn presubmit_empty_old_cluster_keeps_new_cluster() {
        let old = presubmit("job", None);
        let mut new = presubmit("job", None);
        new.base.cluster = "build01".to_string();
        assert_eq!(merge_presubmits(&old, &new).base.cluster, "build01");
    }

    #[rstest]
    #[case::run_if_changed("^src/", "", "^src/", "")]
    #[case::skip_if_only_changed("", "^docs/", "", "^docs/")]
    fn presubmit_generated_filter_wins(
        #[case] new_run: &str,
        #[case] new_skip: &str,
        #[case] want_run: &str,
        #[case] want_skip: &str,
    ) {
        let mut old = presubmit("job", None);
        old.always_run = true;
        old.run_if_changed = String::new();
        old.skip_if_only_changed = String::new();

        let mut new = presubmit("job", None);
        new.always_run = false;
        new.run_if_changed = new_run.to_string();
        new.skip_if_only_changed = new_skip.to_string();

        let merged = merge_presubmits(&old, &new);
        assert!(!merged.always_run);
        assert_eq!(merged.run_if_changed, want_run);
        assert_eq!(merged.skip_if_only_changed, want_skip);
    }

    #[test]
    fn presubmit_both_filters_take_new_values() {
        let mut old = presubmit("job", None);
        old.always_run = true;
        old.run_if_changed = "old-run".to_string();
        old.skip_if_only_changed = "old-skip".to_string();

        let mut new = presubmit("job", None);
        new.run_if_changed = "new-run".to_string();
        new.skip_if_only_changed = "new-skip".to_string();

        let merged = merge_presubmits(&old, &new);
        assert!(!merged.always_run);
        assert_eq!(merged.run_if_changed, "new-run");
        assert_eq!(merged.skip_if_only_changed, "new-skip");
    }

    #[rstest]
    #[case::regular(false, 5)]
    #[case::promotion(true, 1)]
    fn postsubmit_concurrency(#[case] promotion: bool, #[case] expected: u32) {
        let mut old = postsubmit("job", None);
        old.base.max_concurrency = 5;
        old.base.cluster = "build03".to_string();

        let mut new = postsubmit("job", Some(NEWLY_GENERATED));
        new.base.max_concurrency = 1;
        if promotion {
            new.base
                .labels
                .insert(PROMOTION_LABEL.to_string(), "true".to_string());
        }

        let merged = merge_postsubmits(&old, &new);
        assert_eq!(merged.base.max_concurrency, expected);
        assert_eq!(merged.base.cluster, "build03");
    }

    #[test]
    fn periodic_keeps_concurrency_and_reporting() {
        let mut old = periodic("job", None);
        old.base.max_concurrency = 2;
        old.reporter_config = Some(Value::from("slack"));

        let mut new = periodic("job", Some(NEWLY_GENERATED));
        new.base.max_concurrency = 9;
        new.base.cluster = "build01".to_string();
        new.base
            .extra
            .insert("cron".to_string(), Value::from("@daily"));

        let merged = merge_periodics(&old, &new);
        assert_eq!(merged.base.max_concurrency, 2);
        assert_eq!(merged.reporter_config, Some(Value::from("slack")));
        assert_eq!(merged.base.cluster, "build01");
        assert_eq!(merged.base.extra["cron"], Value::from("@daily"));
    }

    #[test]
    fn merge_does_not_alias_old_records() {
        let old = presubmit("job", Some(GENERATED));
        let mut destination = presubmits(vec![old.clone()]);
        let source = presubmits(vec![presubmit("job", Some(NEWLY_GENERATED))]);

        merge_job_sets(&mut destination, &source, &ConsideredNames::from_job_set(&source));
        destination.presubmits.get_mut(KEY).unwrap()[0]
            .base
            .labels
            .insert("extra".to_string(), "x".to_string());

        assert_eq!(source.presubmits[KEY][0].base.labels.len(), 1);
        assert_eq!(old.base.labels.len(), 1);
    }
}
