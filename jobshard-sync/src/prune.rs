//! Removal of generated jobs that the current run did not refresh.

use jobshard_core::{Job, JobSet, GENERATED, GENERATION_LABEL};

/// Drop every stale generated job and finalize the marker of the rest.
///
/// Hand-authored jobs pass through untouched. A generated job is stale when
/// its marker is anything but `newly-generated`; surviving generated jobs are
/// relabelled `generated`. Groupings left without jobs are removed, so the
/// result may be completely empty.
pub fn prune(job_set: JobSet) -> JobSet {
    let mut pruned = JobSet::default();

    for (repo, jobs) in job_set.presubmits {
        let jobs = prune_jobs(jobs);
        if !jobs.is_empty() {
            pruned.presubmits.insert(repo, jobs);
        }
    }
    for (repo, jobs) in job_set.postsubmits {
        let jobs = prune_jobs(jobs);
        if !jobs.is_empty() {
            pruned.postsubmits.insert(repo, jobs);
        }
    }
    pruned.periodics = prune_jobs(job_set.periodics);

    pruned
}

fn prune_jobs<J: Job>(jobs: Vec<J>) -> Vec<J> {
    jobs.into_iter()
        .filter(|job| !job.base().is_stale())
        .map(|mut job| {
            if job.base().is_generated() {
                job.base_mut()
                    .labels
                    .insert(GENERATION_LABEL.to_string(), GENERATED.to_string());
            }
            job
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use jobshard_core::{JobBase, Periodic, Postsubmit, Presubmit, NEWLY_GENERATED};

    use super::*;

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

    #[test]
    fn newly_generated_is_demoted_and_stale_is_dropped() {
        let set = JobSet {
            presubmits: BTreeMap::from([(
                "org/repo".to_string(),
                vec![
                    presubmit("fresh", Some(NEWLY_GENERATED)),
                    presubmit("stale", Some(GENERATED)),
                    presubmit("hand", None),
                ],
            )]),
            ..JobSet::default()
        };

        let pruned = prune(set);
        let jobs = &pruned.presubmits["org/repo"];
        let names: Vec<_> = jobs.iter().map(|j| j.name()).collect();
        assert_eq!(names, ["fresh", "hand"]);
        assert_eq!(jobs[0].base.generation_marker(), Some(GENERATED));
        assert_eq!(jobs[1].base.generation_marker(), None);
    }

    #[test]
    fn any_other_marker_value_is_stale() {
        let set = JobSet {
            periodics: vec![periodic("legacy", Some("true"))],
            ..JobSet::default()
        };
        assert!(prune(set).is_empty());
    }

    #[test]
    fn emptied_groupings_are_removed() {
        let set = JobSet {
            postsubmits: BTreeMap::from([(
                "org/repo".to_string(),
                vec![postsubmit("stale", Some(GENERATED))],
            )]),
            ..JobSet::default()
        };
        let pruned = prune(set);
        assert!(pruned.postsubmits.is_empty());
        assert!(pruned.is_empty());
    }

    #[test]
    fn pruning_twice_removes_everything_generated() {
        let set = JobSet {
            periodics: vec![
                periodic("fresh", Some(NEWLY_GENERATED)),
                periodic("hand", None),
            ],
            ..JobSet::default()
        };
        let once = prune(set);
        assert_eq!(once.periodics.len(), 2);
        let twice = prune(once);
        let names: Vec<_> = twice.periodics.iter().map(|j| j.name()).collect();
        assert_eq!(names, ["hand"]);
    }
}
