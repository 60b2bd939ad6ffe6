//! Folding partial job sets into one.

use jobshard_core::JobSet;

/// Append every job of `part` to `dest`, concatenating per repo grouping.
///
/// Job names are assumed to be disjoint across the sets being folded; no
/// deduplication happens here.
pub fn append(dest: &mut JobSet, part: JobSet) {
    for (repo, jobs) in part.presubmits {
        dest.presubmits.entry(repo).or_default().extend(jobs);
    }
    for (repo, jobs) in part.postsubmits {
        dest.postsubmits.entry(repo).or_default().extend(jobs);
    }
    dest.periodics.extend(part.periodics);
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use jobshard_core::{JobBase, Periodic, Postsubmit, Presubmit};

    use super::*;

    fn presubmit(name: &str) -> Presubmit {
        Presubmit {
            base: JobBase::new(name),
            ..Presubmit::default()
        }
    }

    #[test]
    fn concatenates_shared_groupings_and_keeps_others() {
        let mut dest = JobSet {
            presubmits: BTreeMap::from([("org/a".to_string(), vec![presubmit("a1")])]),
            ..JobSet::default()
        };
        let part = JobSet {
            presubmits: BTreeMap::from([
                ("org/a".to_string(), vec![presubmit("a2")]),
                ("org/b".to_string(), vec![presubmit("b1")]),
            ]),
            postsubmits: BTreeMap::from([(
                "org/a".to_string(),
                vec![Postsubmit {
                    base: JobBase::new("post"),
                    ..Postsubmit::default()
                }],
            )]),
            periodics: vec![Periodic {
                base: JobBase::new("nightly"),
                ..Periodic::default()
            }],
        };

        append(&mut dest, part);

        let names: Vec<_> = dest.presubmits["org/a"].iter().map(|j| j.base.name.as_str()).collect();
        assert_eq!(names, ["a1", "a2"]);
        assert_eq!(dest.presubmits["org/b"].len(), 1);
        assert_eq!(dest.postsubmits["org/a"].len(), 1);
        assert_eq!(dest.periodics.len(), 1);
        assert_eq!(dest.job_count(), 5);
    }

    #[test]
    fn appending_empty_is_a_noop() {
        let mut dest = JobSet {
            periodics: vec![Periodic {
                base: JobBase::new("nightly"),
                ..Periodic::default()
            }],
            ..JobSet::default()
        };
        let before = dest.clone();
        append(&mut dest, JobSet::default());
        assert_eq!(dest, before);
    }
}
