//! Deterministic ordering of job sets so serialized output is stable.

use jobshard_core::{Job, JobSet, PodSpec};

/// Sort every job list by name and normalize the order of name-keyed arrays
/// inside each job's execution spec. Has no semantic effect.
pub fn sort_job_set(job_set: &mut JobSet) {
    for jobs in job_set.presubmits.values_mut() {
        sort_jobs(jobs);
    }
    for jobs in job_set.postsubmits.values_mut() {
        sort_jobs(jobs);
    }
    sort_jobs(&mut job_set.periodics);
}

fn sort_jobs<J: Job>(jobs: &mut [J]) {
    jobs.sort_by(|a, b| a.name().cmp(b.name()));
    for job in jobs.iter_mut() {
        if let Some(spec) = job.base_mut().spec.as_mut() {
            sort_pod_spec(spec);
        }
    }
}

/// Order volumes, containers, volume mounts and env vars by name. Job-runner
/// containers also get their flag arguments sorted.
pub fn sort_pod_spec(spec: &mut PodSpec) {
    spec.volumes.sort_by(|a, b| a.name.cmp(&b.name));
    spec.containers.sort_by(|a, b| a.name.cmp(&b.name));
    for container in &mut spec.containers {
        container.volume_mounts.sort_by(|a, b| a.name.cmp(&b.name));
        if container.runs_job_runner() {
            container.args.sort();
        }
        container.env.sort_by(|a, b| a.name.cmp(&b.name));
    }
}
