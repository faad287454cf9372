use std::collections::BTreeMap;

use crate::cluster::pods::{job_state, pod_name, pod_state, skip_pod, JobState, PodState};
use crate::cluster::ClusterApi;
use crate::error::Error;
use crate::retry::Attempt;

/// Done once the job is gone. Query errors other than NotFound are retried.
pub async fn job_deleted(cluster: &dyn ClusterApi, namespace: &str, name: &str) -> Attempt<()> {
    match cluster.get_job(namespace, name).await {
        Err(e) if e.is_not_found() => Attempt::Done(()),
        Err(e) => Attempt::pending(format!("inspecting job [{namespace}/{name}] failed: {e}")),
        Ok(_) => Attempt::pending(format!("job [{namespace}/{name}] still exists")),
    }
}

pub async fn job_completed(cluster: &dyn ClusterApi, namespace: &str, name: &str) -> Attempt<()> {
    let job = match cluster.get_job(namespace, name).await {
        Ok(job) => job,
        Err(e) => return Attempt::failed(e),
    };
    match job_state(&job) {
        JobState::Succeeded => Attempt::Done(()),
        JobState::Running => Attempt::pending(format!("job [{namespace}/{name}] is running")),
        JobState::Failed(reason) => Attempt::failed(Error::UnexpectedStatus {
            kind: "job",
            name: format!("{namespace}/{name}"),
            expected: "[Complete]".to_string(),
            actual: "Failed".to_string(),
            reason,
        }),
    }
}

/// Done with the number of checked pods once every matching pod is ready.
///
/// Pods whose names start with one of `skip_prefixes` are ignored. An empty
/// match is still pending: the pods may not have been scheduled yet.
pub async fn pods_ready(
    cluster: &dyn ClusterApi,
    namespace: &str,
    labels: &BTreeMap<String, String>,
    skip_prefixes: &[String],
) -> Attempt<usize> {
    let pods = match cluster.list_pods(namespace, labels).await {
        Ok(pods) => pods,
        Err(e) => return Attempt::failed(e),
    };

    let mut checked = 0;
    let mut not_ready = Vec::new();
    for pod in pods.iter().filter(|p| !skip_pod(p, skip_prefixes)) {
        checked += 1;
        match pod_state(pod) {
            PodState::Ready | PodState::Completed => {}
            PodState::NotReady(why) => not_ready.push(format!("{} ({why})", pod_name(pod))),
            PodState::Failed(reason) => {
                return Attempt::failed(Error::UnexpectedStatus {
                    kind: "pod",
                    name: format!("{namespace}/{}", pod_name(pod)),
                    expected: "[Running]".to_string(),
                    actual: "Failed".to_string(),
                    reason,
                })
            }
        }
    }

    if checked == 0 {
        return Attempt::pending(format!("no pods found in namespace [{namespace}]"));
    }
    if not_ready.is_empty() {
        Attempt::Done(checked)
    } else {
        Attempt::pending_with(
            checked,
            format!("pods not ready in [{namespace}]: {}", not_ready.join(", ")),
        )
    }
}

/// Done once the namespace is gone. A namespace that still exists, Terminating or
/// not, keeps the wait going.
pub async fn namespace_deleted(cluster: &dyn ClusterApi, name: &str) -> Attempt<()> {
    match cluster.get_namespace(name).await {
        Err(e) if e.is_not_found() => Attempt::Done(()),
        Err(e) => Attempt::pending(format!("inspecting namespace [{name}] failed: {e}")),
        Ok(ns) => {
            let phase = ns
                .status
                .and_then(|s| s.phase)
                .unwrap_or_else(|| "Unknown".to_string());
            Attempt::pending(format!("namespace [{name}] is {phase}"))
        }
    }
}
