//! Readiness of pods and completion of jobs, read from their status.

use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::Pod;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PodState {
    Ready,
    /// Ran to completion; counts as healthy for one-shot pods
    Completed,
    NotReady(String),
    Failed(String),
}

pub fn pod_name(pod: &Pod) -> &str {
    pod.metadata.name.as_deref().unwrap_or("unknown")
}

pub fn pod_state(pod: &Pod) -> PodState {
    let Some(status) = pod.status.as_ref() else {
        return PodState::NotReady("no status reported".to_string());
    };
    let phase = status.phase.as_deref().unwrap_or("Unknown");

    match phase {
        "Succeeded" => return PodState::Completed,
        "Failed" => {
            let reason = status
                .reason
                .clone()
                .or_else(|| status.message.clone())
                .unwrap_or_else(|| "pod failed".to_string());
            return PodState::Failed(reason);
        }
        _ => {}
    }

    let ready = status
        .conditions
        .as_ref()
        .and_then(|conds| conds.iter().find(|c| c.type_ == "Ready"))
        .is_some_and(|c| c.status == "True");

    if phase == "Running" && ready {
        return PodState::Ready;
    }

    // Surface the first waiting container's reason, e.g. CrashLoopBackOff
    let waiting = status
        .container_statuses
        .iter()
        .flatten()
        .find_map(|cs| cs.state.as_ref()?.waiting.as_ref()?.reason.clone());

    PodState::NotReady(match waiting {
        Some(reason) => format!("{phase}: {reason}"),
        None => phase.to_string(),
    })
}

pub fn skip_pod(pod: &Pod, skip_prefixes: &[String]) -> bool {
    let name = pod_name(pod);
    skip_prefixes.iter().any(|p| name.starts_with(p.as_str()))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobState {
    Running,
    Succeeded,
    Failed(String),
}

pub fn job_state(job: &Job) -> JobState {
    let Some(status) = job.status.as_ref() else {
        return JobState::Running;
    };

    if let Some(failed) = status
        .conditions
        .iter()
        .flatten()
        .find(|c| c.type_ == "Failed" && c.status == "True")
    {
        return JobState::Failed(
            failed
                .message
                .clone()
                .or_else(|| failed.reason.clone())
                .unwrap_or_else(|| "job failed".to_string()),
        );
    }

    if status.succeeded.unwrap_or(0) > 0 {
        JobState::Succeeded
    } else {
        JobState::Running
    }
}
