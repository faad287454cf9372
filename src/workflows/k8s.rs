use std::collections::BTreeMap;

use tracing::{info, instrument};

use crate::config::WaitKind;
use crate::context::Context;
use crate::error::Result;
use crate::probes;

/// Delete a job and wait for it to disappear. A job that is already gone counts as deleted.
#[instrument(skip(ctx))]
pub async fn delete_job_and_wait(ctx: &Context, namespace: &str, name: &str) -> Result<()> {
    match ctx.cluster.delete_job(namespace, name).await {
        Err(e) if e.is_not_found() => {
            info!("Job already deleted");
            return Ok(());
        }
        other => other?,
    }
    let cluster = ctx.cluster.as_ref();
    ctx.wait(WaitKind::JobDeletion, name, || {
        probes::job_deleted(cluster, namespace, name)
    })
    .await?;
    Ok(())
}

#[instrument(skip(ctx))]
pub async fn wait_for_job_completion(ctx: &Context, namespace: &str, name: &str) -> Result<()> {
    let cluster = ctx.cluster.as_ref();
    ctx.wait(WaitKind::JobCompletion, name, || {
        probes::job_completed(cluster, namespace, name)
    })
    .await?;
    Ok(())
}

/// Wait for every pod matching `labels` in `namespace` to be ready.
#[instrument(skip(ctx))]
pub async fn validate_pods_by_label(
    ctx: &Context,
    namespace: &str,
    labels: &BTreeMap<String, String>,
) -> Result<usize> {
    let cluster = ctx.cluster.as_ref();
    let ready = ctx
        .wait(WaitKind::PodReady, namespace, || {
            probes::pods_ready(cluster, namespace, labels, &[])
        })
        .await?;
    Ok(ready)
}

/// Wait for every pod in `namespace` to be ready, ignoring the configured short-lived pods.
#[instrument(skip(ctx))]
pub async fn validate_all_pods(ctx: &Context, namespace: &str) -> Result<usize> {
    let cluster = ctx.cluster.as_ref();
    let labels = BTreeMap::new();
    let skip = &ctx.config.platform.skip_pod_prefixes;
    let ready = ctx
        .wait(WaitKind::PodReady, namespace, || {
            probes::pods_ready(cluster, namespace, &labels, skip)
        })
        .await?;
    info!(ready, "All pods ready");
    Ok(ready)
}

#[instrument(skip(ctx))]
pub async fn delete_namespace_and_wait(ctx: &Context, namespace: &str) -> Result<()> {
    match ctx.cluster.delete_namespace(namespace).await {
        Err(e) if e.is_not_found() => return Ok(()),
        other => other?,
    }
    let cluster = ctx.cluster.as_ref();
    ctx.wait(WaitKind::NamespaceDeletion, namespace, || {
        probes::namespace_deleted(cluster, namespace)
    })
    .await?;
    Ok(())
}
