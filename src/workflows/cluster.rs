use tracing::{info, instrument};

use crate::api::{BackupShare, BackupShareStatus, ClusterBackupShareUpdateRequest, ClusterStatus};
use crate::config::WaitKind;
use crate::context::Context;
use crate::error::Result;
use crate::probes;
use crate::status::sets;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShareAction {
    Add,
    Remove,
}

/// Share (or unshare) every backup of `cluster` and wait for the update to apply.
#[instrument(skip(ctx, share))]
pub async fn update_cluster_backup_share(
    ctx: &Context,
    org: &str,
    cluster: &str,
    share: BackupShare,
    action: ShareAction,
) -> Result<BackupShareStatus> {
    let uid = ctx.api.cluster_uid(org, cluster).await?;
    let (add, del) = match action {
        ShareAction::Add => (Some(share), None),
        ShareAction::Remove => (None, Some(share)),
    };
    ctx.api
        .update_cluster_backup_share(&ClusterBackupShareUpdateRequest {
            org_id: org.to_string(),
            name: cluster.to_string(),
            uid,
            add_backup_share: add,
            del_backup_share: del,
        })
        .await?;
    info!("Cluster backup share update requested");

    let api = ctx.api.as_ref();
    let set = sets::cluster_backup_share();
    let status = ctx
        .wait(WaitKind::ClusterBackupShare, cluster, || {
            probes::cluster_backup_share_status(api, org, cluster, &set)
        })
        .await?;
    Ok(status)
}

#[instrument(skip(ctx))]
pub async fn wait_for_cluster_online(ctx: &Context, org: &str, cluster: &str) -> Result<ClusterStatus> {
    let api = ctx.api.as_ref();
    let set = sets::cluster_online();
    let status = ctx
        .wait(WaitKind::ClusterOnline, cluster, || {
            probes::cluster_status(api, org, cluster, &set)
        })
        .await?;
    Ok(status)
}

/// Remove a cluster from the control plane by name.
pub async fn delete_cluster(ctx: &Context, org: &str, cluster: &str) -> Result<()> {
    let uid = ctx.api.cluster_uid(org, cluster).await?;
    ctx.api.delete_cluster(org, cluster, &uid).await?;
    info!(cluster, "Cluster deleted");
    Ok(())
}
