use tracing::{info, instrument};

use crate::api::{
    BackupAccess, BackupCreateRequest, BackupInfo, BackupShare, BackupShareUpdateRequest,
    BackupStatus,
};
use crate::config::WaitKind;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::probes;
use crate::status::{sets, TerminalStatusSet};

/// Volume backup ids of incremental backups carry this suffix.
pub const INCREMENTAL_SUFFIX: &str = "-incr";

/// Wait for `name` to reach one of `set`'s expected statuses.
#[instrument(skip(ctx, set))]
pub async fn wait_for_backup(
    ctx: &Context,
    org: &str,
    name: &str,
    set: &TerminalStatusSet<BackupStatus>,
) -> Result<BackupStatus> {
    let uid = ctx.api.backup_uid(org, name).await?;
    let api = ctx.api.as_ref();
    let status = ctx
        .wait(WaitKind::BackupCompletion, name, || {
            probes::backup_status(api, org, name, &uid, set)
        })
        .await?;
    Ok(status)
}

pub async fn wait_for_backup_success(ctx: &Context, org: &str, name: &str) -> Result<BackupStatus> {
    wait_for_backup(ctx, org, name, &sets::backup_success()).await
}

/// Create a backup and wait for it to succeed.
#[instrument(skip(ctx, request), fields(backup = %request.name, cluster = %request.cluster))]
pub async fn create_backup_and_wait(
    ctx: &Context,
    request: &BackupCreateRequest,
) -> Result<BackupStatus> {
    ctx.api.create_backup(request).await?;
    info!(namespaces = ?request.namespaces, "Backup created");
    wait_for_backup_success(ctx, &request.org_id, &request.name).await
}

/// Delete a backup and wait until it no longer shows up in the listing.
#[instrument(skip(ctx))]
pub async fn delete_backup_and_wait(ctx: &Context, org: &str, name: &str) -> Result<()> {
    let uid = ctx.api.backup_uid(org, name).await?;
    ctx.api.delete_backup(org, name, &uid).await?;
    info!("Backup delete requested");

    let api = ctx.api.as_ref();
    ctx.wait(WaitKind::BackupDeletion, name, || {
        probes::backup_absent(api, org, name)
    })
    .await?;
    Ok(())
}

/// Replace the share list of backup `name` with the given group and user ids.
#[instrument(skip(ctx))]
pub async fn share_backup(
    ctx: &Context,
    org: &str,
    name: &str,
    groups: &[String],
    users: &[String],
    access: BackupAccess,
) -> Result<()> {
    let uid = ctx.api.backup_uid(org, name).await?;
    let request = BackupShareUpdateRequest {
        org_id: org.to_string(),
        name: name.to_string(),
        uid,
        backup_share: BackupShare::with_access(groups, users, access),
    };
    ctx.api.update_backup_share(&request).await?;
    info!(groups = groups.len(), users = users.len(), "Backup shared");
    Ok(())
}

pub async fn inspect_backup_by_name(ctx: &Context, org: &str, name: &str) -> Result<BackupInfo> {
    let uid = ctx.api.backup_uid(org, name).await?;
    ctx.api.inspect_backup(org, name, &uid).await
}

/// Namespaces captured in a backup.
pub async fn backup_namespaces(ctx: &Context, org: &str, name: &str) -> Result<Vec<String>> {
    Ok(inspect_backup_by_name(ctx, org, name).await?.namespaces)
}

pub fn is_full_backup(info: &BackupInfo) -> bool {
    !info
        .volumes
        .iter()
        .any(|v| v.backup_id.ends_with(INCREMENTAL_SUFFIX))
}

/// Fail unless every volume in the backup was captured in full.
pub async fn ensure_full_backup(ctx: &Context, org: &str, name: &str) -> Result<()> {
    let info = inspect_backup_by_name(ctx, org, name).await?;
    if is_full_backup(&info) {
        return Ok(());
    }
    let incremental: Vec<&str> = info
        .volumes
        .iter()
        .filter(|v| v.backup_id.ends_with(INCREMENTAL_SUFFIX))
        .map(|v| v.name.as_str())
        .collect();
    Err(Error::Precondition(format!(
        "backup [{name}] is incremental for volumes {incremental:?}"
    )))
}
