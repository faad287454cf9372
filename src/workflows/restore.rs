use tracing::{info, instrument};

use crate::api::{ReplacePolicy, RestoreCreateRequest, RestoreStatus};
use crate::config::WaitKind;
use crate::context::Context;
use crate::error::Result;
use crate::probes;
use crate::status::{sets, TerminalStatusSet};

#[instrument(skip(ctx, set))]
pub async fn wait_for_restore(
    ctx: &Context,
    org: &str,
    name: &str,
    set: &TerminalStatusSet<RestoreStatus>,
) -> Result<RestoreStatus> {
    let api = ctx.api.as_ref();
    let status = ctx
        .wait(WaitKind::RestoreCompletion, name, || {
            probes::restore_status(api, org, name, set)
        })
        .await?;
    Ok(status)
}

pub async fn wait_for_restore_success(
    ctx: &Context,
    org: &str,
    name: &str,
) -> Result<RestoreStatus> {
    wait_for_restore(ctx, org, name, &sets::restore_success()).await
}

/// Wait for the status a restore with `policy` is expected to end in.
pub async fn wait_for_restore_with_replace_policy(
    ctx: &Context,
    org: &str,
    name: &str,
    policy: ReplacePolicy,
) -> Result<RestoreStatus> {
    let set = sets::restore_with_replace_policy(policy)?;
    wait_for_restore(ctx, org, name, &set).await
}

/// Create a restore and wait for it. With a replace policy set, the restore must end
/// in that policy's status; otherwise any successful status is accepted.
#[instrument(skip(ctx, request), fields(restore = %request.name, backup = %request.backup.name))]
pub async fn create_restore_and_wait(
    ctx: &Context,
    request: &RestoreCreateRequest,
) -> Result<RestoreStatus> {
    let set = match request.replace_policy {
        Some(policy) => sets::restore_with_replace_policy(policy)?,
        None => sets::restore_success(),
    };
    ctx.api.create_restore(request).await?;
    info!(cluster = %request.cluster, "Restore created");
    wait_for_restore(ctx, &request.org_id, &request.name, &set).await
}

pub async fn delete_restore(ctx: &Context, org: &str, name: &str) -> Result<()> {
    ctx.api.delete_restore(org, name).await?;
    info!(restore = name, "Restore deleted");
    Ok(())
}
