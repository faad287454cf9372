use std::time::Duration;

use tracing::{info, instrument};

use crate::api::BackupScheduleUpdateRequest;
use crate::config::WaitKind;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::probes;
use crate::status::sets;

/// Which backup of a schedule to resolve
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScheduleBackup {
    /// 1-based, oldest first
    Ordinal(usize),
    First,
    Latest,
}

/// Resolve the name of a schedule's backup, waiting for it to be created.
#[instrument(skip(ctx))]
pub async fn schedule_backup_name(
    ctx: &Context,
    org: &str,
    schedule: &str,
    which: ScheduleBackup,
) -> Result<String> {
    let ordinal = match which {
        ScheduleBackup::Ordinal(n) => n,
        ScheduleBackup::First => 1,
        ScheduleBackup::Latest => {
            let names = ctx.api.schedule_backup_names(org, schedule).await?;
            return names.into_iter().last().ok_or_else(|| Error::NotFound {
                kind: "schedule backup",
                name: schedule.to_string(),
            });
        }
    };

    let api = ctx.api.as_ref();
    let name = ctx
        .wait(WaitKind::ScheduleBackupCreation, schedule, || {
            probes::schedule_backup_at(api, org, schedule, ordinal)
        })
        .await?;
    Ok(name)
}

/// Wait out one schedule interval, then for the schedule's next backup to appear and
/// succeed. Returns the new backup's name.
#[instrument(skip(ctx))]
pub async fn wait_for_next_schedule_backup(
    ctx: &Context,
    org: &str,
    schedule: &str,
    schedule_interval: Duration,
) -> Result<String> {
    let existing = ctx.api.schedule_backup_names(org, schedule).await?.len();
    info!(existing, "Waiting one schedule interval for the next backup");
    tokio::time::sleep(schedule_interval).await;

    let name = schedule_backup_name(ctx, org, schedule, ScheduleBackup::Ordinal(existing + 1))
        .await?;
    super::backup::wait_for_backup(ctx, org, &name, &sets::backup_success()).await?;
    Ok(name)
}

/// Suspend or resume a backup schedule.
#[instrument(skip(ctx))]
pub async fn set_schedule_suspended(
    ctx: &Context,
    org: &str,
    schedule: &str,
    schedule_policy: &str,
    suspend: bool,
) -> Result<()> {
    let uid = ctx.api.backup_schedule_uid(org, schedule).await?;
    let policy_uid = ctx.api.schedule_policy_uid(org, schedule_policy).await?;
    ctx.api
        .update_backup_schedule(&BackupScheduleUpdateRequest {
            org_id: org.to_string(),
            name: schedule.to_string(),
            uid,
            suspend,
            schedule_policy_ref: crate::api::ObjectRef::new(schedule_policy, policy_uid),
        })
        .await?;
    info!("Backup schedule updated");
    Ok(())
}
