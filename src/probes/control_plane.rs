//! Probes that query the backup control plane.
//!
//! Status probes treat a failed query as fatal. Absence and creation probes treat it
//! as "not yet" because the object may be mid-deletion or not created.

use crate::api::{
    BackupApi, BackupShareStatus, BackupStatus, ClusterStatus, ObjectRef, RestoreStatus,
};
use crate::error::{Error, Result};
use crate::retry::Attempt;
use crate::status::TerminalStatusSet;

pub async fn backup_status(
    api: &dyn BackupApi,
    org: &str,
    name: &str,
    uid: &str,
    set: &TerminalStatusSet<BackupStatus>,
) -> Attempt<BackupStatus> {
    match api.inspect_backup(org, name, uid).await {
        Ok(info) => set.classify(name, info.status.status, &info.status.reason),
        Err(e) => Attempt::failed(e),
    }
}

pub async fn restore_status(
    api: &dyn BackupApi,
    org: &str,
    name: &str,
    set: &TerminalStatusSet<RestoreStatus>,
) -> Attempt<RestoreStatus> {
    match api.inspect_restore(org, name).await {
        Ok(info) => set.classify(name, info.status.status, &info.status.reason),
        Err(e) => Attempt::failed(e),
    }
}

pub async fn cluster_status(
    api: &dyn BackupApi,
    org: &str,
    cluster: &str,
    set: &TerminalStatusSet<ClusterStatus>,
) -> Attempt<ClusterStatus> {
    match api.inspect_cluster(org, cluster).await {
        Ok(info) => set.classify(cluster, info.status.status, &info.status.reason),
        Err(e) => Attempt::failed(e),
    }
}

pub async fn cluster_backup_share_status(
    api: &dyn BackupApi,
    org: &str,
    cluster: &str,
    set: &TerminalStatusSet<BackupShareStatus>,
) -> Attempt<BackupShareStatus> {
    match api.inspect_cluster(org, cluster).await {
        Ok(info) => match info.backup_share_status_info {
            Some(share) => set.classify(cluster, share.status, &share.reason),
            None => Attempt::pending(format!(
                "cluster [{cluster}] has not reported a backup share status yet"
            )),
        },
        Err(e) => Attempt::failed(e),
    }
}

/// Name of the `ordinal`-th backup (1-based, oldest first) created by `schedule`.
/// Listing errors are retried.
pub async fn schedule_backup_at(
    api: &dyn BackupApi,
    org: &str,
    schedule: &str,
    ordinal: usize,
) -> Attempt<String> {
    if ordinal == 0 {
        return Attempt::failed(Error::Precondition(format!(
            "schedule backup ordinal for [{schedule}] must be at least 1"
        )));
    }
    match api.schedule_backup_names(org, schedule).await {
        Ok(names) => match names.into_iter().nth(ordinal - 1) {
            Some(name) => Attempt::Done(name),
            None => Attempt::pending(format!(
                "schedule [{schedule}] has not created backup #{ordinal} yet"
            )),
        },
        Err(e) => Attempt::pending(format!(
            "listing backups of schedule [{schedule}] failed: {e}"
        )),
    }
}

/// Compare a consumed license count with the expected value.
pub fn classify_license_count(consumed: i64, expected: i64) -> Attempt<i64> {
    if consumed == expected {
        Attempt::Done(consumed)
    } else {
        Attempt::pending_with(
            consumed,
            format!("actual license count: {consumed}, expected license count: {expected}"),
        )
    }
}

pub async fn license_consumed(
    api: &dyn BackupApi,
    org: &str,
    feature: Option<&str>,
    expected: i64,
) -> Attempt<i64> {
    let info = match api.inspect_license(org).await {
        Ok(info) => info,
        Err(e) => return Attempt::failed(e),
    };
    match info.feature(feature) {
        Some(f) => classify_license_count(f.consumed, expected),
        None => Attempt::failed(Error::Precondition(match feature {
            Some(name) => format!("license does not report feature [{name}]"),
            None => "license reports no features".to_string(),
        })),
    }
}

/// Done once `name` is missing from `listed`.
pub fn absence(kind: &str, name: &str, listed: Result<Vec<String>>) -> Attempt<()> {
    match listed {
        Ok(names) if names.iter().any(|n| n == name) => {
            Attempt::pending(format!("{kind} [{name}] still exists"))
        }
        Ok(_) => Attempt::Done(()),
        Err(e) => Attempt::pending(format!("listing {kind}s failed: {e}")),
    }
}

fn names(refs: Result<Vec<ObjectRef>>) -> Result<Vec<String>> {
    refs.map(|refs| refs.into_iter().map(|r| r.name).collect())
}

pub async fn backup_absent(api: &dyn BackupApi, org: &str, name: &str) -> Attempt<()> {
    let listed = api
        .enumerate_backups(org)
        .await
        .map(|backups| backups.into_iter().map(|b| b.name).collect());
    absence("backup", name, listed)
}

pub async fn cloud_credential_absent(api: &dyn BackupApi, org: &str, name: &str) -> Attempt<()> {
    absence(
        "cloud credential",
        name,
        names(api.enumerate_cloud_credentials(org).await),
    )
}

pub async fn backup_location_absent(api: &dyn BackupApi, org: &str, name: &str) -> Attempt<()> {
    absence(
        "backup location",
        name,
        names(api.enumerate_backup_locations(org).await),
    )
}
