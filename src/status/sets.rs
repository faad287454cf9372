//! Terminal status sets used by the built-in workflows.

use crate::api::{BackupShareStatus, BackupStatus, ClusterStatus, ReplacePolicy, RestoreStatus};
use crate::error::{Error, Result};

use super::terminal::TerminalStatusSet;

const BACKUP_UNEXPECTED: [BackupStatus; 3] = [
    BackupStatus::Invalid,
    BackupStatus::Aborted,
    BackupStatus::Failed,
];

const RESTORE_UNEXPECTED: [RestoreStatus; 3] = [
    RestoreStatus::Invalid,
    RestoreStatus::Aborted,
    RestoreStatus::Failed,
];

/// Backup finished with every resource captured.
pub fn backup_success() -> TerminalStatusSet<BackupStatus> {
    TerminalStatusSet::from_parts(
        "backup",
        vec![BackupStatus::Success],
        BACKUP_UNEXPECTED.to_vec(),
    )
}

/// Backup finished, possibly with some resources skipped.
pub fn backup_completed() -> TerminalStatusSet<BackupStatus> {
    TerminalStatusSet::from_parts(
        "backup",
        vec![BackupStatus::Success, BackupStatus::PartialSuccess],
        BACKUP_UNEXPECTED.to_vec(),
    )
}

pub fn restore_success() -> TerminalStatusSet<RestoreStatus> {
    TerminalStatusSet::from_parts(
        "restore",
        vec![RestoreStatus::PartialSuccess, RestoreStatus::Success],
        RESTORE_UNEXPECTED.to_vec(),
    )
}

/// Retain leaves existing resources untouched, which the control plane reports as a
/// partial success. Delete replaces them and must fully succeed.
pub fn restore_with_replace_policy(
    policy: ReplacePolicy,
) -> Result<TerminalStatusSet<RestoreStatus>> {
    let expected = match policy {
        ReplacePolicy::Delete => RestoreStatus::Success,
        ReplacePolicy::Retain => RestoreStatus::PartialSuccess,
        ReplacePolicy::Invalid => {
            return Err(Error::InvalidConfig(
                "restore replace policy must be Retain or Delete".to_string(),
            ))
        }
    };
    Ok(TerminalStatusSet::from_parts(
        "restore",
        vec![expected],
        RESTORE_UNEXPECTED.to_vec(),
    ))
}

pub fn cluster_backup_share() -> TerminalStatusSet<BackupShareStatus> {
    TerminalStatusSet::from_parts(
        "cluster backup share",
        vec![BackupShareStatus::Success],
        vec![BackupShareStatus::Failed],
    )
}

pub fn cluster_online() -> TerminalStatusSet<ClusterStatus> {
    TerminalStatusSet::from_parts(
        "cluster",
        vec![ClusterStatus::Online],
        vec![ClusterStatus::Failed, ClusterStatus::DeletePending],
    )
}
