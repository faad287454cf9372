//! Control-plane API surface the harness drives.

pub mod rest;
pub mod types;

use async_trait::async_trait;

use crate::error::{Error, Result};
pub use rest::RestBackupClient;
pub use types::*;

/// Operations the harness issues against the backup control plane.
///
/// Inspect calls return `Error::NotFound` (or a 404 `Error::Api`) for missing objects.
#[async_trait]
pub trait BackupApi: Send + Sync {
    async fn version(&self) -> Result<VersionInfo>;
    async fn enumerate_organizations(&self) -> Result<Vec<ObjectRef>>;

    async fn inspect_backup(&self, org: &str, name: &str, uid: &str) -> Result<BackupInfo>;
    async fn enumerate_backups(&self, org: &str) -> Result<Vec<BackupInfo>>;
    async fn create_backup(&self, request: &BackupCreateRequest) -> Result<()>;
    async fn delete_backup(&self, org: &str, name: &str, uid: &str) -> Result<()>;

    async fn inspect_restore(&self, org: &str, name: &str) -> Result<RestoreInfo>;
    async fn create_restore(&self, request: &RestoreCreateRequest) -> Result<()>;
    async fn delete_restore(&self, org: &str, name: &str) -> Result<()>;

    async fn update_backup_share(&self, request: &BackupShareUpdateRequest) -> Result<()>;

    async fn enumerate_backup_schedules(&self, org: &str) -> Result<Vec<ObjectRef>>;
    async fn enumerate_schedule_policies(&self, org: &str) -> Result<Vec<ObjectRef>>;
    async fn update_backup_schedule(&self, request: &BackupScheduleUpdateRequest) -> Result<()>;

    async fn inspect_cluster(&self, org: &str, name: &str) -> Result<ClusterInfo>;
    async fn enumerate_clusters(&self, org: &str) -> Result<Vec<ClusterInfo>>;
    async fn delete_cluster(&self, org: &str, name: &str, uid: &str) -> Result<()>;
    async fn update_cluster_backup_share(
        &self,
        request: &ClusterBackupShareUpdateRequest,
    ) -> Result<()>;

    async fn enumerate_cloud_credentials(&self, org: &str) -> Result<Vec<ObjectRef>>;
    async fn delete_cloud_credential(&self, org: &str, name: &str, uid: &str) -> Result<()>;

    async fn enumerate_backup_locations(&self, org: &str) -> Result<Vec<ObjectRef>>;
    async fn delete_backup_location(
        &self,
        org: &str,
        name: &str,
        uid: &str,
        delete_backups: bool,
    ) -> Result<()>;

    async fn enumerate_rules(&self, org: &str) -> Result<Vec<ObjectRef>>;
    async fn delete_rule(&self, org: &str, name: &str, uid: &str) -> Result<()>;

    async fn inspect_license(&self, org: &str) -> Result<LicenseInfo>;

    /// Backup names created by `schedule`, oldest first.
    async fn schedule_backup_names(&self, org: &str, schedule: &str) -> Result<Vec<String>> {
        let mut backups: Vec<BackupInfo> = self
            .enumerate_backups(org)
            .await?
            .into_iter()
            .filter(|b| {
                b.backup_schedule
                    .as_ref()
                    .is_some_and(|s| s.name == schedule)
            })
            .collect();
        backups.sort_by_key(|b| b.create_time);
        Ok(backups.into_iter().map(|b| b.name).collect())
    }

    async fn backup_uid(&self, org: &str, name: &str) -> Result<String> {
        let backups = self.enumerate_backups(org).await?;
        backups
            .into_iter()
            .find(|b| b.name == name)
            .map(|b| b.uid)
            .ok_or_else(|| not_found("backup", name))
    }

    async fn cluster_uid(&self, org: &str, name: &str) -> Result<String> {
        let clusters = self.enumerate_clusters(org).await?;
        clusters
            .into_iter()
            .find(|c| c.name == name)
            .map(|c| c.uid)
            .ok_or_else(|| not_found("cluster", name))
    }

    async fn backup_schedule_uid(&self, org: &str, name: &str) -> Result<String> {
        find_uid(self.enumerate_backup_schedules(org).await?, "backup schedule", name)
    }

    async fn schedule_policy_uid(&self, org: &str, name: &str) -> Result<String> {
        find_uid(self.enumerate_schedule_policies(org).await?, "schedule policy", name)
    }

    async fn rule_uid(&self, org: &str, name: &str) -> Result<String> {
        find_uid(self.enumerate_rules(org).await?, "rule", name)
    }
}

fn find_uid(refs: Vec<ObjectRef>, kind: &'static str, name: &str) -> Result<String> {
    refs.into_iter()
        .find(|r| r.name == name)
        .map(|r| r.uid)
        .ok_or_else(|| not_found(kind, name))
}

fn not_found(kind: &'static str, name: &str) -> Error {
    Error::NotFound {
        kind,
        name: name.to_string(),
    }
}
