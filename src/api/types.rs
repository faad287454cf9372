use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Name/UID pair used to reference control-plane objects
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectRef {
    pub name: String,
    #[serde(default)]
    pub uid: String,
}

impl ObjectRef {
    pub fn new(name: impl Into<String>, uid: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uid: uid.into(),
        }
    }
}

/// Status enum plus the control plane's human-readable reason
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusInfo<S> {
    pub status: S,
    #[serde(default)]
    pub reason: String,
}

impl<S> StatusInfo<S> {
    pub fn new(status: S, reason: impl Into<String>) -> Self {
        Self {
            status,
            reason: reason.into(),
        }
    }
}

/// A status enumeration reported by the control plane.
pub trait StatusEnum: Copy + Eq + fmt::Debug + fmt::Display + Send + Sync + 'static {
    /// Every variant, used to check terminal sets for overlap.
    const ALL: &'static [Self];
}

macro_rules! status_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl StatusEnum for $name {
            const ALL: &'static [Self] = &[$($name::$variant),+];
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let s = match self {
                    $($name::$variant => stringify!($variant)),+
                };
                f.write_str(s)
            }
        }
    };
}

status_enum!(
    /// Lifecycle of a backup object
    BackupStatus {
        Invalid,
        Pending,
        InProgress,
        Aborted,
        Success,
        Failed,
        Deleting,
        PartialSuccess,
        DeletePending,
        CloudBackupMissing,
        Captured,
    }
);

status_enum!(
    /// Lifecycle of a restore object
    RestoreStatus {
        Invalid,
        Pending,
        InProgress,
        Aborted,
        Success,
        Failed,
        Deleting,
        PartialSuccess,
        Retained,
    }
);

status_enum!(
    /// Registration state of an application cluster
    ClusterStatus {
        Invalid,
        Pending,
        Online,
        Offline,
        DeletePending,
        Success,
        Failed,
    }
);

status_enum!(
    /// Progress of a cluster-wide backup share update
    BackupShareStatus {
        Invalid,
        Pending,
        InProgress,
        Success,
        Failed,
    }
);

/// How a restore treats resources that already exist on the target cluster
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum ReplacePolicy {
    Invalid,
    Retain,
    Delete,
}

/// Access level granted when sharing backups
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum BackupAccess {
    ViewOnly,
    Restore,
    FullAccess,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VolumeInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub backup_id: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BackupInfo {
    pub name: String,
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub cluster: String,
    #[serde(default)]
    pub namespaces: Vec<String>,
    pub status: StatusInfo<BackupStatus>,
    /// Set when the backup was produced by a backup schedule
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_schedule: Option<ObjectRef>,
    #[serde(default)]
    pub volumes: Vec<VolumeInfo>,
    #[serde(default)]
    pub ns_label_selectors: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RestoreInfo {
    pub name: String,
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub backup: String,
    #[serde(default)]
    pub cluster: String,
    #[serde(default)]
    pub namespace_mapping: BTreeMap<String, String>,
    pub status: StatusInfo<RestoreStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replace_policy: Option<ReplacePolicy>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterInfo {
    pub name: String,
    #[serde(default)]
    pub uid: String,
    pub status: StatusInfo<ClusterStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_share_status_info: Option<StatusInfo<BackupShareStatus>>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LicenseFeature {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "int64")]
    pub consumed: i64,
    #[serde(default, deserialize_with = "int64")]
    pub count: i64,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LicenseInfo {
    #[serde(default)]
    pub feature_info: Vec<LicenseFeature>,
}

impl LicenseInfo {
    /// Feature by name, or the first reported feature when `name` is None.
    pub fn feature(&self, name: Option<&str>) -> Option<&LicenseFeature> {
        match name {
            Some(name) => self.feature_info.iter().find(|f| f.name == name),
            None => self.feature_info.first(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    #[serde(default)]
    pub major: String,
    #[serde(default)]
    pub minor: String,
    #[serde(default)]
    pub patch: String,
    #[serde(default)]
    pub git_commit: String,
    #[serde(default)]
    pub build_date: String,
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

// --- Requests ---

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BackupCreateRequest {
    pub org_id: String,
    pub name: String,
    pub cluster: String,
    pub backup_location: ObjectRef,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub namespaces: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub label_selectors: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource_types: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ns_label_selectors: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_exec_rule: Option<ObjectRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_exec_rule: Option<ObjectRef>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RestoreCreateRequest {
    pub org_id: String,
    pub name: String,
    pub backup: ObjectRef,
    pub cluster: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub namespace_mapping: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub storage_class_mapping: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replace_policy: Option<ReplacePolicy>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccessConfig {
    pub id: String,
    pub access: BackupAccess,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BackupShare {
    #[serde(default)]
    pub groups: Vec<AccessConfig>,
    #[serde(default)]
    pub collaborators: Vec<AccessConfig>,
}

impl BackupShare {
    /// Grant `access` to every group and user id given.
    pub fn with_access(groups: &[String], users: &[String], access: BackupAccess) -> Self {
        let configs = |ids: &[String]| -> Vec<AccessConfig> {
            ids.iter()
                .map(|id| AccessConfig {
                    id: id.clone(),
                    access,
                })
                .collect()
        };
        Self {
            groups: configs(groups),
            collaborators: configs(users),
        }
    }
}

/// Replace the share list of a single backup.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BackupShareUpdateRequest {
    pub org_id: String,
    pub name: String,
    pub uid: String,
    #[serde(rename = "backupshare")]
    pub backup_share: BackupShare,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterBackupShareUpdateRequest {
    pub org_id: String,
    pub name: String,
    pub uid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub add_backup_share: Option<BackupShare>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub del_backup_share: Option<BackupShare>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BackupScheduleUpdateRequest {
    pub org_id: String,
    pub name: String,
    pub uid: String,
    pub suspend: bool,
    pub schedule_policy_ref: ObjectRef,
}

/// The JSON gateway encodes int64 as a string; accept both forms.
fn int64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Int64 {
        Number(i64),
        Text(String),
    }

    match Int64::deserialize(deserializer)? {
        Int64::Number(n) => Ok(n),
        Int64::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}
