//! Harness configuration: a YAML file overlaid with environment variables.

use std::collections::BTreeMap;
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use tracing::{debug, info};

use crate::api::{ObjectRef, ReplacePolicy};
use crate::error::{Error, Result};
use crate::retry::RetryPolicy;
use crate::storage::{BucketConfig, StorageProvider};

pub const DEFAULT_ORG_ID: &str = "default";
pub const DEFAULT_SOURCE_CLUSTER: &str = "source-cluster";
pub const DEFAULT_DESTINATION_CLUSTER: &str = "destination-cluster";

/// Pods that are expected to be short-lived in the px-backup namespace.
pub const DEFAULT_SKIP_POD_PREFIXES: [&str; 3] = [
    "pxcentral-post-install-hook",
    "quick-maintenance-repo",
    "full-maintenance-repo",
];

/// Every wait the harness performs, each with its own timeout and poll interval.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WaitKind {
    BackupCompletion,
    RestoreCompletion,
    ScheduleBackupCreation,
    ClusterBackupShare,
    ClusterOnline,
    CloudCredentialDeletion,
    BackupLocationDeletion,
    BackupDeletion,
    JobDeletion,
    JobCompletion,
    PodReady,
    LicenseCount,
    NamespaceDeletion,
    BucketCleanup,
}

impl WaitKind {
    pub const ALL: [WaitKind; 14] = [
        WaitKind::BackupCompletion,
        WaitKind::RestoreCompletion,
        WaitKind::ScheduleBackupCreation,
        WaitKind::ClusterBackupShare,
        WaitKind::ClusterOnline,
        WaitKind::CloudCredentialDeletion,
        WaitKind::BackupLocationDeletion,
        WaitKind::BackupDeletion,
        WaitKind::JobDeletion,
        WaitKind::JobCompletion,
        WaitKind::PodReady,
        WaitKind::LicenseCount,
        WaitKind::NamespaceDeletion,
        WaitKind::BucketCleanup,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WaitKind::BackupCompletion => "backupCompletion",
            WaitKind::RestoreCompletion => "restoreCompletion",
            WaitKind::ScheduleBackupCreation => "scheduleBackupCreation",
            WaitKind::ClusterBackupShare => "clusterBackupShare",
            WaitKind::ClusterOnline => "clusterOnline",
            WaitKind::CloudCredentialDeletion => "cloudCredentialDeletion",
            WaitKind::BackupLocationDeletion => "backupLocationDeletion",
            WaitKind::BackupDeletion => "backupDeletion",
            WaitKind::JobDeletion => "jobDeletion",
            WaitKind::JobCompletion => "jobCompletion",
            WaitKind::PodReady => "podReady",
            WaitKind::LicenseCount => "licenseCount",
            WaitKind::NamespaceDeletion => "namespaceDeletion",
            WaitKind::BucketCleanup => "bucketCleanup",
        }
    }

    pub fn default_policy(&self) -> RetryPolicy {
        const MIN: u64 = 60;
        let (timeout, interval) = match self {
            WaitKind::BackupCompletion
            | WaitKind::RestoreCompletion
            | WaitKind::ScheduleBackupCreation => (40 * MIN, 30),
            WaitKind::ClusterBackupShare => (MIN, 10),
            WaitKind::ClusterOnline => (10 * MIN, 30),
            WaitKind::CloudCredentialDeletion
            | WaitKind::BackupLocationDeletion
            | WaitKind::PodReady
            | WaitKind::BucketCleanup => (30 * MIN, 30),
            WaitKind::BackupDeletion | WaitKind::JobCompletion => (20 * MIN, 30),
            WaitKind::JobDeletion => (5 * MIN, 10),
            WaitKind::LicenseCount => (15 * MIN, MIN),
            WaitKind::NamespaceDeletion => (10 * MIN, 10),
        };
        RetryPolicy::from_secs_unchecked(timeout, interval)
    }
}

impl fmt::Display for WaitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated retry policy per wait kind. Kinds not configured keep their defaults.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RetryPolicies {
    overrides: BTreeMap<WaitKind, RetryPolicy>,
}

impl RetryPolicies {
    pub fn policy(&self, kind: WaitKind) -> RetryPolicy {
        self.overrides
            .get(&kind)
            .copied()
            .unwrap_or_else(|| kind.default_policy())
    }

    pub fn set(&mut self, kind: WaitKind, policy: RetryPolicy) {
        self.overrides.insert(kind, policy);
    }
}

#[derive(Deserialize)]
struct RawPolicy {
    timeout: String,
    interval: String,
}

impl TryFrom<BTreeMap<WaitKind, RawPolicy>> for RetryPolicies {
    type Error = Error;

    fn try_from(raw: BTreeMap<WaitKind, RawPolicy>) -> Result<Self> {
        let mut policies = RetryPolicies::default();
        for (kind, p) in raw {
            let timeout = require_duration(&p.timeout, kind.as_str())?;
            let interval = require_duration(&p.interval, kind.as_str())?;
            let policy = RetryPolicy::new(timeout, interval)
                .map_err(|e| Error::InvalidConfig(format!("timeouts.{kind}: {e}")))?;
            policies.set(kind, policy);
        }
        Ok(policies)
    }
}

impl<'de> Deserialize<'de> for RetryPolicies {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<WaitKind, RawPolicy>::deserialize(deserializer)?;
        RetryPolicies::try_from(raw).map_err(serde::de::Error::custom)
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiConfig {
    pub endpoint: Option<String>,
    pub token: Option<String>,
    #[serde(deserialize_with = "duration")]
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            token: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterNames {
    pub source: String,
    pub destination: String,
}

impl Default for ClusterNames {
    fn default() -> Self {
        Self {
            source: DEFAULT_SOURCE_CLUSTER.to_string(),
            destination: DEFAULT_DESTINATION_CLUSTER.to_string(),
        }
    }
}

/// Inputs for the backup-then-restore suite
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BackupRestoreConfig {
    pub namespaces: Vec<String>,
    pub backup_location: ObjectRef,
    #[serde(default)]
    pub namespace_mapping: BTreeMap<String, String>,
    #[serde(default)]
    pub resource_types: Vec<String>,
    #[serde(default)]
    pub storage_class_mapping: BTreeMap<String, String>,
    #[serde(default)]
    pub replace_policy: Option<ReplacePolicy>,
    /// Rules run around the backup; deleted during cleanup
    #[serde(default)]
    pub pre_exec_rule: Option<String>,
    #[serde(default)]
    pub post_exec_rule: Option<String>,
    #[serde(default = "default_backup_prefix")]
    pub backup_name_prefix: String,
    #[serde(default = "default_restore_prefix")]
    pub restore_name_prefix: String,
    /// Delete the restore and backup once verified
    #[serde(default = "default_true")]
    pub cleanup: bool,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LicenseConfig {
    /// Feature to check; the first reported feature when unset
    #[serde(default)]
    pub feature: Option<String>,
    pub expected_consumed: i64,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PlatformConfig {
    pub skip_pod_prefixes: Vec<String>,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            skip_pod_prefixes: DEFAULT_SKIP_POD_PREFIXES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Regexes selecting suites by name
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SuiteFilter {
    pub focus: Option<String>,
    pub skip: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HarnessConfig {
    pub org_id: String,
    pub providers: Vec<String>,
    pub stork_namespace: String,
    pub px_backup_namespace: String,
    pub api: ApiConfig,
    pub clusters: ClusterNames,
    pub timeouts: RetryPolicies,
    pub backup_restore: Option<BackupRestoreConfig>,
    pub license: Option<LicenseConfig>,
    pub platform: PlatformConfig,
    pub object_store: Option<BucketConfig>,
    pub suites: SuiteFilter,
    pub metrics_addr: Option<SocketAddr>,
    pub report_path: Option<PathBuf>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            org_id: DEFAULT_ORG_ID.to_string(),
            providers: vec!["aws".to_string()],
            stork_namespace: "kube-system".to_string(),
            px_backup_namespace: "px-backup".to_string(),
            api: ApiConfig::default(),
            clusters: ClusterNames::default(),
            timeouts: RetryPolicies::default(),
            backup_restore: None,
            license: None,
            platform: PlatformConfig::default(),
            object_store: None,
            suites: SuiteFilter::default(),
            metrics_addr: None,
            report_path: None,
        }
    }
}

impl HarnessConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Read the file at `path` (or start from defaults), then apply process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                info!(path = %path.display(), "Loading harness configuration");
                let yaml = std::fs::read_to_string(path).map_err(|e| {
                    Error::InvalidConfig(format!("cannot read {}: {e}", path.display()))
                })?;
                Self::from_yaml_str(&yaml)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Overlay environment variables resolved through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(providers) = var("PROVIDERS") {
            self.providers = providers
                .split(',')
                .map(|p| p.trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect();
        }
        if let Some(ns) = var("PX_NAMESPACE") {
            self.stork_namespace = ns;
        }
        if let Some(ns) = var("PX_BACKUP_NAMESPACE") {
            self.px_backup_namespace = ns;
        }
        if let Some(endpoint) = var("PXB_API_ENDPOINT") {
            self.api.endpoint = Some(endpoint);
        }
        if let Some(token) = var("PXB_AUTH_TOKEN") {
            self.api.token = Some(token);
        }
        if let Some(focus) = var("HARNESS_FOCUS") {
            self.suites.focus = Some(focus);
        }
        if let Some(skip) = var("HARNESS_SKIP") {
            self.suites.skip = Some(skip);
        }
        if let Some(report) = var("HARNESS_REPORT") {
            self.report_path = Some(PathBuf::from(report));
        }
        debug!(providers = ?self.providers, org = %self.org_id, "Applied environment overrides");
    }

    /// Provider backups are written with: the first one configured.
    pub fn primary_provider(&self) -> Result<StorageProvider> {
        self.providers
            .first()
            .and_then(|p| StorageProvider::from_name(p))
            .ok_or_else(|| Error::InvalidConfig(format!("no usable provider in {:?}", self.providers)))
    }

    /// The bucket to inspect after cleanup, its provider defaulted to the primary one.
    pub fn bucket(&self) -> Result<Option<BucketConfig>> {
        let Some(bucket) = &self.object_store else {
            return Ok(None);
        };
        let mut bucket = bucket.clone();
        if bucket.provider.is_none() {
            bucket.provider = Some(self.primary_provider()?);
        }
        Ok(Some(bucket))
    }

    pub fn validate(&self) -> Result<()> {
        if self.org_id.is_empty() {
            return Err(Error::InvalidConfig("orgId must not be empty".to_string()));
        }
        if self.providers.is_empty() {
            return Err(Error::InvalidConfig(
                "at least one provider is required".to_string(),
            ));
        }
        if let Some(unknown) = self
            .providers
            .iter()
            .find(|p| StorageProvider::from_name(p).is_none())
        {
            return Err(Error::InvalidConfig(format!(
                "unknown provider '{unknown}', expected aws, azure or gcp"
            )));
        }
        if let Some(br) = &self.backup_restore {
            if br.namespaces.is_empty() {
                return Err(Error::InvalidConfig(
                    "backupRestore.namespaces must not be empty".to_string(),
                ));
            }
            if br.replace_policy == Some(ReplacePolicy::Invalid) {
                return Err(Error::InvalidConfig(
                    "backupRestore.replacePolicy must be Retain or Delete".to_string(),
                ));
            }
        }
        if let Some(license) = &self.license {
            if license.expected_consumed < 0 {
                return Err(Error::InvalidConfig(
                    "license.expectedConsumed must not be negative".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn policy(&self, kind: WaitKind) -> RetryPolicy {
        self.timeouts.policy(kind)
    }
}

fn default_backup_prefix() -> String {
    "tp-backup".to_string()
}

fn default_restore_prefix() -> String {
    "tp-restore".to_string()
}

fn default_true() -> bool {
    true
}

fn require_duration(s: &str, field: &str) -> Result<Duration> {
    parse_duration(s)
        .ok_or_else(|| Error::InvalidConfig(format!("invalid duration '{s}' for {field}")))
}

fn duration<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    let s = String::deserialize(deserializer)?;
    parse_duration(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid duration '{s}'")))
}

/// Parse durations like "500ms", "30s", "40m", "2h", "1d".
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Some(ms) = s.strip_suffix("ms") {
        return ms.parse().ok().map(Duration::from_millis);
    }

    let unit_len = s.chars().last()?.len_utf8();
    let (num_str, unit) = s.split_at(s.len() - unit_len);
    let value: u64 = num_str.parse().ok()?;

    let secs = match unit {
        "s" => value,
        "m" => value.checked_mul(60)?,
        "h" => value.checked_mul(3600)?,
        "d" => value.checked_mul(86_400)?,
        "w" => value.checked_mul(604_800)?,
        _ => return None,
    };
    Some(Duration::from_secs(secs))
}
