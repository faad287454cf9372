//! In-memory control plane and cluster used by the integration tests.
#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{Namespace, NamespaceStatus, Pod, PodCondition, PodStatus};
use kube::api::ObjectMeta;

use backup_harness::api::*;
use backup_harness::cluster::ClusterApi;
use backup_harness::config::{HarnessConfig, WaitKind};
use backup_harness::metrics::HarnessMetrics;
use backup_harness::retry::RetryPolicy;
use backup_harness::{Context, Error, Result};

/// Pops scripted values in order; the last one repeats forever.
#[derive(Debug, Default)]
pub struct Script<T>(VecDeque<T>);

impl<T: Clone> Script<T> {
    pub fn new(items: impl IntoIterator<Item = T>) -> Self {
        Self(items.into_iter().collect())
    }

    pub fn next(&mut self) -> Option<T> {
        if self.0.len() > 1 {
            self.0.pop_front()
        } else {
            self.0.front().cloned()
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    Backup,
    CloudCredential,
    BackupLocation,
}

#[derive(Default)]
pub struct ApiState {
    pub backups: Vec<BackupInfo>,
    /// Backups released into `backups` one per enumerate call, after listing.
    pub scheduled_arrivals: VecDeque<BackupInfo>,
    pub backup_statuses: HashMap<String, Script<StatusInfo<BackupStatus>>>,
    pub restore_statuses: HashMap<String, Script<StatusInfo<RestoreStatus>>>,
    pub clusters: Vec<ClusterInfo>,
    pub share_statuses: HashMap<String, Script<Option<StatusInfo<BackupShareStatus>>>>,
    pub cloud_credentials: Vec<ObjectRef>,
    pub backup_locations: Vec<ObjectRef>,
    pub license_counts: Script<i64>,
    pub license_feature: String,
    pub organizations: Vec<ObjectRef>,
    /// Enumerate calls a deleted object keeps showing up for, per name.
    pub deletion_lag: HashMap<String, u32>,
    pub default_deletion_lag: u32,
    pending_removals: Vec<(Kind, String, u32)>,
    /// Deletes of these names are rejected by the server.
    pub reject_deletes: HashSet<String>,
    /// Inspect calls fail with a 500 while this is set.
    pub inspect_error: Option<String>,
    /// Remaining enumerate calls that fail with a 503.
    pub enumerate_failures: u32,
    pub created_backups: Vec<BackupCreateRequest>,
    pub created_restores: Vec<RestoreCreateRequest>,
    pub share_updates: Vec<ClusterBackupShareUpdateRequest>,
    pub backup_share_updates: Vec<BackupShareUpdateRequest>,
    pub rules: Vec<ObjectRef>,
    /// Backup location deletes with their `delete_backups` flag.
    pub location_deletes: Vec<(String, bool)>,
    pub deleted: Vec<String>,
}

#[derive(Default)]
pub struct FakeBackupApi {
    pub state: Mutex<ApiState>,
    calls: Mutex<HashMap<&'static str, u32>>,
}

impl FakeBackupApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(f: impl FnOnce(&mut ApiState)) -> Self {
        let api = Self::new();
        f(&mut api.state.lock().unwrap());
        api
    }

    pub fn calls(&self, method: &str) -> u32 {
        self.calls.lock().unwrap().get(method).copied().unwrap_or(0)
    }

    fn hit(&self, method: &'static str) {
        *self.calls.lock().unwrap().entry(method).or_default() += 1;
    }

    fn inspect_guard(&self) -> Result<()> {
        match &self.state.lock().unwrap().inspect_error {
            Some(message) => Err(Error::Api {
                status: 500,
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }

    fn enumerate_guard(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.enumerate_failures > 0 {
            state.enumerate_failures -= 1;
            return Err(Error::Api {
                status: 503,
                message: "service unavailable".to_string(),
            });
        }
        Ok(())
    }

    fn schedule_removal(&self, kind: Kind, name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.reject_deletes.contains(name) {
            return Err(Error::Api {
                status: 409,
                message: format!("{name} is in use"),
            });
        }
        let lag = state
            .deletion_lag
            .get(name)
            .copied()
            .unwrap_or(state.default_deletion_lag);
        state.deleted.push(name.to_string());
        state.pending_removals.push((kind, name.to_string(), lag));
        Ok(())
    }

    /// Apply due removals of `kind`, then return the names still listed.
    fn settle(state: &mut ApiState, kind: Kind) {
        let mut due = Vec::new();
        for (k, name, remaining) in state.pending_removals.iter_mut() {
            if *k != kind {
                continue;
            }
            if *remaining == 0 {
                due.push(name.clone());
            } else {
                *remaining -= 1;
            }
        }
        state
            .pending_removals
            .retain(|(k, name, _)| !(*k == kind && due.contains(name)));
        match kind {
            Kind::Backup => state.backups.retain(|b| !due.contains(&b.name)),
            Kind::CloudCredential => state.cloud_credentials.retain(|c| !due.contains(&c.name)),
            Kind::BackupLocation => state.backup_locations.retain(|l| !due.contains(&l.name)),
        }
    }
}

fn not_found(kind: &'static str, name: &str) -> Error {
    Error::NotFound {
        kind,
        name: name.to_string(),
    }
}

#[async_trait]
impl BackupApi for FakeBackupApi {
    async fn version(&self) -> Result<VersionInfo> {
        self.hit("version");
        Ok(VersionInfo {
            major: "2".to_string(),
            minor: "8".to_string(),
            patch: "0".to_string(),
            ..Default::default()
        })
    }

    async fn enumerate_organizations(&self) -> Result<Vec<ObjectRef>> {
        self.hit("enumerate_organizations");
        Ok(self.state.lock().unwrap().organizations.clone())
    }

    async fn inspect_backup(&self, _org: &str, name: &str, _uid: &str) -> Result<BackupInfo> {
        self.hit("inspect_backup");
        self.inspect_guard()?;
        let mut state = self.state.lock().unwrap();
        let mut info = state
            .backups
            .iter()
            .find(|b| b.name == name)
            .cloned()
            .ok_or_else(|| not_found("backup", name))?;
        if let Some(status) = state.backup_statuses.get_mut(name).and_then(Script::next) {
            info.status = status;
        }
        Ok(info)
    }

    async fn enumerate_backups(&self, _org: &str) -> Result<Vec<BackupInfo>> {
        self.hit("enumerate_backups");
        self.enumerate_guard()?;
        let mut state = self.state.lock().unwrap();
        Self::settle(&mut state, Kind::Backup);
        let listed = state.backups.clone();
        if let Some(next) = state.scheduled_arrivals.pop_front() {
            state.backups.push(next);
        }
        Ok(listed)
    }

    async fn create_backup(&self, request: &BackupCreateRequest) -> Result<()> {
        self.hit("create_backup");
        let mut state = self.state.lock().unwrap();
        state.created_backups.push(request.clone());
        // Succeeds immediately unless a status script says otherwise
        state.backups.push(backup(&request.name, BackupStatus::Success));
        if let Some(b) = state.backups.last_mut() {
            b.namespaces = request.namespaces.clone();
            b.cluster = request.cluster.clone();
        }
        Ok(())
    }

    async fn delete_backup(&self, _org: &str, name: &str, _uid: &str) -> Result<()> {
        self.hit("delete_backup");
        self.schedule_removal(Kind::Backup, name)
    }

    async fn inspect_restore(&self, _org: &str, name: &str) -> Result<RestoreInfo> {
        self.hit("inspect_restore");
        self.inspect_guard()?;
        let mut state = self.state.lock().unwrap();
        let status = state
            .restore_statuses
            .get_mut(name)
            .and_then(Script::next)
            .ok_or_else(|| not_found("restore", name))?;
        Ok(RestoreInfo {
            name: name.to_string(),
            uid: format!("uid-{name}"),
            backup: String::new(),
            cluster: String::new(),
            namespace_mapping: BTreeMap::new(),
            status,
            replace_policy: None,
        })
    }

    async fn create_restore(&self, request: &RestoreCreateRequest) -> Result<()> {
        self.hit("create_restore");
        let mut state = self.state.lock().unwrap();
        state.created_restores.push(request.clone());
        state
            .restore_statuses
            .entry(request.name.clone())
            .or_insert_with(|| Script::new([StatusInfo::new(RestoreStatus::Success, "")]));
        Ok(())
    }

    async fn delete_restore(&self, _org: &str, name: &str) -> Result<()> {
        self.hit("delete_restore");
        let mut state = self.state.lock().unwrap();
        state.restore_statuses.remove(name);
        state.deleted.push(name.to_string());
        Ok(())
    }

    async fn update_backup_share(&self, request: &BackupShareUpdateRequest) -> Result<()> {
        self.hit("update_backup_share");
        self.state
            .lock()
            .unwrap()
            .backup_share_updates
            .push(request.clone());
        Ok(())
    }

    async fn enumerate_backup_schedules(&self, _org: &str) -> Result<Vec<ObjectRef>> {
        self.hit("enumerate_backup_schedules");
        Ok(vec![ObjectRef::new("daily", "sched-1")])
    }

    async fn enumerate_schedule_policies(&self, _org: &str) -> Result<Vec<ObjectRef>> {
        self.hit("enumerate_schedule_policies");
        Ok(vec![ObjectRef::new("every-15m", "policy-1")])
    }

    async fn update_backup_schedule(&self, _request: &BackupScheduleUpdateRequest) -> Result<()> {
        self.hit("update_backup_schedule");
        Ok(())
    }

    async fn inspect_cluster(&self, _org: &str, name: &str) -> Result<ClusterInfo> {
        self.hit("inspect_cluster");
        self.inspect_guard()?;
        let mut state = self.state.lock().unwrap();
        let mut info = state
            .clusters
            .iter()
            .find(|c| c.name == name)
            .cloned()
            .ok_or_else(|| not_found("cluster", name))?;
        if let Some(share) = state.share_statuses.get_mut(name).and_then(Script::next) {
            info.backup_share_status_info = share;
        }
        Ok(info)
    }

    async fn enumerate_clusters(&self, _org: &str) -> Result<Vec<ClusterInfo>> {
        self.hit("enumerate_clusters");
        Ok(self.state.lock().unwrap().clusters.clone())
    }

    async fn delete_cluster(&self, _org: &str, name: &str, _uid: &str) -> Result<()> {
        self.hit("delete_cluster");
        let mut state = self.state.lock().unwrap();
        if state.reject_deletes.contains(name) {
            return Err(Error::Api {
                status: 409,
                message: format!("{name} is in use"),
            });
        }
        state.clusters.retain(|c| c.name != name);
        state.deleted.push(name.to_string());
        Ok(())
    }

    async fn update_cluster_backup_share(
        &self,
        request: &ClusterBackupShareUpdateRequest,
    ) -> Result<()> {
        self.hit("update_cluster_backup_share");
        self.state.lock().unwrap().share_updates.push(request.clone());
        Ok(())
    }

    async fn enumerate_cloud_credentials(&self, _org: &str) -> Result<Vec<ObjectRef>> {
        self.hit("enumerate_cloud_credentials");
        self.enumerate_guard()?;
        let mut state = self.state.lock().unwrap();
        Self::settle(&mut state, Kind::CloudCredential);
        Ok(state.cloud_credentials.clone())
    }

    async fn delete_cloud_credential(&self, _org: &str, name: &str, _uid: &str) -> Result<()> {
        self.hit("delete_cloud_credential");
        self.schedule_removal(Kind::CloudCredential, name)
    }

    async fn enumerate_backup_locations(&self, _org: &str) -> Result<Vec<ObjectRef>> {
        self.hit("enumerate_backup_locations");
        self.enumerate_guard()?;
        let mut state = self.state.lock().unwrap();
        Self::settle(&mut state, Kind::BackupLocation);
        Ok(state.backup_locations.clone())
    }

    async fn delete_backup_location(
        &self,
        _org: &str,
        name: &str,
        _uid: &str,
        delete_backups: bool,
    ) -> Result<()> {
        self.hit("delete_backup_location");
        self.state
            .lock()
            .unwrap()
            .location_deletes
            .push((name.to_string(), delete_backups));
        self.schedule_removal(Kind::BackupLocation, name)
    }

    async fn enumerate_rules(&self, _org: &str) -> Result<Vec<ObjectRef>> {
        self.hit("enumerate_rules");
        Ok(self.state.lock().unwrap().rules.clone())
    }

    async fn delete_rule(&self, _org: &str, name: &str, _uid: &str) -> Result<()> {
        self.hit("delete_rule");
        let mut state = self.state.lock().unwrap();
        let before = state.rules.len();
        state.rules.retain(|r| r.name != name);
        if state.rules.len() == before {
            return Err(not_found("rule", name));
        }
        state.deleted.push(name.to_string());
        Ok(())
    }

    async fn inspect_license(&self, _org: &str) -> Result<LicenseInfo> {
        self.hit("inspect_license");
        self.inspect_guard()?;
        let mut state = self.state.lock().unwrap();
        let Some(consumed) = state.license_counts.next() else {
            return Ok(LicenseInfo::default());
        };
        Ok(LicenseInfo {
            feature_info: vec![LicenseFeature {
                name: state.license_feature.clone(),
                consumed,
                count: 100,
            }],
        })
    }
}

pub fn backup(name: &str, status: BackupStatus) -> BackupInfo {
    BackupInfo {
        name: name.to_string(),
        uid: format!("uid-{name}"),
        cluster: "source-cluster".to_string(),
        namespaces: Vec::new(),
        status: StatusInfo::new(status, ""),
        backup_schedule: None,
        volumes: Vec::new(),
        ns_label_selectors: String::new(),
        create_time: None,
    }
}

/// A backup created by `schedule`, `minute` minutes into the day.
pub fn scheduled_backup(name: &str, schedule: &str, minute: u32) -> BackupInfo {
    let mut b = backup(name, BackupStatus::Success);
    b.backup_schedule = Some(ObjectRef::new(schedule, "sched-1"));
    b.create_time = Utc.with_ymd_and_hms(2026, 3, 1, 2, minute, 0).single();
    b
}

pub fn cluster(name: &str, status: ClusterStatus) -> ClusterInfo {
    ClusterInfo {
        name: name.to_string(),
        uid: format!("uid-{name}"),
        status: StatusInfo::new(status, ""),
        backup_share_status_info: None,
    }
}

pub fn backup_statuses(statuses: &[BackupStatus]) -> Script<StatusInfo<BackupStatus>> {
    Script::new(statuses.iter().map(|s| StatusInfo::new(*s, format!("{s} reported"))))
}

pub fn restore_statuses(statuses: &[RestoreStatus]) -> Script<StatusInfo<RestoreStatus>> {
    Script::new(statuses.iter().map(|s| StatusInfo::new(*s, format!("{s} reported"))))
}

// --- Cluster fake ---

#[derive(Default)]
pub struct ClusterState {
    /// Successive pod listings; the last one repeats.
    pub pod_listings: Script<Vec<Pod>>,
    /// Remaining `get_job` calls that still find the job, per name.
    pub jobs: HashMap<String, u32>,
    pub job_objects: HashMap<String, Script<Job>>,
    /// Remaining `get_namespace` calls that still find the namespace, per name.
    pub namespaces: HashMap<String, u32>,
    pub list_error: bool,
    pub deleted: Vec<String>,
}

#[derive(Default)]
pub struct FakeCluster {
    pub state: Mutex<ClusterState>,
    calls: Mutex<HashMap<&'static str, u32>>,
}

impl FakeCluster {
    pub fn with_state(f: impl FnOnce(&mut ClusterState)) -> Self {
        let cluster = Self::default();
        f(&mut cluster.state.lock().unwrap());
        cluster
    }

    pub fn calls(&self, method: &str) -> u32 {
        self.calls.lock().unwrap().get(method).copied().unwrap_or(0)
    }

    fn hit(&self, method: &'static str) {
        *self.calls.lock().unwrap().entry(method).or_default() += 1;
    }
}

#[async_trait]
impl ClusterApi for FakeCluster {
    async fn list_pods(
        &self,
        namespace: &str,
        _labels: &BTreeMap<String, String>,
    ) -> Result<Vec<Pod>> {
        self.hit("list_pods");
        let mut state = self.state.lock().unwrap();
        if state.list_error {
            return Err(Error::Api {
                status: 500,
                message: format!("cannot list pods in {namespace}"),
            });
        }
        Ok(state.pod_listings.next().unwrap_or_default())
    }

    async fn get_job(&self, _namespace: &str, name: &str) -> Result<Job> {
        self.hit("get_job");
        let mut state = self.state.lock().unwrap();
        if let Some(script) = state.job_objects.get_mut(name) {
            return script.next().ok_or_else(|| not_found("Job", name));
        }
        match state.jobs.get_mut(name) {
            Some(0) | None => Err(not_found("Job", name)),
            Some(remaining) => {
                *remaining -= 1;
                Ok(Job::default())
            }
        }
    }

    async fn delete_job(&self, _namespace: &str, name: &str) -> Result<()> {
        self.hit("delete_job");
        let mut state = self.state.lock().unwrap();
        if !state.jobs.contains_key(name) {
            return Err(not_found("Job", name));
        }
        state.deleted.push(name.to_string());
        Ok(())
    }

    async fn get_namespace(&self, name: &str) -> Result<Namespace> {
        self.hit("get_namespace");
        let mut state = self.state.lock().unwrap();
        match state.namespaces.get_mut(name) {
            Some(0) | None => Err(not_found("Namespace", name)),
            Some(remaining) => {
                *remaining -= 1;
                Ok(namespace(name, "Terminating"))
            }
        }
    }

    async fn delete_namespace(&self, name: &str) -> Result<()> {
        self.hit("delete_namespace");
        let mut state = self.state.lock().unwrap();
        if !state.namespaces.contains_key(name) {
            return Err(not_found("Namespace", name));
        }
        state.deleted.push(name.to_string());
        Ok(())
    }
}

pub fn pod(name: &str, phase: &str, ready: bool) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        status: Some(PodStatus {
            phase: Some(phase.to_string()),
            conditions: Some(vec![PodCondition {
                type_: "Ready".to_string(),
                status: if ready { "True" } else { "False" }.to_string(),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn namespace(name: &str, phase: &str) -> Namespace {
    Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        status: Some(NamespaceStatus {
            phase: Some(phase.to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

// --- Context ---

pub fn policy(timeout_secs: u64, interval_secs: u64) -> RetryPolicy {
    RetryPolicy::new(
        Duration::from_secs(timeout_secs),
        Duration::from_secs(interval_secs),
    )
    .unwrap()
}

/// Config whose waits all use a 60s timeout and 10s interval.
pub fn fast_config() -> HarnessConfig {
    let mut config = HarnessConfig::default();
    for kind in WaitKind::ALL {
        config.timeouts.set(kind, policy(60, 10));
    }
    config
}

pub fn context(
    api: Arc<FakeBackupApi>,
    cluster: Arc<FakeCluster>,
    config: HarnessConfig,
) -> Context {
    Context::new(
        api,
        cluster,
        Arc::new(config),
        Arc::new(HarnessMetrics::new()),
    )
}
