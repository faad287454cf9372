//! HTTP client for the control plane's JSON gateway.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};

use super::types::*;
use super::BackupApi;
use crate::config::ApiConfig;
use crate::error::{Error, Result};

#[derive(Clone, Debug)]
pub struct RestBackupClient {
    http: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

impl RestBackupClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let endpoint = config
            .endpoint
            .as_deref()
            .filter(|e| !e.is_empty())
            .ok_or_else(|| Error::InvalidConfig("api.endpoint is not set".to_string()))?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/v1/{}", self.endpoint, path);
        let builder = self.http.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder, kind: &'static str, name: &str) -> Result<Response> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound {
                kind,
                name: name.to_string(),
            });
        }
        let body = response.text().await.unwrap_or_default();
        Err(Error::Api {
            status: status.as_u16(),
            message: gateway_message(&body),
        })
    }

    async fn get(&self, path: &str, query: &[(&str, &str)], kind: &'static str, name: &str) -> Result<Value> {
        debug!(path, "GET");
        let response = self
            .send(self.request(Method::GET, path).query(query), kind, name)
            .await?;
        Ok(response.json().await?)
    }

    async fn write<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
        kind: &'static str,
        name: &str,
    ) -> Result<()> {
        debug!(path, %method, "Sending request");
        self.send(self.request(method, path).json(body), kind, name)
            .await?;
        Ok(())
    }

    async fn delete(&self, path: &str, query: &[(&str, &str)], kind: &'static str, name: &str) -> Result<()> {
        debug!(path, "DELETE");
        self.send(self.request(Method::DELETE, path).query(query), kind, name)
            .await?;
        Ok(())
    }
}

/// Pull `key` out of a gateway response envelope.
fn field<T: DeserializeOwned>(mut value: Value, key: &str) -> Result<T> {
    let inner = value.get_mut(key).map(Value::take).unwrap_or(Value::Null);
    Ok(serde_json::from_value(inner)?)
}

/// Like `field`, for list envelopes the gateway omits when empty.
fn list<T: DeserializeOwned>(mut value: Value, key: &str) -> Result<Vec<T>> {
    match value.get_mut(key).map(Value::take) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(inner) => Ok(serde_json::from_value(inner)?),
    }
}

fn gateway_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait]
impl BackupApi for RestBackupClient {
    async fn version(&self) -> Result<VersionInfo> {
        field(self.get("version", &[], "version", "").await?, "version")
    }

    async fn enumerate_organizations(&self) -> Result<Vec<ObjectRef>> {
        list(self.get("organization", &[], "organization", "").await?, "organizations")
    }

    #[instrument(skip(self))]
    async fn inspect_backup(&self, org: &str, name: &str, uid: &str) -> Result<BackupInfo> {
        let value = self
            .get(&format!("backup/{org}/{name}"), &[("uid", uid)], "backup", name)
            .await?;
        field(value, "backup")
    }

    async fn enumerate_backups(&self, org: &str) -> Result<Vec<BackupInfo>> {
        list(self.get(&format!("backup/{org}"), &[], "backup", org).await?, "backups")
    }

    async fn create_backup(&self, request: &BackupCreateRequest) -> Result<()> {
        self.write(Method::POST, "backup", request, "backup", &request.name)
            .await
    }

    async fn delete_backup(&self, org: &str, name: &str, uid: &str) -> Result<()> {
        self.delete(&format!("backup/{org}/{name}"), &[("uid", uid)], "backup", name)
            .await
    }

    #[instrument(skip(self))]
    async fn inspect_restore(&self, org: &str, name: &str) -> Result<RestoreInfo> {
        let value = self
            .get(&format!("restore/{org}/{name}"), &[], "restore", name)
            .await?;
        field(value, "restore")
    }

    async fn create_restore(&self, request: &RestoreCreateRequest) -> Result<()> {
        self.write(Method::POST, "restore", request, "restore", &request.name)
            .await
    }

    async fn delete_restore(&self, org: &str, name: &str) -> Result<()> {
        self.delete(&format!("restore/{org}/{name}"), &[], "restore", name)
            .await
    }

    async fn enumerate_backup_schedules(&self, org: &str) -> Result<Vec<ObjectRef>> {
        let value = self
            .get(&format!("backupschedule/{org}"), &[], "backup schedule", org)
            .await?;
        list(value, "backupSchedules")
    }

    async fn enumerate_schedule_policies(&self, org: &str) -> Result<Vec<ObjectRef>> {
        let value = self
            .get(&format!("schedulepolicy/{org}"), &[], "schedule policy", org)
            .await?;
        list(value, "schedulePolicies")
    }

    async fn update_backup_schedule(&self, request: &BackupScheduleUpdateRequest) -> Result<()> {
        self.write(
            Method::PUT,
            "backupschedule",
            request,
            "backup schedule",
            &request.name,
        )
        .await
    }

    #[instrument(skip(self))]
    async fn inspect_cluster(&self, org: &str, name: &str) -> Result<ClusterInfo> {
        let value = self
            .get(
                &format!("cluster/{org}/{name}"),
                &[("includeSecrets", "false")],
                "cluster",
                name,
            )
            .await?;
        field(value, "cluster")
    }

    async fn enumerate_clusters(&self, org: &str) -> Result<Vec<ClusterInfo>> {
        list(self.get(&format!("cluster/{org}"), &[], "cluster", org).await?, "clusters")
    }

    async fn delete_cluster(&self, org: &str, name: &str, uid: &str) -> Result<()> {
        self.delete(&format!("cluster/{org}/{name}"), &[("uid", uid)], "cluster", name)
            .await
    }

    async fn update_backup_share(&self, request: &BackupShareUpdateRequest) -> Result<()> {
        self.write(
            Method::PUT,
            "backup/updatebackupshare",
            request,
            "backup",
            &request.name,
        )
        .await
    }

    async fn update_cluster_backup_share(
        &self,
        request: &ClusterBackupShareUpdateRequest,
    ) -> Result<()> {
        self.write(
            Method::PUT,
            "cluster/updatebackupshare",
            request,
            "cluster",
            &request.name,
        )
        .await
    }

    async fn enumerate_cloud_credentials(&self, org: &str) -> Result<Vec<ObjectRef>> {
        let value = self
            .get(&format!("cloudcredential/{org}"), &[], "cloud credential", org)
            .await?;
        list(value, "cloudCredentials")
    }

    async fn delete_cloud_credential(&self, org: &str, name: &str, uid: &str) -> Result<()> {
        self.delete(
            &format!("cloudcredential/{org}/{name}"),
            &[("uid", uid)],
            "cloud credential",
            name,
        )
        .await
    }

    async fn enumerate_backup_locations(&self, org: &str) -> Result<Vec<ObjectRef>> {
        let value = self
            .get(&format!("backuplocation/{org}"), &[], "backup location", org)
            .await?;
        list(value, "backupLocations")
    }

    async fn delete_backup_location(
        &self,
        org: &str,
        name: &str,
        uid: &str,
        delete_backups: bool,
    ) -> Result<()> {
        let delete_backups = if delete_backups { "true" } else { "false" };
        self.delete(
            &format!("backuplocation/{org}/{name}"),
            &[("uid", uid), ("deleteBackups", delete_backups)],
            "backup location",
            name,
        )
        .await
    }

    async fn enumerate_rules(&self, org: &str) -> Result<Vec<ObjectRef>> {
        list(self.get(&format!("rule/{org}"), &[], "rule", org).await?, "rules")
    }

    async fn delete_rule(&self, org: &str, name: &str, uid: &str) -> Result<()> {
        self.delete(&format!("rule/{org}/{name}"), &[("uid", uid)], "rule", name)
            .await
    }

    #[instrument(skip(self))]
    async fn inspect_license(&self, org: &str) -> Result<LicenseInfo> {
        field(self.get(&format!("license/{org}"), &[], "license", org).await?, "licenseRespInfo")
    }
}
