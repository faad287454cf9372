//! Kubernetes-side queries the harness makes against application clusters.

pub mod client;
pub mod pods;

use std::collections::BTreeMap;

use async_trait::async_trait;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{Namespace, Pod};

use crate::error::Result;
pub use client::KubeCluster;

/// Missing objects surface as `Error::NotFound`.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    async fn list_pods(
        &self,
        namespace: &str,
        labels: &BTreeMap<String, String>,
    ) -> Result<Vec<Pod>>;
    async fn get_job(&self, namespace: &str, name: &str) -> Result<Job>;
    async fn delete_job(&self, namespace: &str, name: &str) -> Result<()>;
    async fn get_namespace(&self, name: &str) -> Result<Namespace>;
    async fn delete_namespace(&self, name: &str) -> Result<()>;
}

/// `k1=v1,k2=v2` selector for a label map.
pub fn label_selector(labels: &BTreeMap<String, String>) -> String {
    labels
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(",")
}
