use std::collections::BTreeMap;

use async_trait::async_trait;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{Namespace, Pod};
use kube::api::{DeleteParams, ListParams};
use kube::{Api, Client};
use tracing::debug;

use super::{label_selector, ClusterApi};
use crate::error::{Error, Result};

/// `ClusterApi` backed by a kube client.
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
}

impl KubeCluster {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn map_not_found<'a>(kind: &'static str, name: &'a str) -> impl FnOnce(kube::Error) -> Error + 'a {
    move |e| match &e {
        kube::Error::Api(ae) if ae.code == 404 => Error::NotFound {
            kind,
            name: name.to_string(),
        },
        _ => Error::Kube(e),
    }
}

#[async_trait]
impl ClusterApi for KubeCluster {
    async fn list_pods(
        &self,
        namespace: &str,
        labels: &BTreeMap<String, String>,
    ) -> Result<Vec<Pod>> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let mut params = ListParams::default();
        if !labels.is_empty() {
            params = params.labels(&label_selector(labels));
        }
        let list = pods.list(&params).await?;
        debug!(namespace, count = list.items.len(), "Listed pods");
        Ok(list.items)
    }

    async fn get_job(&self, namespace: &str, name: &str) -> Result<Job> {
        let jobs: Api<Job> = Api::namespaced(self.client.clone(), namespace);
        jobs.get(name).await.map_err(map_not_found("Job", name))
    }

    async fn delete_job(&self, namespace: &str, name: &str) -> Result<()> {
        let jobs: Api<Job> = Api::namespaced(self.client.clone(), namespace);
        jobs.delete(name, &DeleteParams::background())
            .await
            .map_err(map_not_found("Job", name))?;
        Ok(())
    }

    async fn get_namespace(&self, name: &str) -> Result<Namespace> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        namespaces
            .get(name)
            .await
            .map_err(map_not_found("Namespace", name))
    }

    async fn delete_namespace(&self, name: &str) -> Result<()> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        namespaces
            .delete(name, &DeleteParams::default())
            .await
            .map_err(map_not_found("Namespace", name))?;
        Ok(())
    }
}
