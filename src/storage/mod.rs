//! Object-store access for checking what a backup left in its bucket.

use std::sync::Arc;

use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::azure::MicrosoftAzureBuilder;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::path::Path;
use object_store::ObjectStore;
use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageProvider {
    Aws,
    Azure,
    Gcp,
}

impl StorageProvider {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "aws" | "s3" => Some(StorageProvider::Aws),
            "azure" => Some(StorageProvider::Azure),
            "gcp" | "gcs" => Some(StorageProvider::Gcp),
            _ => None,
        }
    }
}

/// Bucket a backup location writes to.
///
/// Credentials come from the provider's usual environment variables
/// (`AWS_ACCESS_KEY_ID`, `AZURE_STORAGE_ACCOUNT_NAME`, `GOOGLE_SERVICE_ACCOUNT`, ...).
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BucketConfig {
    /// Defaults to the first of the harness's configured providers
    #[serde(default)]
    pub provider: Option<StorageProvider>,
    pub bucket: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Key prefix backups are written under
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub allow_http: bool,
}

pub fn build_object_store(config: &BucketConfig) -> Result<Arc<dyn ObjectStore>> {
    if config.bucket.is_empty() {
        return Err(Error::InvalidConfig(
            "objectStore.bucket must not be empty".to_string(),
        ));
    }
    let provider = config.provider.ok_or_else(|| {
        Error::InvalidConfig("objectStore.provider is not set".to_string())
    })?;
    debug!(?provider, bucket = %config.bucket, "Building object store client");

    match provider {
        StorageProvider::Aws => build_s3(config),
        StorageProvider::Azure => build_azure(config),
        StorageProvider::Gcp => build_gcs(config),
    }
}

fn build_s3(config: &BucketConfig) -> Result<Arc<dyn ObjectStore>> {
    let mut builder = AmazonS3Builder::from_env()
        .with_bucket_name(&config.bucket)
        .with_allow_http(config.allow_http);

    if let Some(region) = &config.region {
        builder = builder.with_region(region);
    }

    if let Some(endpoint) = &config.endpoint {
        builder = builder
            .with_endpoint(endpoint)
            .with_virtual_hosted_style_request(false);
    }

    Ok(Arc::new(builder.build()?))
}

fn build_azure(config: &BucketConfig) -> Result<Arc<dyn ObjectStore>> {
    let mut builder = MicrosoftAzureBuilder::from_env()
        .with_container_name(&config.bucket)
        .with_allow_http(config.allow_http);

    if let Some(endpoint) = &config.endpoint {
        builder = builder.with_endpoint(endpoint.clone());
    }

    Ok(Arc::new(builder.build()?))
}

fn build_gcs(config: &BucketConfig) -> Result<Arc<dyn ObjectStore>> {
    let builder = GoogleCloudStorageBuilder::from_env().with_bucket_name(&config.bucket);
    Ok(Arc::new(builder.build()?))
}

/// Keys stored under `prefix`.
pub async fn list_keys(store: &dyn ObjectStore, prefix: &str) -> Result<Vec<String>> {
    let prefix = Path::from(prefix);
    let keys: Vec<String> = store
        .list(Some(&prefix))
        .map_ok(|meta| meta.location.to_string())
        .try_collect()
        .await?;
    Ok(keys)
}
