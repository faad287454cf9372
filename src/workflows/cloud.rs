//! Teardown of cloud credentials, backup locations, and registered clusters.

use std::collections::BTreeMap;

use object_store::ObjectStore;
use tracing::{info, instrument};

use crate::config::WaitKind;
use crate::context::Context;
use crate::error::Result;
use crate::probes;
use crate::report::Verifier;

#[instrument(skip(ctx, uid))]
pub async fn delete_backup_location_and_wait(
    ctx: &Context,
    org: &str,
    name: &str,
    uid: &str,
) -> Result<()> {
    ctx.api.delete_backup_location(org, name, uid, true).await?;
    let api = ctx.api.as_ref();
    ctx.wait(WaitKind::BackupLocationDeletion, name, || {
        probes::backup_location_absent(api, org, name)
    })
    .await?;
    Ok(())
}

#[instrument(skip(ctx, uid))]
pub async fn delete_cloud_credential_and_wait(
    ctx: &Context,
    org: &str,
    name: &str,
    uid: &str,
) -> Result<()> {
    ctx.api.delete_cloud_credential(org, name, uid).await?;
    let api = ctx.api.as_ref();
    ctx.wait(WaitKind::CloudCredentialDeletion, name, || {
        probes::cloud_credential_absent(api, org, name)
    })
    .await?;
    Ok(())
}

/// Delete the given backup locations (uid to name) along with their backups, the cloud
/// credential, and the source and destination clusters.
///
/// A rejected location or credential delete is fatal. Waiting for a deletion to show up
/// and deleting the clusters are soft checks, so one slow or failed step does not stop the
/// remaining cleanup.
#[instrument(skip(ctx, verifier, locations, credential_uid))]
pub async fn cleanup_cloud_settings_and_clusters(
    ctx: &Context,
    verifier: &mut Verifier,
    org: &str,
    locations: &BTreeMap<String, String>,
    credential_name: &str,
    credential_uid: &str,
) -> Result<()> {
    let api = ctx.api.as_ref();

    for (uid, name) in locations {
        verifier.fatal(
            api.delete_backup_location(org, name, uid, true).await,
            &format!("delete backup location {name}"),
        )?;
        let gone = ctx
            .wait(WaitKind::BackupLocationDeletion, name, || {
                probes::backup_location_absent(api, org, name)
            })
            .await;
        verifier.soft(
            gone.map_err(Into::into),
            &format!("backup location {name} deleted"),
        );
    }

    if !credential_name.is_empty() {
        verifier.fatal(
            api.delete_cloud_credential(org, credential_name, credential_uid)
                .await,
            &format!("delete cloud credential {credential_name}"),
        )?;
        let gone = ctx
            .wait(WaitKind::CloudCredentialDeletion, credential_name, || {
                probes::cloud_credential_absent(api, org, credential_name)
            })
            .await;
        verifier.soft(
            gone.map_err(Into::into),
            &format!("cloud credential {credential_name} deleted"),
        );
    }

    for cluster in [&ctx.config.clusters.source, &ctx.config.clusters.destination] {
        verifier.soft(
            super::cluster::delete_cluster(ctx, org, cluster).await,
            &format!("delete cluster {cluster}"),
        );
    }

    info!("Cloud settings and clusters cleaned up");
    Ok(())
}

/// Wait until a backup's objects have been removed from the bucket.
#[instrument(skip(ctx, store))]
pub async fn wait_for_bucket_cleanup(
    ctx: &Context,
    store: &dyn ObjectStore,
    prefix: &str,
) -> Result<()> {
    ctx.wait(WaitKind::BucketCleanup, prefix, || {
        probes::objects_absent(store, prefix)
    })
    .await?;
    Ok(())
}
