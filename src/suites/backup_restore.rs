//! Back up namespaces on the source cluster and restore them onto the destination.

use chrono::Utc;
use tracing::info;

use crate::api::{BackupCreateRequest, ObjectRef, RestoreCreateRequest};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::report::Verifier;
use crate::retry::{run_tasks, ExecutionMode};
use crate::storage::build_object_store;
use crate::util;
use crate::workflows::{backup, cloud, cluster, restore, rule};

/// Key prefix the control plane writes a namespace's backup data under.
pub fn backup_object_prefix(
    bucket_prefix: Option<&str>,
    namespace: &str,
    backup_name: &str,
    backup_uid: &str,
) -> String {
    let leaf = format!("{namespace}/{backup_name}_{backup_uid}");
    match bucket_prefix.map(|p| p.trim_matches('/')) {
        Some(p) if !p.is_empty() => format!("{p}/{leaf}"),
        _ => leaf,
    }
}

pub async fn run(ctx: &Context, verifier: &mut Verifier) -> Result<()> {
    let config = verifier.fatal(
        ctx.config.backup_restore.clone().ok_or_else(|| {
            Error::Precondition("backupRestore section is not configured".to_string())
        }),
        "backup-restore configuration present",
    )?;
    let org = ctx.org();
    let clusters = &ctx.config.clusters;

    let names = [&clusters.source, &clusters.destination];
    let online = run_tasks(names, ExecutionMode::Parallel, |_, name| {
        cluster::wait_for_cluster_online(ctx, org, name)
    })
    .await;
    for (name, result) in names.into_iter().zip(online) {
        verifier.fatal(result, &format!("cluster {name} online"))?;
    }

    let pre_exec_rule = match &config.pre_exec_rule {
        Some(name) => Some(verifier.fatal(
            rule::rule_ref(ctx, org, name).await,
            &format!("rule {name} exists"),
        )?),
        None => None,
    };
    let post_exec_rule = match &config.post_exec_rule {
        Some(name) => Some(verifier.fatal(
            rule::rule_ref(ctx, org, name).await,
            &format!("rule {name} exists"),
        )?),
        None => None,
    };

    let stamp = Utc::now().format("%Y%m%d%H%M%S").to_string();
    let backup_name = format!("{}-{stamp}", config.backup_name_prefix);
    let request = BackupCreateRequest {
        org_id: org.to_string(),
        name: backup_name.clone(),
        cluster: clusters.source.clone(),
        backup_location: config.backup_location.clone(),
        namespaces: config.namespaces.clone(),
        resource_types: config.resource_types.clone(),
        pre_exec_rule,
        post_exec_rule,
        ..Default::default()
    };
    verifier.fatal(
        backup::create_backup_and_wait(ctx, &request).await,
        &format!("backup {backup_name} succeeded"),
    )?;

    let info = verifier.fatal(
        backup::inspect_backup_by_name(ctx, org, &backup_name).await,
        &format!("inspect backup {backup_name}"),
    )?;
    verifier.soft_assert(
        util::same_elements(&info.namespaces, &config.namespaces),
        "backup captured the requested namespaces",
        || {
            format!(
                "requested {:?} but backup holds {:?}",
                config.namespaces, info.namespaces
            )
        },
    );
    verifier.soft_assert(
        backup::is_full_backup(&info),
        "first backup is a full backup",
        || format!("backup [{backup_name}] has incremental volumes"),
    );

    let restore_name = format!("{}-{stamp}", config.restore_name_prefix);
    let request = RestoreCreateRequest {
        org_id: org.to_string(),
        name: restore_name.clone(),
        backup: ObjectRef::new(&backup_name, &info.uid),
        cluster: clusters.destination.clone(),
        namespace_mapping: config.namespace_mapping.clone(),
        storage_class_mapping: config.storage_class_mapping.clone(),
        replace_policy: config.replace_policy,
        ..Default::default()
    };
    let status = verifier.fatal(
        restore::create_restore_and_wait(ctx, &request).await,
        &format!("restore {restore_name} succeeded"),
    )?;
    info!(%status, restore = %restore_name, "Restore finished");

    if !config.cleanup {
        return Ok(());
    }

    verifier.soft(
        restore::delete_restore(ctx, org, &restore_name).await,
        &format!("delete restore {restore_name}"),
    );
    verifier.soft(
        backup::delete_backup_and_wait(ctx, org, &backup_name).await,
        &format!("delete backup {backup_name}"),
    );

    for name in [&config.pre_exec_rule, &config.post_exec_rule]
        .into_iter()
        .flatten()
    {
        verifier.soft(
            rule::delete_rule(ctx, org, name).await,
            &format!("delete rule {name}"),
        );
    }

    if let Some(bucket) = ctx.config.bucket().transpose() {
        let bucket = verifier.fatal(bucket, "object store configuration")?;
        let store = verifier.fatal(build_object_store(&bucket), "object store client")?;
        let prefixes: Vec<String> = config
            .namespaces
            .iter()
            .map(|ns| backup_object_prefix(bucket.prefix.as_deref(), ns, &backup_name, &info.uid))
            .collect();
        let store = store.as_ref();
        let cleaned = run_tasks(prefixes.iter(), ExecutionMode::Parallel, |_, prefix| {
            cloud::wait_for_bucket_cleanup(ctx, store, prefix)
        })
        .await;
        for (prefix, result) in prefixes.iter().zip(cleaned) {
            verifier.soft(result, &format!("bucket objects under {prefix} removed"));
        }
    }

    Ok(())
}
