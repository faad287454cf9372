//! Health of the control-plane deployment and the clusters registered with it.

use std::collections::BTreeMap;

use tracing::info;

use crate::context::Context;
use crate::error::Result;
use crate::report::Verifier;
use crate::workflows::{cluster, k8s};

pub async fn run(ctx: &Context, verifier: &mut Verifier) -> Result<()> {
    let config = &ctx.config;
    let org = ctx.org();

    verifier.fatal(
        k8s::validate_all_pods(ctx, &config.px_backup_namespace).await,
        &format!("pods ready in {}", config.px_backup_namespace),
    )?;

    let stork: BTreeMap<String, String> = [("name".to_string(), "stork".to_string())]
        .into_iter()
        .collect();
    verifier.soft(
        k8s::validate_pods_by_label(ctx, &config.stork_namespace, &stork).await,
        &format!("stork pods ready in {}", config.stork_namespace),
    );

    if let Some(version) = verifier.soft(ctx.api.version().await, "control plane version") {
        info!(%version, commit = %version.git_commit, "Control plane version");
    }

    let orgs = verifier.fatal(ctx.api.enumerate_organizations().await, "list organizations")?;
    verifier.soft_assert(
        orgs.iter().any(|o| o.name == org),
        &format!("organization {org} exists"),
        || format!("organization [{org}] not found among {} organizations", orgs.len()),
    );

    for name in [&config.clusters.source, &config.clusters.destination] {
        verifier.soft(
            cluster::wait_for_cluster_online(ctx, org, name).await,
            &format!("cluster {name} online"),
        );
    }

    Ok(())
}
