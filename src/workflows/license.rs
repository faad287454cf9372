use tracing::{info, instrument};

use crate::config::WaitKind;
use crate::context::Context;
use crate::error::Result;
use crate::probes;

/// Wait until the consumed count for `feature` (the first feature when None) equals
/// `expected`. Returns the observed count.
#[instrument(skip(ctx))]
pub async fn verify_license_consumed_count(
    ctx: &Context,
    org: &str,
    feature: Option<&str>,
    expected: i64,
) -> Result<i64> {
    let api = ctx.api.as_ref();
    let consumed = ctx
        .wait(WaitKind::LicenseCount, feature.unwrap_or("license"), || {
            probes::license_consumed(api, org, feature, expected)
        })
        .await?;
    info!(consumed, "License count verified");
    Ok(consumed)
}
