use crate::context::Context;
use crate::error::{Error, Result};
use crate::report::Verifier;
use crate::workflows::license;

pub async fn run(ctx: &Context, verifier: &mut Verifier) -> Result<()> {
    let config = verifier.fatal(
        ctx.config
            .license
            .clone()
            .ok_or_else(|| Error::Precondition("license section is not configured".to_string())),
        "license configuration present",
    )?;

    verifier.fatal(
        license::verify_license_consumed_count(
            ctx,
            ctx.org(),
            config.feature.as_deref(),
            config.expected_consumed,
        )
        .await,
        &format!("license consumed count is {}", config.expected_consumed),
    )?;
    Ok(())
}
