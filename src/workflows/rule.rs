use tracing::{info, instrument};

use crate::api::ObjectRef;
use crate::context::Context;
use crate::error::Result;

/// Resolve a rule name to the reference a backup request carries.
pub async fn rule_ref(ctx: &Context, org: &str, name: &str) -> Result<ObjectRef> {
    let uid = ctx.api.rule_uid(org, name).await?;
    Ok(ObjectRef::new(name, &uid))
}

#[instrument(skip(ctx))]
pub async fn delete_rule(ctx: &Context, org: &str, name: &str) -> Result<()> {
    let uid = ctx.api.rule_uid(org, name).await?;
    ctx.api.delete_rule(org, name, &uid).await?;
    info!("Rule deleted");
    Ok(())
}
