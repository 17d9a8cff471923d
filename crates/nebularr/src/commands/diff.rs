//! Diff command handler.

use tracing::info;

use nebularr_core::Context;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::Session;

pub async fn handle(session: &Session, instance: &str, global: &GlobalOpts) -> Result<(), CliError> {
    let object = session.object(instance)?;
    let status = session.status(instance).await?;

    let plan = session
        .reconciler
        .plan(&Context::default(), &object, &status.managed_resources)
        .await
        .map_err(|e| CliError::reconcile(instance, e))?;
    info!(
        instance,
        version = %plan.service.version,
        changes = plan.changes.total_changes(),
        "planned"
    );

    let out = output::render_changes(global.output, &plan.changes, session.color);
    output::print_output(&out, global.quiet);
    Ok(())
}
