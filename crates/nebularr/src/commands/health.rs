//! Health command handler.

use tabled::{Table, Tabled, settings::Style};

use nebularr_core::adapter::HealthIssue;
use nebularr_core::{Context, HealthStatus};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::Session;

#[derive(Tabled)]
struct IssueRow {
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Message")]
    message: String,
}

impl From<&HealthIssue> for IssueRow {
    fn from(i: &HealthIssue) -> Self {
        Self {
            severity: i.severity.clone(),
            source: i.source.clone(),
            message: i.message.clone(),
        }
    }
}

fn detail(h: &HealthStatus) -> String {
    let verdict = if h.healthy { "Healthy" } else { "Unhealthy" };
    if h.issues.is_empty() {
        return format!("{verdict}: no issues reported");
    }
    let rows: Vec<IssueRow> = h.issues.iter().map(IssueRow::from).collect();
    format!(
        "{verdict}: {} issues\n{}",
        h.issues.len(),
        Table::new(rows).with(Style::rounded())
    )
}

fn lines(h: &HealthStatus) -> String {
    h.issues
        .iter()
        .map(|i| format!("{}\t{}\t{}", i.severity, i.source, i.message))
        .collect::<Vec<_>>()
        .join("\n")
}

pub async fn handle(session: &Session, instance: &str, global: &GlobalOpts) -> Result<(), CliError> {
    let object = session.object(instance)?;
    let unsupported = || CliError::Unsupported {
        instance: instance.to_owned(),
        operation: "Health reporting".into(),
    };
    let adapter = session
        .reconciler
        .registry()
        .get(object.backend)
        .ok_or_else(unsupported)?;
    let reporter = adapter.as_health_reporter().ok_or_else(unsupported)?;

    let ctx = Context::default();
    let health = ctx
        .run(reporter.health(&ctx, &object.connection))
        .await
        .map_err(|e| CliError::adapter(instance, e))?;

    let out = output::render_single(global.output, &health, detail, lines);
    output::print_output(&out, global.quiet);
    Ok(())
}
