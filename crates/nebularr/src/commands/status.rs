//! Status command handler: the persisted conditions of each instance.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

use nebularr_core::{ConditionType, ObjectStatus};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::Session;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Entry {
    instance: String,
    #[serde(flatten)]
    status: ObjectStatus,
}

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "Instance")]
    instance: String,
    #[tabled(rename = "Phase")]
    phase: String,
    #[tabled(rename = "Ready")]
    ready: String,
    #[tabled(rename = "Gen")]
    generation: String,
    #[tabled(rename = "Failures")]
    failures: u32,
    #[tabled(rename = "Last reconcile")]
    last_reconcile: String,
    #[tabled(rename = "Message")]
    message: String,
}

#[derive(Tabled)]
struct ConditionRow {
    #[tabled(rename = "Type")]
    condition_type: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Reason")]
    reason: String,
    #[tabled(rename = "Since")]
    since: String,
    #[tabled(rename = "Message")]
    message: String,
}

fn time(t: Option<DateTime<Utc>>) -> String {
    t.map_or_else(|| "-".into(), |t| t.format("%Y-%m-%d %H:%M:%S").to_string())
}

fn ready(status: &ObjectStatus) -> String {
    status
        .condition(ConditionType::Ready)
        .map_or_else(|| "-".into(), |c| c.status.to_string())
}

fn row(e: &Entry, color: bool) -> StatusRow {
    StatusRow {
        instance: e.instance.clone(),
        phase: output::phase(e.status.phase, color),
        ready: ready(&e.status),
        generation: e
            .status
            .observed_generation
            .map_or_else(|| "-".into(), |g| g.to_string()),
        failures: e.status.consecutive_failures,
        last_reconcile: time(e.status.last_reconcile),
        message: e.status.message().to_owned(),
    }
}

fn detail(e: &Entry, color: bool) -> String {
    let s = &e.status;
    let mut lines = vec![
        format!("Instance:        {}", e.instance),
        format!("Phase:           {}", output::phase(s.phase, color)),
        format!(
            "Service version: {}",
            s.service_version.as_deref().unwrap_or("-")
        ),
        format!(
            "Generation:      {}",
            s.observed_generation
                .map_or_else(|| "-".into(), |g| g.to_string())
        ),
        format!(
            "Applied hash:    {}",
            s.last_applied_hash.as_deref().unwrap_or("-")
        ),
        format!("Last reconcile:  {}", time(s.last_reconcile)),
        format!("Next retry:      {}", time(s.next_retry)),
        format!("Failures:        {}", s.consecutive_failures),
        format!("Managed:         {} resources", s.managed_resources.len()),
    ];
    if let Some(reg) = &s.prowlarr_registration {
        let state = if reg.registered {
            format!("registered, {} indexers synced", reg.synced_indexers)
        } else {
            "not registered".into()
        };
        lines.push(format!("Prowlarr:        {} ({state})", reg.prowlarr_name));
    }
    if let Some(health) = &s.health {
        lines.push(format!(
            "Health:          {} ({} issues)",
            if health.healthy { "healthy" } else { "unhealthy" },
            health.issues.len()
        ));
    }
    if !s.conditions.is_empty() {
        let rows: Vec<ConditionRow> = s
            .conditions
            .iter()
            .map(|c| ConditionRow {
                condition_type: c.condition_type.to_string(),
                status: c.status.to_string(),
                reason: c.reason.clone(),
                since: time(Some(c.last_transition_time)),
                message: c.message.clone(),
            })
            .collect();
        lines.push(String::new());
        lines.push(Table::new(rows).with(Style::rounded()).to_string());
    }
    lines.join("\n")
}

fn line(e: &Entry) -> String {
    let phase = e.status.phase.map_or_else(|| "-".into(), |p| p.to_string());
    format!("{}\t{phase}\t{}", e.instance, ready(&e.status))
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    session: &Session,
    instance: Option<&str>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let mut entries = Vec::new();
    for name in session.instance_names(instance)? {
        let status = session.status(&name).await?;
        entries.push(Entry {
            instance: name,
            status,
        });
    }

    let out = match (instance, entries.as_slice()) {
        (Some(_), [entry]) => {
            output::render_single(global.output, entry, |e| detail(e, session.color), line)
        }
        _ => output::render_list(global.output, &entries, |e| row(e, session.color), line),
    };
    output::print_output(&out, global.quiet);
    Ok(())
}
