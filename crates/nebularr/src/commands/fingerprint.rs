//! Fingerprint command handler.

use serde::Serialize;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::Session;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Fingerprint {
    instance: String,
    fingerprint: String,
    last_applied_hash: Option<String>,
    in_sync: bool,
}

fn detail(f: &Fingerprint) -> String {
    [
        format!("Instance:      {}", f.instance),
        format!("Fingerprint:   {}", f.fingerprint),
        format!(
            "Last applied:  {}",
            f.last_applied_hash.as_deref().unwrap_or("-")
        ),
        format!("In sync:       {}", if f.in_sync { "yes" } else { "no" }),
    ]
    .join("\n")
}

pub async fn handle(session: &Session, instance: &str, global: &GlobalOpts) -> Result<(), CliError> {
    let object = session.object(instance)?;
    let status = session.status(instance).await?;

    let fingerprint = object.fingerprint()?;
    let view = Fingerprint {
        instance: instance.to_owned(),
        in_sync: status.last_applied_hash.as_deref() == Some(fingerprint.as_str()),
        fingerprint,
        last_applied_hash: status.last_applied_hash,
    };

    let out = output::render_single(global.output, &view, detail, |f| f.fingerprint.clone());
    output::print_output(&out, global.quiet);
    Ok(())
}
