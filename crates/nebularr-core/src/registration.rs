// ── Prowlarr registration ──
//
// Downstream applications do not push themselves to Prowlarr; Prowlarr pulls
// from them once an application entry points at their URL. This observes
// that entry from the application's side.

use chrono::Utc;
use tracing::{debug, warn};

use crate::adapter::{BackendKind, Registry};
use crate::context::Context;
use crate::object::ManagedObject;
use crate::status::ProwlarrRegistration;

/// Observed registration of `object` with its Prowlarr, or `None` when it
/// references none. Failures are reported in `message`, never raised.
pub async fn observe(
    registry: &Registry,
    ctx: &Context,
    object: &ManagedObject,
) -> Option<ProwlarrRegistration> {
    let prowlarr = object.prowlarr.as_ref()?;
    let mut observed = ProwlarrRegistration {
        prowlarr_name: prowlarr.name.clone(),
        ..ProwlarrRegistration::default()
    };

    let Some(adapter) = registry.get(BackendKind::Prowlarr) else {
        observed.message = "no prowlarr adapter registered".into();
        return Some(observed);
    };
    let Some(source) = adapter.as_registration_source() else {
        observed.message = "prowlarr adapter cannot report registrations".into();
        return Some(observed);
    };

    let lookup = source.registered_application(ctx, &prowlarr.connection, &object.connection.url);
    match ctx.run(lookup).await {
        Ok(Some(app)) => {
            debug!(prowlarr = %prowlarr.name, application = app.id, "registered");
            observed.registered = true;
            observed.application_id = Some(app.id);
            observed.synced_indexers = app.synced_indexers;
            observed.last_sync = Some(Utc::now());
            observed.message = match app.sync_level {
                Some(level) => format!("registered as {} ({level})", app.name),
                None => format!("registered as {}", app.name),
            };
        }
        Ok(None) => {
            observed.message = format!("no application for {} on {}", object.connection.url, prowlarr.name);
        }
        Err(e) => {
            warn!(prowlarr = %prowlarr.name, error = %e, "registration check failed");
            observed.message = e.to_string();
        }
    }
    Some(observed)
}
