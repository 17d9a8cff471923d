//! Reconcile command handler.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tabled::Tabled;
use tracing::info;

use nebularr_core::{Context, Phase, ReconcileOutcome, ReconcilePool, StatusStore};

use crate::cli::{GlobalOpts, ReconcileArgs};
use crate::error::CliError;
use crate::output;

use super::Session;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Summary {
    instance: String,
    phase: Phase,
    changes: usize,
    applied: usize,
    failed: usize,
    skipped: usize,
    requeue_after_secs: Option<u64>,
    message: String,
}

impl Summary {
    fn new(instance: String, outcome: &ReconcileOutcome) -> Self {
        let result = outcome.result.clone().unwrap_or_default();
        Self {
            instance,
            phase: outcome.phase,
            changes: outcome
                .changes
                .as_ref()
                .map_or(result.total(), nebularr_core::ChangeSet::total_changes),
            applied: result.applied,
            failed: result.failed,
            skipped: result.skipped,
            requeue_after_secs: outcome.requeue_after.map(|d| d.as_secs()),
            message: outcome.status.message().to_owned(),
        }
    }

    fn settled(&self) -> bool {
        matches!(self.phase, Phase::Ready | Phase::Suspended)
    }
}

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Instance")]
    instance: String,
    #[tabled(rename = "Phase")]
    phase: String,
    #[tabled(rename = "Changes")]
    changes: usize,
    #[tabled(rename = "Applied")]
    applied: usize,
    #[tabled(rename = "Failed")]
    failed: usize,
    #[tabled(rename = "Next")]
    next: String,
    #[tabled(rename = "Message")]
    message: String,
}

fn row(s: &Summary, color: bool) -> SummaryRow {
    SummaryRow {
        instance: s.instance.clone(),
        phase: output::phase(Some(s.phase), color),
        changes: s.changes,
        applied: s.applied,
        failed: s.failed,
        next: s.requeue_after_secs.map_or_else(|| "-".into(), |secs| format!("{secs}s")),
        message: s.message.clone(),
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(session: &Session, args: ReconcileArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let objects = session.objects(&args.instances)?;
    let store: Arc<dyn StatusStore> = session.store.clone();
    let pool = Arc::new(ReconcilePool::new(
        Arc::clone(&session.reconciler),
        store,
        session.config.defaults.workers,
    ));
    let ctx = Context::default();

    if args.watch {
        let token = ctx.token().clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received, stopping");
                token.cancel();
            }
        });
        pool.watch(&ctx, &objects, Duration::from_secs(args.tick.max(1)))
            .await?;
        return Ok(());
    }

    let mut summaries = Vec::with_capacity(objects.len());
    for (name, result) in pool.reconcile_all(&ctx, &objects).await {
        summaries.push(Summary::new(name, &result?));
    }

    let out = output::render_list(
        global.output,
        &summaries,
        |s| row(s, session.color),
        |s| format!("{}\t{}", s.instance, s.phase),
    );
    output::print_output(&out, global.quiet);

    let failed = summaries.iter().filter(|s| !s.settled()).count();
    if failed > 0 {
        return Err(CliError::NotReconciled {
            failed,
            total: summaries.len(),
        });
    }
    Ok(())
}
