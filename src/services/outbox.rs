use crate::db::outbox::{self, OutboxRow};
use crate::services::mail::Mailer;
use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;

const BATCH_SIZE: i64 = 50;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    pub sent: usize,
    pub failed: usize,
}

/// Delivers queued emails. Each row is leased before sending and settled on
/// its own, so one slow or failing send never holds a connection or undoes
/// another row's outcome.
pub async fn dispatch_pending(pool: &PgPool, mailer: &dyn Mailer) -> Result<DispatchReport> {
    let mut report = DispatchReport::default();
    let rows = outbox::claim_pending(pool, BATCH_SIZE).await?;

    for row in rows {
        deliver(pool, mailer, &row, &mut report).await?;
    }

    if report.sent > 0 || report.failed > 0 {
        tracing::info!("Outbox dispatch: {} sent, {} failed", report.sent, report.failed);
    }
    Ok(report)
}

/// Delivers a single outbox row, typically the one a request just committed.
/// Rows already delivered or leased by another dispatcher are left alone.
pub async fn dispatch_one(pool: &PgPool, mailer: &dyn Mailer, id: Uuid) -> Result<DispatchReport> {
    let mut report = DispatchReport::default();
    match outbox::claim_one(pool, id).await? {
        Some(row) => deliver(pool, mailer, &row, &mut report).await?,
        None => tracing::debug!("Outbox row {} not claimable, leaving it to the scheduler", id),
    }
    Ok(report)
}

async fn deliver(pool: &PgPool, mailer: &dyn Mailer, row: &OutboxRow, report: &mut DispatchReport) -> Result<()> {
    match mailer.send(&row.message()).await {
        Ok(()) => {
            outbox::mark_sent(pool, row.id).await?;
            report.sent += 1;
            tracing::debug!("Delivered {:?} email {} to {} recipients", row.kind, row.id, row.recipients.len());
        }
        Err(e) => {
            outbox::mark_failed(pool, row.id, &e.to_string()).await?;
            report.failed += 1;
            if row.attempts + 1 >= outbox::MAX_ATTEMPTS {
                tracing::error!("Giving up on {:?} email {} after {} attempts: {}", row.kind, row.id, row.attempts + 1, e);
            } else {
                tracing::warn!("Failed to deliver {:?} email {}: {}", row.kind, row.id, e);
            }
        }
    }
    Ok(())
}
