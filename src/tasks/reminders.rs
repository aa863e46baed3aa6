use crate::db::{clients, outbox, reminders};
use crate::services;
use crate::services::mail::EmailMessage;
use crate::state::SharedState;
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;

/// Questionnaires due within this many days get a reminder.
pub const REMINDER_WINDOW_DAYS: i64 = 3;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReminderReport {
    pub due: usize,
    pub queued: usize,
    pub already_sent: usize,
    pub without_clients: usize,
}

pub fn reminder_horizon(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::days(REMINDER_WINDOW_DAYS)
}

/// Queues one reminder per unanswered questionnaire per day. The claim row and
/// the outbox row are written together, so repeated or overlapping runs on the
/// same day queue nothing new.
pub async fn queue_reminders(pool: &PgPool, now: DateTime<Utc>) -> Result<ReminderReport> {
    let due = reminders::due_without_responses(pool, reminder_horizon(now)).await?;
    let mut report = ReminderReport {
        due: due.len(),
        ..ReminderReport::default()
    };

    for questionnaire in due {
        let Some(client_rep) = questionnaire.client_rep else {
            report.without_clients += 1;
            continue;
        };
        let emails = clients::client_emails_for_rep(pool, client_rep).await?;
        if emails.is_empty() {
            tracing::debug!("Questionnaire {} has no client contacts, skipping reminder", questionnaire.id);
            report.without_clients += 1;
            continue;
        }

        let mut tx = pool.begin().await?;
        if !reminders::claim_reminder(&mut *tx, questionnaire.id, now.date_naive()).await? {
            tx.rollback().await?;
            report.already_sent += 1;
            continue;
        }
        let message = EmailMessage::questionnaire_reminder(&questionnaire.title, emails);
        outbox::enqueue(&mut *tx, &message).await?;
        tx.commit().await?;

        tracing::info!(
            "Reminder queued for questionnaire {} (due {}) to {} recipients",
            questionnaire.id,
            questionnaire.due_at,
            message.to.len()
        );
        report.queued += 1;
    }

    Ok(report)
}

pub async fn send_reminder_emails(state: &SharedState) -> Result<ReminderReport> {
    let report = queue_reminders(&state.pool, Utc::now()).await?;
    tracing::info!(
        "Reminder scan: {} due, {} queued, {} already sent today, {} without clients",
        report.due,
        report.queued,
        report.already_sent,
        report.without_clients
    );
    services::outbox::dispatch_pending(&state.pool, state.mailer.as_ref()).await?;
    Ok(report)
}
