use crate::services::mail::{EmailKind, EmailMessage};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

/// Rows with this many failed attempts are left alone.
pub const MAX_ATTEMPTS: i32 = 5;

#[derive(Debug, Clone, FromRow)]
pub struct OutboxRow {
    pub id: Uuid,
    pub kind: EmailKind,
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
    pub attempts: i32,
    pub created_at: DateTime<Utc>,
}

impl OutboxRow {
    pub fn message(&self) -> EmailMessage {
        EmailMessage {
            kind: self.kind,
            to: self.recipients.clone(),
            subject: self.subject.clone(),
            body: self.body.clone(),
        }
    }
}

/// Queues `message` on the caller's connection, normally inside the
/// transaction that produced it.
pub async fn enqueue(conn: &mut PgConnection, message: &EmailMessage) -> Result<Uuid, sqlx::Error> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO email_outbox (id, kind, recipients, subject, body)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(id)
    .bind(message.kind)
    .bind(&message.to)
    .bind(&message.subject)
    .bind(&message.body)
    .execute(conn)
    .await?;
    Ok(id)
}

/// How long a claimed row is reserved for the claiming dispatcher.
pub const LEASE_SECS: i64 = 300;

const CLAIMABLE: &str = r#"
    sent_at IS NULL
    AND attempts < $1
    AND (locked_until IS NULL OR locked_until < now())
"#;

const ROW_COLUMNS: &str = "id, kind, recipients, subject, body, attempts, created_at";

/// Leases up to `limit` undelivered rows. The lease is committed on return, so
/// nothing stays locked while the mail is sent; other dispatchers skip the rows
/// until the lease runs out.
pub async fn claim_pending(pool: &PgPool, limit: i64) -> Result<Vec<OutboxRow>, sqlx::Error> {
    sqlx::query_as::<_, OutboxRow>(&format!(
        r#"
        UPDATE email_outbox
        SET locked_until = now() + make_interval(secs => $3)
        WHERE id IN (
            SELECT id FROM email_outbox
            WHERE {CLAIMABLE}
            ORDER BY created_at
            LIMIT $2
            FOR UPDATE SKIP LOCKED
        )
        RETURNING {ROW_COLUMNS}
        "#
    ))
    .bind(MAX_ATTEMPTS)
    .bind(limit)
    .bind(LEASE_SECS as f64)
    .fetch_all(pool)
    .await
}

/// Leases a single row; `None` when it is delivered, exhausted or leased elsewhere.
pub async fn claim_one(pool: &PgPool, id: Uuid) -> Result<Option<OutboxRow>, sqlx::Error> {
    sqlx::query_as::<_, OutboxRow>(&format!(
        r#"
        UPDATE email_outbox
        SET locked_until = now() + make_interval(secs => $3)
        WHERE id = $2 AND {CLAIMABLE}
        RETURNING {ROW_COLUMNS}
        "#
    ))
    .bind(MAX_ATTEMPTS)
    .bind(id)
    .bind(LEASE_SECS as f64)
    .fetch_optional(pool)
    .await
}

pub async fn mark_sent(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE email_outbox
        SET sent_at = now(), attempts = attempts + 1, last_error = NULL, locked_until = NULL
        WHERE id = $1
        "#,
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn mark_failed(pool: &PgPool, id: Uuid, error: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE email_outbox
        SET attempts = attempts + 1, last_error = $2, locked_until = NULL
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(error)
    .execute(pool)
    .await?;
    Ok(())
}
