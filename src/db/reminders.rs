use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct DueQuestionnaire {
    pub id: Uuid,
    pub title: String,
    pub client_rep: Option<Uuid>,
    pub due_at: DateTime<Utc>,
}

/// Active questionnaires due on or before `horizon` that nobody has answered yet.
pub async fn due_without_responses(pool: &PgPool, horizon: DateTime<Utc>) -> Result<Vec<DueQuestionnaire>> {
    let rows = sqlx::query_as::<_, DueQuestionnaire>(
        r#"
        SELECT q.id, q.title, q.client_rep, q.due_at
        FROM questionnaires q
        WHERE q.is_active = TRUE
          AND q.due_at <= $1
          AND NOT EXISTS (SELECT 1 FROM responses r WHERE r.questionnaire_id = q.id)
        ORDER BY q.due_at, q.id
        "#,
    )
    .bind(horizon)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Records that a reminder goes out for `questionnaire_id` on `day`.
/// Returns false if another run already claimed it.
pub async fn claim_reminder(conn: &mut PgConnection, questionnaire_id: Uuid, day: NaiveDate) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO questionnaire_reminders (questionnaire_id, sent_on)
        VALUES ($1, $2)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(questionnaire_id)
    .bind(day)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}
