use crate::domain::models::MonthlyFeedback;
use crate::domain::month::Month;
use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;

const FEEDBACK_COLUMNS: &str = "f.id, f.month, f.feedback, f.client_rep, f.created_at";

/// Entries written by representatives of the sales manager's clients.
const MANAGER_FILTER: &str = r#"
    f.client_rep IN (
        SELECT c.client_rep FROM clients c
        WHERE c.sales_manager = $1 AND c.client_rep IS NOT NULL
    )
"#;

/// Fails with a unique violation (`unique_monthly_feedback`) when the
/// representative already has an entry for `month`.
pub async fn insert_feedback(pool: &PgPool, client_rep: Uuid, month: Month, feedback: &str) -> Result<MonthlyFeedback> {
    let row = sqlx::query_as::<_, MonthlyFeedback>(
        r#"
        INSERT INTO monthly_feedback AS f (id, month, feedback, client_rep)
        VALUES ($1, $2, $3, $4)
        RETURNING f.id, f.month, f.feedback, f.client_rep, f.created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(month.to_string())
    .bind(feedback)
    .bind(client_rep)
    .fetch_one(pool)
    .await?;

    tracing::info!("Monthly feedback stored: id={}, client_rep={}, month={}", row.id, client_rep, month);
    Ok(row)
}

pub async fn count_for_manager(pool: &PgPool, sales_manager: Uuid) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM monthly_feedback f WHERE {MANAGER_FILTER}"
    ))
    .bind(sales_manager)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

pub async fn list_for_manager(pool: &PgPool, sales_manager: Uuid, limit: i64, offset: i64) -> Result<Vec<MonthlyFeedback>> {
    let rows = sqlx::query_as::<_, MonthlyFeedback>(&format!(
        r#"
        SELECT {FEEDBACK_COLUMNS}
        FROM monthly_feedback f
        WHERE {MANAGER_FILTER}
        ORDER BY f.month DESC, f.created_at DESC
        LIMIT $2 OFFSET $3
        "#
    ))
    .bind(sales_manager)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
