use crate::domain::models::Client;
use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;

const CLIENT_COLUMNS: &str = "id, email, name, client_rep, sales_manager, created_at, updated_at";

/// `None` lists every client (superusers); `Some(id)` restricts to one sales manager.
pub type ClientScope = Option<Uuid>;

pub async fn insert_client(
    pool: &PgPool,
    email: &str,
    name: &str,
    client_rep: Option<Uuid>,
    sales_manager: Uuid,
) -> Result<Client> {
    let client = sqlx::query_as::<_, Client>(&format!(
        r#"
        INSERT INTO clients (id, email, name, client_rep, sales_manager)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {CLIENT_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(name)
    .bind(client_rep)
    .bind(sales_manager)
    .fetch_one(pool)
    .await?;
    Ok(client)
}

pub async fn count_clients(pool: &PgPool, scope: ClientScope) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM clients WHERE ($1::uuid IS NULL OR sales_manager = $1)",
    )
    .bind(scope)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

pub async fn list_clients(pool: &PgPool, scope: ClientScope, limit: i64, offset: i64) -> Result<Vec<Client>> {
    let clients = sqlx::query_as::<_, Client>(&format!(
        r#"
        SELECT {CLIENT_COLUMNS}
        FROM clients
        WHERE ($1::uuid IS NULL OR sales_manager = $1)
        ORDER BY created_at DESC, id
        LIMIT $2 OFFSET $3
        "#
    ))
    .bind(scope)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;
    Ok(clients)
}

/// Returns false when no client inside `scope` has this id.
pub async fn delete_client(pool: &PgPool, id: Uuid, scope: ClientScope) -> Result<bool> {
    let result = sqlx::query("DELETE FROM clients WHERE id = $1 AND ($2::uuid IS NULL OR sales_manager = $2)")
        .bind(id)
        .bind(scope)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn client_emails_for_rep(pool: &PgPool, client_rep: Uuid) -> Result<Vec<String>> {
    let emails = sqlx::query_scalar::<_, String>(
        "SELECT email FROM clients WHERE client_rep = $1 ORDER BY email",
    )
    .bind(client_rep)
    .fetch_all(pool)
    .await?;
    Ok(emails)
}
