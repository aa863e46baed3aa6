pub mod clients;
pub mod monthly_feedback;
pub mod outbox;
pub mod questionnaires;
pub mod reminders;
pub mod responses;
pub mod seed;

use crate::domain::models::Role;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub hash: String,
    pub is_active: bool,
    pub is_superuser: bool,
    pub created_at: DateTime<Utc>,
}

const USER_COLUMNS: &str = "id, email, name, hash, is_active, is_superuser, created_at";

pub async fn find_user_by_email(pool: &PgPool, email: &str) -> Result<Option<DbUser>> {
    let user = sqlx::query_as::<_, DbUser>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

pub async fn find_user_by_id(pool: &PgPool, id: Uuid) -> Result<Option<DbUser>> {
    let user = sqlx::query_as::<_, DbUser>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

pub async fn user_exists(pool: &PgPool, id: Uuid) -> Result<bool> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
        .bind(id)
        .fetch_one(pool)
        .await?;
    Ok(exists)
}

pub async fn insert_user(
    pool: &PgPool,
    email: &str,
    name: &str,
    hash: &str,
    is_superuser: bool,
) -> Result<DbUser> {
    let user = sqlx::query_as::<_, DbUser>(&format!(
        r#"
        INSERT INTO users (id, email, name, hash, is_superuser)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(name)
    .bind(hash)
    .bind(is_superuser)
    .fetch_one(pool)
    .await?;
    Ok(user)
}

/// Group names of the user, read fresh from the membership table.
pub async fn user_group_names(pool: &PgPool, user_id: Uuid) -> Result<Vec<String>> {
    let names = sqlx::query_scalar::<_, String>(
        r#"
        SELECT g.name
        FROM groups g
        JOIN user_groups ug ON ug.group_id = g.id
        WHERE ug.user_id = $1
        ORDER BY g.name
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(names)
}

pub async fn ensure_group(pool: &PgPool, name: &str) -> Result<i32> {
    let id: i32 = sqlx::query_scalar(
        r#"
        INSERT INTO groups (name) VALUES ($1)
        ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        "#,
    )
    .bind(name)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

pub async fn add_user_to_role(pool: &PgPool, user_id: Uuid, role: Role) -> Result<()> {
    let group_id = ensure_group(pool, role.group_name()).await?;
    sqlx::query(
        r#"
        INSERT INTO user_groups (user_id, group_id) VALUES ($1, $2)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(group_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Name of the violated unique constraint, if `err` is a unique violation.
pub fn unique_violation(err: &anyhow::Error) -> Option<String> {
    let db_err = err.downcast_ref::<sqlx::Error>()?.as_database_error()?;
    if db_err.code().as_deref() == Some("23505") {
        Some(db_err.constraint().unwrap_or_default().to_string())
    } else {
        None
    }
}
