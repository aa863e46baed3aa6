use crate::config::BootstrapAdmin;
use crate::db;
use crate::domain::models::Role;
use crate::domain::validation::normalize_email;
use crate::services::password::hash_password;
use anyhow::Result;
use sqlx::PgPool;

pub async fn seed_all(pool: &PgPool, admin: Option<&BootstrapAdmin>) -> Result<()> {
    seed_groups(pool).await?;
    if let Some(admin) = admin {
        seed_admin(pool, admin).await?;
    }
    Ok(())
}

async fn seed_groups(pool: &PgPool) -> Result<()> {
    for role in [Role::SalesManager, Role::ClientRep] {
        db::ensure_group(pool, role.group_name()).await?;
    }
    tracing::info!("Role groups ensured");
    Ok(())
}

async fn seed_admin(pool: &PgPool, admin: &BootstrapAdmin) -> Result<()> {
    let email = normalize_email(&admin.email);
    if db::find_user_by_email(pool, &email).await?.is_some() {
        tracing::debug!("Bootstrap superuser {} already present", email);
        return Ok(());
    }

    let hash = hash_password(&admin.password)?;
    let user = db::insert_user(pool, &email, "Administrator", &hash, true).await?;
    tracing::info!("Bootstrap superuser created: {} ({})", user.email, user.id);
    Ok(())
}
