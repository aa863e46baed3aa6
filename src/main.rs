use b2b_feedback::{config::AppConfig, db::seed, services, state, tasks, web};
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to database: {}", e);
            e
        })?;
    tracing::info!("Database connection established");

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to run database migrations: {}", e);
            e
        })?;
    tracing::info!("Database migrations completed");

    seed::seed_all(&pool, config.bootstrap_admin.as_ref()).await?;

    let mailer = services::mail::mailer_from_config(&config.mail)?;
    let shared: state::SharedState = Arc::new(state::AppState::new(pool, config.session_key.clone(), mailer));

    let scheduler = JobScheduler::new().await?;

    // Reminders for questionnaires due within three days that have no response yet
    let shared_for_reminders = shared.clone();
    scheduler
        .add(Job::new_async(config.reminder_cron.as_str(), move |_uuid, _l| {
            let state = shared_for_reminders.clone();
            Box::pin(async move {
                if let Err(e) = tasks::reminders::send_reminder_emails(&state).await {
                    tracing::error!("Failed to send questionnaire reminders: {:#}", e);
                }
            })
        })?)
        .await?;

    // Retry anything left in the outbox
    let shared_for_outbox = shared.clone();
    scheduler
        .add(Job::new_async(config.outbox_cron.as_str(), move |_uuid, _l| {
            let state = shared_for_outbox.clone();
            Box::pin(async move {
                if let Err(e) = services::outbox::dispatch_pending(&state.pool, state.mailer.as_ref()).await {
                    tracing::error!("Outbox dispatch failed: {:#}", e);
                }
            })
        })?)
        .await?;

    let shared_for_cleanup = shared.clone();
    scheduler
        .add(Job::new_async("0 15 * * * *", move |_uuid, _l| {
            let state = shared_for_cleanup.clone();
            Box::pin(async move {
                state.login_limiter.cleanup().await;
            })
        })?)
        .await?;

    scheduler.start().await?;
    tracing::info!("Scheduler started:");
    tracing::info!("  - Questionnaire reminders: {}", config.reminder_cron);
    tracing::info!("  - Outbox dispatch: {}", config.outbox_cron);
    tracing::info!("  - Login limiter cleanup: hourly");

    let app = Router::new()
        .merge(web::routes(shared))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    tracing::info!("Listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
