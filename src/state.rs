use crate::middleware::RateLimiter;
use crate::services::mail::Mailer;
use sqlx::PgPool;
use std::sync::Arc;

/// Login attempts allowed per client address inside the window.
pub const LOGIN_ATTEMPTS: usize = 5;
pub const LOGIN_WINDOW_SECS: u64 = 60;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub session_key: Vec<u8>,
    pub mailer: Arc<dyn Mailer>,
    pub login_limiter: RateLimiter,
}

impl AppState {
    pub fn new(pool: PgPool, session_key: Vec<u8>, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            pool,
            session_key,
            mailer,
            login_limiter: RateLimiter::new(LOGIN_ATTEMPTS, LOGIN_WINDOW_SECS),
        }
    }
}

pub type SharedState = Arc<AppState>;
