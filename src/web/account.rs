use crate::db;
use crate::domain::validation::{normalize_email, FieldErrors, NON_FIELD_ERRORS};
use crate::middleware::rate_limit::client_ip;
use crate::services::password::verify_password;
use crate::state::SharedState;
use crate::web::error::AppError;
use crate::web::{route_both, session};
use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, State},
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

const BAD_CREDENTIALS: &str = "Unable to log in with provided credentials.";

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
}

pub fn router(state: SharedState) -> Router {
    route_both(Router::new(), "/login", post(login)).with_state(state)
}

async fn login(
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    State(state): State<SharedState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    let ip = client_ip(&headers, connect_info.as_ref());
    if !state.login_limiter.check(&ip).await {
        tracing::warn!("Login rate limit exceeded for IP: {}", ip);
        return Err(AppError::TooManyRequests);
    }

    let Json(payload) = payload?;
    let email = normalize_email(payload.email.as_deref().unwrap_or_default());
    let password = payload.password.unwrap_or_default();

    let mut errors = FieldErrors::new();
    if email.is_empty() {
        errors.add("email", "This field may not be blank.");
    }
    if password.is_empty() {
        errors.add("password", "This field may not be blank.");
    }
    errors.into_result(())?;

    let user = db::find_user_by_email(&state.pool, &email)
        .await?
        .filter(|u| u.is_active)
        .filter(|u| verify_password(&password, &u.hash))
        .ok_or_else(|| {
            tracing::info!("Rejected login for {}", email);
            AppError::field(NON_FIELD_ERRORS, BAD_CREDENTIALS)
        })?;

    let token = session::sign_session(user.id, &state.session_key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("token signing failed: {e}")))?;

    tracing::info!("User {} logged in", user.id);
    Ok(Json(LoginResponse { token }))
}
