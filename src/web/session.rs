use crate::db::{self, DbUser};
use crate::state::SharedState;
use crate::web::error::AppError;
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, HeaderMap},
};
use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

pub const TOKEN_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionClaims {
    pub user_id: Uuid,
    pub exp: i64,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("invalid token format")]
    Invalid,
    #[error("signature mismatch")]
    Signature,
    #[error("expired")]
    Expired,
}

pub fn sign_session(user_id: Uuid, key: &[u8]) -> Result<String, SessionError> {
    let exp = Utc::now() + Duration::hours(TOKEN_TTL_HOURS);
    sign_claims(&SessionClaims { user_id, exp: exp.timestamp() }, key)
}

fn sign_claims(claims: &SessionClaims, key: &[u8]) -> Result<String, SessionError> {
    let payload = format!("{}|{}", claims.user_id, claims.exp);
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| SessionError::Invalid)?;
    mac.update(payload.as_bytes());
    let sig = mac.finalize().into_bytes();
    Ok(format!(
        "{}.{}",
        general_purpose::URL_SAFE_NO_PAD.encode(payload.as_bytes()),
        general_purpose::URL_SAFE_NO_PAD.encode(sig)
    ))
}

pub fn verify_session(token: &str, key: &[u8]) -> Result<SessionClaims, SessionError> {
    let (payload_b64, sig_b64) = token.split_once('.').ok_or(SessionError::Invalid)?;
    let payload_bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| SessionError::Invalid)?;
    let sig_bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(sig_b64)
        .map_err(|_| SessionError::Invalid)?;

    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| SessionError::Invalid)?;
    mac.update(&payload_bytes);
    mac.verify_slice(&sig_bytes).map_err(|_| SessionError::Signature)?;

    let payload = String::from_utf8(payload_bytes).map_err(|_| SessionError::Invalid)?;
    let (user_id, exp) = payload.split_once('|').ok_or(SessionError::Invalid)?;
    let user_id = Uuid::parse_str(user_id).map_err(|_| SessionError::Invalid)?;
    let exp: i64 = exp.parse().map_err(|_| SessionError::Invalid)?;
    if Utc::now().timestamp() > exp {
        return Err(SessionError::Expired);
    }
    Ok(SessionClaims { user_id, exp })
}

/// Reads `Authorization: Bearer <token>` (or the `Token <token>` form).
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(axum::http::header::AUTHORIZATION)?.to_str().ok()?;
    value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("Token "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// The authenticated, active user behind the request's bearer token.
pub struct CurrentUser(pub DbUser);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    SharedState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let shared_state = SharedState::from_ref(state);

        let token = extract_token(&parts.headers).ok_or(AppError::Unauthorized)?;

        let claims = verify_session(&token, &shared_state.session_key).map_err(|e| {
            tracing::warn!("Session verification failed: {}", e);
            AppError::Unauthorized
        })?;

        let user = db::find_user_by_id(&shared_state.pool, claims.user_id)
            .await
            .map_err(|e| {
                tracing::warn!("User lookup failed for session: {}", e);
                AppError::Unauthorized
            })?;

        match user {
            Some(user) if user.is_active => Ok(CurrentUser(user)),
            _ => Err(AppError::Unauthorized),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[u8] = b"0123456789abcdef0123456789abcdef";

    #[test]
    fn test_sign_then_verify() {
        let user_id = Uuid::new_v4();
        let token = sign_session(user_id, KEY).unwrap();
        let claims = verify_session(&token, KEY).unwrap();
        assert_eq!(claims.user_id, user_id);
        assert!(claims.exp > Utc::now().timestamp());
    }

    #[test]
    fn test_wrong_key_rejected() {
        let token = sign_session(Uuid::new_v4(), KEY).unwrap();
        assert_eq!(
            verify_session(&token, b"another-key-another-key-another-k"),
            Err(SessionError::Signature)
        );
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let token = sign_session(Uuid::new_v4(), KEY).unwrap();
        let (_, sig) = token.split_once('.').unwrap();
        let forged = general_purpose::URL_SAFE_NO_PAD.encode(format!("{}|{}", Uuid::new_v4(), i64::MAX));
        assert_eq!(
            verify_session(&format!("{forged}.{sig}"), KEY),
            Err(SessionError::Signature)
        );
    }

    #[test]
    fn test_expired_token_rejected() {
        let claims = SessionClaims {
            user_id: Uuid::new_v4(),
            exp: Utc::now().timestamp() - 10,
        };
        let token = sign_claims(&claims, KEY).unwrap();
        assert_eq!(verify_session(&token, KEY), Err(SessionError::Expired));
    }

    #[test]
    fn test_garbage_rejected() {
        assert_eq!(verify_session("not-a-token", KEY), Err(SessionError::Invalid));
        assert_eq!(verify_session("a.b", KEY), Err(SessionError::Invalid));
    }

    #[test]
    fn test_extract_token_forms() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_token(&headers), None);

        headers.insert(axum::http::header::AUTHORIZATION, "Bearer abc.def".parse().unwrap());
        assert_eq!(extract_token(&headers).as_deref(), Some("abc.def"));

        headers.insert(axum::http::header::AUTHORIZATION, "Token xyz".parse().unwrap());
        assert_eq!(extract_token(&headers).as_deref(), Some("xyz"));

        headers.insert(axum::http::header::AUTHORIZATION, "Basic dXNlcjpwYXNz".parse().unwrap());
        assert_eq!(extract_token(&headers), None);
    }
}
