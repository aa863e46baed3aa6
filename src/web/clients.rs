use crate::db::{self, clients::ClientScope, DbUser};
use crate::domain::models::Client;
use crate::domain::validation::{is_valid_email, normalize_email, required_text, FieldErrors};
use crate::state::SharedState;
use crate::web::error::AppError;
use crate::web::pagination::{Page, PageQuery, PageRequest, CLIENTS_PAGE_SIZE};
use crate::web::permissions::{require, Permission};
use crate::web::session::CurrentUser;
use axum::{
    extract::{rejection::JsonRejection, OriginalUri, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

const MAX_NAME_LEN: usize = 255;

#[derive(Debug, Default, Deserialize)]
pub struct ClientPayload {
    pub email: Option<String>,
    pub name: Option<String>,
    pub client_rep: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewClient {
    pub email: String,
    pub name: String,
    pub client_rep: Option<Uuid>,
}

impl ClientPayload {
    pub fn validate(self) -> Result<NewClient, FieldErrors> {
        let mut errors = FieldErrors::new();
        let name = required_text(&mut errors, "name", self.name.as_deref(), Some(MAX_NAME_LEN));
        let email = normalize_email(self.email.as_deref().unwrap_or_default());
        if email.is_empty() {
            errors.add("email", "This field may not be blank.");
        } else if !is_valid_email(&email) {
            errors.add("email", "Enter a valid email address.");
        }
        errors.into_result(NewClient {
            email,
            name,
            client_rep: self.client_rep,
        })
    }
}

/// Superusers see every client; everyone else only their own portfolio.
fn scope_for(user: &DbUser) -> ClientScope {
    if user.is_superuser {
        None
    } else {
        Some(user.id)
    }
}

pub async fn list(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    OriginalUri(uri): OriginalUri,
    Query(page): Query<PageQuery>,
) -> Result<Json<Page<Client>>, AppError> {
    require(&state, &user, Permission::SalesManager).await?;

    let scope = scope_for(&user);
    let request = PageRequest::parse(&page, CLIENTS_PAGE_SIZE)?;
    let count = db::clients::count_clients(&state.pool, scope).await?;
    let window = request.resolve(count)?;
    let clients = db::clients::list_clients(&state.pool, scope, window.limit(), window.offset()).await?;

    Ok(Json(window.into_page(&uri, count, clients)))
}

pub async fn create(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    payload: Result<Json<ClientPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<Client>), AppError> {
    require(&state, &user, Permission::SalesManager).await?;

    let Json(payload) = payload?;
    let new = payload.validate()?;

    if let Some(rep) = new.client_rep {
        if !db::user_exists(&state.pool, rep).await? {
            return Err(AppError::field("client_rep", format!("Invalid pk \"{rep}\" - object does not exist.")));
        }
    }

    let client = db::clients::insert_client(&state.pool, &new.email, &new.name, new.client_rep, user.id)
        .await
        .map_err(|e| match db::unique_violation(&e) {
            Some(_) => AppError::field("email", "client with this email already exists."),
            None => AppError::Internal(e),
        })?;

    tracing::info!("Client created: id={}, sales_manager={}", client.id, user.id);
    Ok((StatusCode::CREATED, Json(client)))
}

pub async fn delete(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    require(&state, &user, Permission::SalesManager).await?;

    if !db::clients::delete_client(&state.pool, id, scope_for(&user)).await? {
        return Err(AppError::NotFound);
    }

    tracing::info!("Client deleted: id={}, by={}", id, user.id);
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_payload_normalizes_email() {
        let new = ClientPayload {
            email: Some("  Buyer@Example.COM ".into()),
            name: Some(" Acme ".into()),
            client_rep: None,
        }
        .validate()
        .unwrap();
        assert_eq!(new.email, "buyer@example.com");
        assert_eq!(new.name, "Acme");
    }

    #[test]
    fn test_client_payload_requires_fields() {
        let errors = ClientPayload::default().validate().unwrap_err();
        assert!(errors.contains("email"));
        assert!(errors.contains("name"));

        let errors = ClientPayload {
            email: Some("not-an-email".into()),
            name: Some("Acme".into()),
            client_rep: None,
        }
        .validate()
        .unwrap_err();
        assert_eq!(errors.get("email").unwrap()[0], "Enter a valid email address.");
    }
}
