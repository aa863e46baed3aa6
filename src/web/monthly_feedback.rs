use crate::db;
use crate::domain::models::MonthlyFeedback;
use crate::domain::month::Month;
use crate::domain::validation::{required_text, FieldErrors, NON_FIELD_ERRORS};
use crate::state::SharedState;
use crate::web::error::AppError;
use crate::web::pagination::{Page, PageQuery, PageRequest, MONTHLY_FEEDBACK_PAGE_SIZE};
use crate::web::permissions::{require, Permission};
use crate::web::session::CurrentUser;
use axum::{
    extract::{rejection::JsonRejection, OriginalUri, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

const DUPLICATE_MONTH: &str = "The fields client_rep, month must make a unique set.";

#[derive(Debug, Default, Deserialize)]
pub struct MonthlyFeedbackPayload {
    pub month: Option<String>,
    pub feedback: Option<String>,
}

impl MonthlyFeedbackPayload {
    pub fn validate(self) -> Result<(Month, String), FieldErrors> {
        let mut errors = FieldErrors::new();
        let month = match self.month.as_deref().map(str::trim) {
            None | Some("") => {
                errors.add("month", "This field may not be blank.");
                None
            }
            Some(raw) => raw
                .parse::<Month>()
                .map_err(|e| errors.add("month", e.to_string()))
                .ok(),
        };
        let feedback = required_text(&mut errors, "feedback", self.feedback.as_deref(), None);
        match month {
            Some(month) => errors.into_result((month, feedback)),
            None => Err(errors),
        }
    }
}

pub async fn list(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    OriginalUri(uri): OriginalUri,
    Query(page): Query<PageQuery>,
) -> Result<Json<Page<MonthlyFeedback>>, AppError> {
    require(&state, &user, Permission::SalesManager).await?;

    let request = PageRequest::parse(&page, MONTHLY_FEEDBACK_PAGE_SIZE)?;
    let count = db::monthly_feedback::count_for_manager(&state.pool, user.id).await?;
    let window = request.resolve(count)?;
    let rows = db::monthly_feedback::list_for_manager(&state.pool, user.id, window.limit(), window.offset()).await?;

    Ok(Json(window.into_page(&uri, count, rows)))
}

pub async fn create(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    payload: Result<Json<MonthlyFeedbackPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<MonthlyFeedback>), AppError> {
    require(&state, &user, Permission::ClientRep).await?;

    let Json(payload) = payload?;
    let (month, feedback) = payload.validate()?;

    let row = db::monthly_feedback::insert_feedback(&state.pool, user.id, month, &feedback)
        .await
        .map_err(|e| match db::unique_violation(&e) {
            Some(_) => AppError::field(NON_FIELD_ERRORS, DUPLICATE_MONTH),
            None => AppError::Internal(e),
        })?;

    Ok((StatusCode::CREATED, Json(row)))
}
