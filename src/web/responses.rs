use crate::db;
use crate::domain::models::ResponseDetail;
use crate::domain::response::ResponsePayload;
use crate::services::outbox::dispatch_one;
use crate::state::SharedState;
use crate::web::error::AppError;
use crate::web::pagination::{Page, PageQuery, PageRequest, RESPONSES_PAGE_SIZE};
use crate::web::permissions::{require, Permission, Roles};
use crate::web::questionnaires::{scope_for, ViewFlags};
use crate::web::session::CurrentUser;
use axum::{
    extract::{rejection::JsonRejection, OriginalUri, Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

pub async fn list(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    OriginalUri(uri): OriginalUri,
    Path(questionnaire_id): Path<Uuid>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Page<ResponseDetail>>, AppError> {
    require(&state, &user, Permission::SalesManager).await?;

    // Only the manager's side of the questionnaire scope applies here.
    let manager_view = Roles { sales_manager: true, client_rep: false };
    let scope = scope_for(&user, manager_view, &ViewFlags::default());
    db::questionnaires::find_visible_summary(&state.pool, questionnaire_id, scope)
        .await?
        .ok_or(AppError::NotFound)?;

    let request = PageRequest::parse(&page, RESPONSES_PAGE_SIZE)?;
    let count = db::responses::count_responses(&state.pool, questionnaire_id).await?;
    let window = request.resolve(count)?;
    let results =
        db::responses::list_responses(&state.pool, questionnaire_id, window.limit(), window.offset()).await?;

    Ok(Json(window.into_page(&uri, count, results)))
}

pub async fn create(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(questionnaire_id): Path<Uuid>,
    payload: Result<Json<ResponsePayload>, JsonRejection>,
) -> Result<(StatusCode, Json<ResponseDetail>), AppError> {
    require(&state, &user, Permission::ClientRep).await?;

    let Json(payload) = payload?;
    let new = payload.validate()?;

    let stored = db::responses::create_response(&state.pool, questionnaire_id, &user, &new).await?;
    let response_id = stored.id;

    // Only this request's alert; the backlog is left to the scheduled dispatcher.
    if let Some(alert) = stored.alert {
        match dispatch_one(&state.pool, state.mailer.as_ref(), alert).await {
            Ok(report) if report.failed > 0 => {
                tracing::warn!("Response alert {} for response {} will be retried", alert, response_id)
            }
            Ok(_) => {}
            Err(e) => tracing::error!("Dispatching alert for response {} failed: {:#}", response_id, e),
        }
    }

    let detail = db::responses::find_detail(&state.pool, response_id)
        .await?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("response {response_id} vanished after insert")))?;

    Ok((StatusCode::CREATED, Json(detail)))
}
