use crate::db::{self, questionnaires::QuestionnaireScope, DbUser};
use crate::domain::models::{QuestionnaireDetail, QuestionnaireSummary};
use crate::domain::questionnaire::QuestionnairePayload;
use crate::state::SharedState;
use crate::web::error::AppError;
use crate::web::pagination::{Page, PageQuery, PageRequest, QUESTIONNAIRES_PAGE_SIZE};
use crate::web::permissions::{require, Permission, Roles};
use crate::web::session::CurrentUser;
use axum::{
    extract::{rejection::JsonRejection, OriginalUri, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

/// `?client_rep=1` / `?sales_manager=1` narrow a dual-role caller to one view.
#[derive(Debug, Default, Deserialize)]
pub struct ViewFlags {
    pub client_rep: Option<String>,
    pub sales_manager: Option<String>,
}

fn flag_set(raw: Option<&str>) -> bool {
    matches!(raw.map(str::trim), Some("1" | "true" | "True" | "yes"))
}

pub fn scope_for(user: &DbUser, roles: Roles, flags: &ViewFlags) -> QuestionnaireScope {
    let want_rep = flag_set(flags.client_rep.as_deref());
    let want_manager = flag_set(flags.sales_manager.as_deref());
    let narrowed = want_rep || want_manager;

    let as_rep = roles.client_rep && (!narrowed || want_rep);
    let as_manager = roles.sales_manager && (!narrowed || want_manager);

    QuestionnaireScope {
        everything: user.is_superuser && !narrowed,
        client_rep: as_rep.then_some(user.id),
        sales_manager: as_manager.then_some(user.id),
    }
}

pub async fn list(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    OriginalUri(uri): OriginalUri,
    Query(page): Query<PageQuery>,
    Query(flags): Query<ViewFlags>,
) -> Result<Json<Page<QuestionnaireSummary>>, AppError> {
    let roles = require(&state, &user, Permission::Either).await?;
    let scope = scope_for(&user, roles, &flags);

    let request = PageRequest::parse(&page, QUESTIONNAIRES_PAGE_SIZE)?;
    let count = db::questionnaires::count_visible(&state.pool, scope).await?;
    let window = request.resolve(count)?;
    let rows = db::questionnaires::list_visible(&state.pool, scope, window.limit(), window.offset()).await?;

    Ok(Json(window.into_page(&uri, count, rows)))
}

pub async fn create(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    payload: Result<Json<QuestionnairePayload>, JsonRejection>,
) -> Result<(StatusCode, Json<QuestionnaireDetail>), AppError> {
    require(&state, &user, Permission::SalesManager).await?;

    let Json(payload) = payload?;
    let new = payload.validate()?;

    if !db::user_exists(&state.pool, new.client_rep).await? {
        return Err(AppError::field(
            "client_rep",
            format!("Invalid pk \"{}\" - object does not exist.", new.client_rep),
        ));
    }

    let id = db::questionnaires::create_questionnaire(&state.pool, user.id, &new).await?;
    let summary = db::questionnaires::find_summary(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("questionnaire {id} vanished after insert")))?;
    let detail = db::questionnaires::load_detail(&state.pool, summary).await?;

    Ok((StatusCode::CREATED, Json(detail)))
}

pub async fn retrieve(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<QuestionnaireDetail>, AppError> {
    let roles = require(&state, &user, Permission::Either).await?;
    let scope = scope_for(&user, roles, &ViewFlags::default());

    let summary = db::questionnaires::find_visible_summary(&state.pool, id, scope)
        .await?
        .ok_or(AppError::NotFound)?;
    let detail = db::questionnaires::load_detail(&state.pool, summary).await?;

    Ok(Json(detail))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(is_superuser: bool) -> DbUser {
        DbUser {
            id: Uuid::new_v4(),
            email: "someone@example.com".into(),
            name: "Someone".into(),
            hash: String::new(),
            is_active: true,
            is_superuser,
            created_at: Utc::now(),
        }
    }

    const BOTH: Roles = Roles { sales_manager: true, client_rep: true };

    #[test]
    fn test_dual_role_sees_both_views() {
        let u = user(false);
        let scope = scope_for(&u, BOTH, &ViewFlags::default());
        assert_eq!(scope.client_rep, Some(u.id));
        assert_eq!(scope.sales_manager, Some(u.id));
        assert!(!scope.everything);
    }

    #[test]
    fn test_flags_narrow_view() {
        let u = user(false);
        let flags = ViewFlags { client_rep: Some("1".into()), sales_manager: None };
        let scope = scope_for(&u, BOTH, &flags);
        assert_eq!(scope.client_rep, Some(u.id));
        assert_eq!(scope.sales_manager, None);

        let flags = ViewFlags { client_rep: None, sales_manager: Some("true".into()) };
        let scope = scope_for(&u, BOTH, &flags);
        assert_eq!(scope.client_rep, None);
        assert_eq!(scope.sales_manager, Some(u.id));
    }

    #[test]
    fn test_flag_for_missing_role_matches_nothing() {
        let u = user(false);
        let rep_only = Roles { sales_manager: false, client_rep: true };
        let flags = ViewFlags { client_rep: None, sales_manager: Some("1".into()) };
        assert_eq!(scope_for(&u, rep_only, &flags), QuestionnaireScope::default());
    }

    #[test]
    fn test_superuser_sees_everything_unless_narrowed() {
        let u = user(true);
        let manager = Roles { sales_manager: true, client_rep: false };
        assert!(scope_for(&u, manager, &ViewFlags::default()).everything);

        let flags = ViewFlags { client_rep: None, sales_manager: Some("1".into()) };
        assert!(!scope_for(&u, manager, &flags).everything);
    }
}
