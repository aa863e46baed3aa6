pub mod account;
pub mod clients;
pub mod error;
pub mod monthly_feedback;
pub mod pagination;
pub mod permissions;
pub mod questionnaires;
pub mod responses;
pub mod session;

use crate::state::SharedState;
use axum::{
    routing::{delete, get, MethodRouter},
    Router,
};

async fn health() -> &'static str {
    "OK"
}

/// Registers `path` both with and without a trailing slash.
pub(crate) fn route_both<S>(router: Router<S>, path: &str, method_router: MethodRouter<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router
        .route(path, method_router.clone())
        .route(&format!("{path}/"), method_router)
}

fn feedback_router(state: SharedState) -> Router {
    let router = Router::new();
    let router = route_both(router, "/clients", get(clients::list).post(clients::create));
    let router = route_both(router, "/clients/:id", delete(clients::delete));
    let router = route_both(
        router,
        "/questionnaires",
        get(questionnaires::list).post(questionnaires::create),
    );
    let router = route_both(router, "/questionnaires/:id", get(questionnaires::retrieve));
    let router = route_both(
        router,
        "/questionnaires/:id/responses",
        get(responses::list).post(responses::create),
    );
    let router = route_both(
        router,
        "/monthly-feedback",
        get(monthly_feedback::list).post(monthly_feedback::create),
    );
    router.with_state(state)
}

pub fn routes(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/account", account::router(state.clone()))
        .nest("/feedback", feedback_router(state))
}
