use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use b2b_feedback::db::{self, DbUser};
use b2b_feedback::domain::models::Role;
use b2b_feedback::services::mail::{EmailMessage, MailError, Mailer, MemoryMailer};
use b2b_feedback::state::{AppState, SharedState};
use b2b_feedback::web::{self, session};
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

pub const SESSION_KEY: &[u8] = b"integration-tests-session-key-0123456789";

pub struct TestContext {
    pub pool: PgPool,
    pub state: SharedState,
    pub mailer: MemoryMailer,
}

impl TestContext {
    /// Connects to `TEST_DATABASE_URL` and migrates it; `None` when unset so
    /// the database tests are skipped on machines without Postgres.
    pub async fn new() -> Option<TestContext> {
        let mailer = MemoryMailer::new();
        Self::with_mailer(mailer.clone(), Arc::new(mailer)).await
    }

    /// Same as [`TestContext::new`] but the app delivers through `transport`.
    pub async fn with_transport(transport: Arc<dyn Mailer>) -> Option<TestContext> {
        Self::with_mailer(MemoryMailer::new(), transport).await
    }

    async fn with_mailer(mailer: MemoryMailer, transport: Arc<dyn Mailer>) -> Option<TestContext> {
        let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
            eprintln!("TEST_DATABASE_URL not set, skipping database test");
            return None;
        };

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await
            .expect("Failed to connect to test database");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");
        db::seed::seed_all(&pool, None).await.expect("Failed to seed groups");

        let state = Arc::new(AppState::new(pool.clone(), SESSION_KEY.to_vec(), transport));
        Some(TestContext { pool, state, mailer })
    }

    pub fn app(&self) -> Router {
        web::routes(self.state.clone())
    }

    /// Creates a user with a unique email in the given roles.
    pub async fn user(&self, roles: &[Role], is_superuser: bool) -> TestUser {
        let email = format!("user-{}@example.com", Uuid::new_v4().simple());
        let hash = b2b_feedback::services::password::hash_password("correct horse battery").unwrap();
        let user = db::insert_user(&self.pool, &email, "Test User", &hash, is_superuser)
            .await
            .expect("Failed to insert user");
        for role in roles {
            db::add_user_to_role(&self.pool, user.id, *role).await.unwrap();
        }
        let token = session::sign_session(user.id, SESSION_KEY).unwrap();
        TestUser { user, token }
    }

    pub async fn request(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self.app().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }
}

/// Mail transport that is always down.
#[derive(Default)]
pub struct FailingMailer {
    pub calls: AtomicUsize,
}

#[async_trait::async_trait]
impl Mailer for FailingMailer {
    async fn send(&self, _message: &EmailMessage) -> Result<(), MailError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(MailError::Rejected {
            status: 503,
            body: "service unavailable".to_string(),
        })
    }
}

pub struct TestUser {
    pub user: DbUser,
    pub token: String,
}

impl TestUser {
    pub fn id(&self) -> Uuid {
        self.user.id
    }
}

pub mod test_data {
    use serde_json::{json, Value};
    use uuid::Uuid;

    /// One question of every type; choice-bearing questions get three choices.
    pub fn questionnaire(client_rep: Uuid, title: &str, due_in_days: i64) -> Value {
        let due_at = chrono::Utc::now() + chrono::Duration::days(due_in_days);
        json!({
            "client_rep": client_rep,
            "title": title,
            "description": "Quarterly satisfaction survey",
            "due_at": due_at,
            "questions": [
                { "question_type": "OPEN", "question_text": "What went well?", "required": true, "order": 0 },
                { "question_type": "LOGICAL", "question_text": "Would you renew?", "required": true, "order": 1,
                  "choices": [ { "value": "Yes", "order": 0 }, { "value": "No", "order": 1 } ] },
                { "question_type": "MULTIPLE_CHOICE", "question_text": "Which products do you use?", "required": false, "order": 2,
                  "choices": [ { "value": "Alpha", "order": 0 }, { "value": "Beta", "order": 1 }, { "value": "Gamma", "order": 2 } ] },
                { "question_type": "DROPDOWN", "question_text": "Overall rating", "required": true, "order": 3,
                  "choices": [ { "value": "Good", "order": 0 }, { "value": "Fair", "order": 1 }, { "value": "Poor", "order": 2 } ] }
            ]
        })
    }

    pub fn client(client_rep: Option<Uuid>) -> Value {
        json!({
            "email": format!("client-{}@example.com", Uuid::new_v4().simple()),
            "name": "Acme Corp",
            "client_rep": client_rep,
        })
    }
}
