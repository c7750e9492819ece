/// Common test utilities for integration tests
///
/// Provides shared infrastructure:
/// - Test database + Redis setup
/// - Test user creation
/// - Session/cookie helpers
/// - Request/response helpers

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use famtask_api::app::{build_router, AppState};
use famtask_api::config::Config;
use famtask_shared::models::user::{CreateUser, User};
use famtask_shared::session::{SessionData, SessionStore};
use sqlx::PgPool;
use tower::Service as _;
use uuid::Uuid;

/// Test context containing all necessary resources
pub struct TestContext {
    pub db: PgPool,
    pub sessions: SessionStore,
    pub app: axum::Router,
    pub config: Config,
}

impl TestContext {
    /// Creates a new test context against the configured database and Redis
    pub async fn new() -> anyhow::Result<Self> {
        let config = Config::from_env()?;

        let db = PgPool::connect(&config.database.url).await?;

        // Migrations path is relative to this crate's Cargo.toml
        sqlx::migrate!("../migrations").run(&db).await?;

        let sessions = SessionStore::connect(&config.redis.url).await?;

        let state = AppState::new(db.clone(), sessions.clone(), config.clone());
        let app = build_router(state);

        Ok(TestContext {
            db,
            sessions,
            app,
            config,
        })
    }

    /// Creates a test user with a unique email
    ///
    /// The password hash is a placeholder; tests that exercise login go
    /// through the register endpoint instead.
    pub async fn create_user(&self, username: &str) -> anyhow::Result<User> {
        let user = User::create(
            &self.db,
            CreateUser {
                username: username.to_string(),
                email: format!("{}-{}@example.com", username, Uuid::new_v4()),
                password_hash: "test_hash".to_string(),
            },
        )
        .await?;

        Ok(user)
    }

    /// Opens a session for a user, optionally with an active family
    pub async fn open_session(
        &self,
        user_id: Uuid,
        active_family_id: Option<Uuid>,
    ) -> anyhow::Result<String> {
        let token = self
            .sessions
            .create(&SessionData {
                user_id,
                active_family_id,
            })
            .await?;

        Ok(token)
    }

    /// Builds the Cookie header value for a session token
    pub fn cookie(&self, token: &str) -> String {
        format!("{}={}", self.config.session.cookie_name, token)
    }
}

/// Sends a JSON request and returns (status, parsed body)
pub async fn send_json(
    ctx: &TestContext,
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }

    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = ctx.app.clone().call(request).await.unwrap();
    let status = response.status();

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };

    (status, json)
}

/// Shorthand for an authenticated POST
pub async fn post(
    ctx: &TestContext,
    uri: &str,
    cookie: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    send_json(ctx, "POST", uri, Some(cookie), Some(body)).await
}

/// Shorthand for an authenticated POST without a body
pub async fn post_empty(
    ctx: &TestContext,
    uri: &str,
    cookie: &str,
) -> (StatusCode, serde_json::Value) {
    send_json(ctx, "POST", uri, Some(cookie), None).await
}

/// Shorthand for an authenticated GET
pub async fn get(ctx: &TestContext, uri: &str, cookie: &str) -> (StatusCode, serde_json::Value) {
    send_json(ctx, "GET", uri, Some(cookie), None).await
}
