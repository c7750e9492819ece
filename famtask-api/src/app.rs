/// Application state and router builder
///
/// This module defines the shared application state, the Axum router with
/// all routes and middleware, and the session-cookie plumbing.
///
/// # Example
///
/// ```no_run
/// use famtask_api::{app::AppState, config::Config};
/// use famtask_shared::session::SessionStore;
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let sessions = SessionStore::connect(&config.redis.url).await?;
/// let state = AppState::new(pool, sessions, config);
/// let app = famtask_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError};
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, post},
    Router,
};
use famtask_shared::session::{AuthContext, SessionStore};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Session store
    pub sessions: SessionStore,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: PgPool, sessions: SessionStore, config: Config) -> Self {
        Self {
            db,
            sessions,
            config: Arc::new(config),
        }
    }

    /// Session cookie name from configuration
    pub fn cookie_name(&self) -> &str {
        &self.config.session.cookie_name
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                            # Health check (public)
/// └── /api/
///     ├── /auth/
///     │   ├── POST /register             # (public)
///     │   ├── POST /login                # (public)
///     │   └── POST /logout
///     ├── /families/
///     │   ├── POST /                     # Create family (becomes active)
///     │   ├── GET  /                     # Caller's families
///     │   ├── GET  /active               # Active family view
///     │   └── POST /switch               # Switch active family
///     ├── GET  /family-members
///     ├── GET  /user/permissions
///     ├── /join-requests/
///     │   ├── POST /                     # Redeem a join code
///     │   ├── GET  /                     # Pending, for approvers
///     │   └── POST /:id/respond
///     └── /tasks/
///         ├── POST /                     # Create task + assignment
///         ├── GET  /                     # Family board
///         ├── GET  /../mytasks           # Personal worklist
///         ├── GET  /pending-approval
///         ├── POST /:id/complete
///         ├── POST /:id/approve
///         └── POST /:id/reject
/// ```
///
/// Everything under `/api` except the auth endpoints sits behind the
/// session middleware.
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Auth routes (public, no auth required)
    let public_auth_routes = Router::new()
        .route("/auth/register", post(routes::auth::register))
        .route("/auth/login", post(routes::auth::login));

    // Everything else requires a session
    let session_routes = Router::new()
        .route("/auth/logout", post(routes::auth::logout))
        .route("/families", post(routes::families::create_family))
        .route("/families", get(routes::families::list_my_families))
        .route("/families/active", get(routes::families::get_active_family))
        .route("/families/switch", post(routes::families::switch_active_family))
        .route("/family-members", get(routes::families::list_family_members))
        .route("/user/permissions", get(routes::families::get_permissions))
        .route("/join-requests", post(routes::join_requests::submit_join_request))
        .route("/join-requests", get(routes::join_requests::list_pending))
        .route(
            "/join-requests/:request_id/respond",
            post(routes::join_requests::respond_to_request),
        )
        .route("/tasks", post(routes::tasks::create_task))
        .route("/tasks", get(routes::tasks::list_family_tasks))
        .route("/mytasks", get(routes::tasks::list_my_tasks))
        .route("/tasks/pending-approval", get(routes::tasks::list_pending_approval))
        .route(
            "/tasks/:assignment_id/complete",
            post(routes::tasks::complete_assignment),
        )
        .route(
            "/tasks/:assignment_id/approve",
            post(routes::tasks::approve_assignment),
        )
        .route(
            "/tasks/:assignment_id/reject",
            post(routes::tasks::reject_assignment),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            session_auth_layer,
        ));

    let api_routes = Router::new().merge(public_auth_routes).merge(session_routes);

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.contains(&"*".to_string()) {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/api", api_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}

/// Session authentication middleware layer
///
/// Reads the session token from the request cookie, resolves it against the
/// session store (which refreshes the sliding TTL), and injects
/// `AuthContext` into request extensions.
async fn session_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_session_token(req.headers(), state.cookie_name())
        .ok_or_else(|| ApiError::Unauthorized("Not signed in".to_string()))?;

    let session = state
        .sessions
        .fetch(&token)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Session expired, sign in again".to_string()))?;

    req.extensions_mut()
        .insert(AuthContext::from_session(token, &session));

    Ok(next.run(req).await)
}

/// Pulls the session token out of the Cookie header, if present
pub fn extract_session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;

    for cookie in cookie_header.split(';') {
        if let Some((name, value)) = cookie.trim().split_once('=') {
            if name == cookie_name {
                return Some(value.to_string());
            }
        }
    }

    None
}

/// Builds the Set-Cookie value carrying a session token
pub fn build_session_cookie(cookie_name: &str, token: &str, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        cookie_name,
        token,
        famtask_shared::session::SESSION_TTL_SECONDS
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Builds the Set-Cookie value that clears the session cookie (logout)
pub fn build_clear_cookie(cookie_name: &str) -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", cookie_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_session_token() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("other=1; famtask_session=abc123; theme=dark"),
        );

        let token = extract_session_token(&headers, "famtask_session");
        assert_eq!(token.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_extract_session_token_missing() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("other=1"));

        assert!(extract_session_token(&headers, "famtask_session").is_none());
        assert!(extract_session_token(&HeaderMap::new(), "famtask_session").is_none());
    }

    #[test]
    fn test_build_session_cookie() {
        let cookie = build_session_cookie("famtask_session", "tok", false);
        assert!(cookie.starts_with("famtask_session=tok;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=86400"));
        assert!(!cookie.contains("Secure"));

        let secure = build_session_cookie("famtask_session", "tok", true);
        assert!(secure.ends_with("; Secure"));
    }

    #[test]
    fn test_build_clear_cookie() {
        let cookie = build_clear_cookie("famtask_session");
        assert!(cookie.contains("Max-Age=0"));
        assert!(cookie.starts_with("famtask_session=;"));
    }
}
