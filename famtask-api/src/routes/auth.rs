/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /api/auth/register` - Create an account
/// - `POST /api/auth/login` - Sign in; sets the session cookie
/// - `POST /api/auth/logout` - Sign out; clears the session cookie
///
/// Registration does not sign the user in; the client redirects to the
/// login form afterwards.

use crate::{
    app::{build_clear_cookie, build_session_cookie, AppState},
    error::{map_validation_errors, ApiError, ApiResult, ValidationErrorDetail},
};
use axum::{
    extract::State,
    http::header,
    response::{AppendHeaders, IntoResponse},
    Extension, Json,
};
use famtask_shared::{
    auth::password,
    models::{
        membership::{Membership, UserFamilyView},
        user::{CreateUser, User},
    },
    session::{AuthContext, SessionData},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Display name shown to family members
    #[validate(length(min = 2, max = 32, message = "Username must be 2-32 characters"))]
    pub username: String,

    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

/// Register response
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    /// New user ID
    pub user_id: Uuid,

    /// Confirmation message
    pub message: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    pub password: String,
}

/// Login response
///
/// Lists the caller's families so the client can pick one to switch into;
/// the fresh session starts with no active family.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// User ID
    pub user_id: Uuid,

    /// Display name
    pub username: String,

    /// Families the user belongs to, with roles
    pub families: Vec<UserFamilyView>,
}

/// Simple confirmation response
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// Confirmation message
    pub message: String,
}

/// Register a new user
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Validation failed
/// - `409 Conflict`: Email already exists
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<Json<RegisterResponse>> {
    req.validate().map_err(map_validation_errors)?;

    password::validate_password_strength(&req.password).map_err(|e| {
        ApiError::ValidationError(vec![ValidationErrorDetail {
            field: "password".to_string(),
            message: e,
        }])
    })?;

    let password_hash = password::hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            username: req.username.trim().to_string(),
            email: req.email.clone(),
            password_hash,
        },
    )
    .await?;

    tracing::info!(user_id = %user.id, "User registered");

    Ok(Json(RegisterResponse {
        user_id: user.id,
        message: "Registration successful".to_string(),
    }))
}

/// Login endpoint
///
/// Verifies credentials, creates a server-side session, and sets the
/// session cookie. The session starts with no active family; the response
/// lists the caller's families so the client switches explicitly.
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid credentials
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate().map_err(map_validation_errors)?;

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid email or password".to_string()))?;

    let valid = password::verify_password(&req.password, &user.password_hash)?;
    if !valid {
        return Err(ApiError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
    }

    let families = Membership::list_families_for_user(&state.db, user.id).await?;

    let token = state
        .sessions
        .create(&SessionData {
            user_id: user.id,
            active_family_id: None,
        })
        .await?;

    let cookie = build_session_cookie(
        state.cookie_name(),
        &token,
        state.config.session.cookie_secure,
    );

    tracing::info!(user_id = %user.id, "User logged in");

    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json(LoginResponse {
            user_id: user.id,
            username: user.username,
            families,
        }),
    ))
}

/// Logout endpoint
///
/// Deletes the server-side session and expires the cookie.
pub async fn logout(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<impl IntoResponse, ApiError> {
    state.sessions.delete(&ctx.token).await?;

    let cookie = build_clear_cookie(state.cookie_name());

    tracing::info!(user_id = %ctx.user_id, "User logged out");

    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json(MessageResponse {
            message: "Logged out".to_string(),
        }),
    ))
}
