/// Family endpoints
///
/// # Endpoints
///
/// - `POST /api/families` - Create a family (caller becomes owner, family
///   becomes the session's active family)
/// - `GET /api/families` - List the caller's families with roles
/// - `GET /api/families/active` - Active family view
/// - `POST /api/families/switch` - Switch the active family
/// - `GET /api/family-members` - Members of the active family
/// - `GET /api/user/permissions` - Admin-rights probe for the dashboard

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::require_active_family,
};
use axum::{extract::State, Extension, Json};
use famtask_shared::{
    models::{
        family::{validate_family_name, CreateFamily, Family},
        membership::{FamilyMemberView, FamilyRole, Membership, UserFamilyView},
    },
    session::{AuthContext, SessionData},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Create family request
#[derive(Debug, Deserialize)]
pub struct CreateFamilyRequest {
    /// Family name (2-50 characters after trimming)
    ///
    /// The original web client posts this as `familyName`
    #[serde(alias = "familyName")]
    pub name: String,
}

/// Create family response
#[derive(Debug, Serialize)]
pub struct CreateFamilyResponse {
    /// New family ID (now the session's active family)
    pub family_id: Uuid,

    /// Family name
    pub name: String,

    /// Join code to share with prospective members
    pub join_code: String,
}

/// Switch active family request
#[derive(Debug, Deserialize)]
pub struct SwitchFamilyRequest {
    /// Family to operate against
    pub family_id: Uuid,
}

/// Active family view
#[derive(Debug, Serialize)]
pub struct ActiveFamilyResponse {
    /// Family ID
    pub family_id: Uuid,

    /// Family name
    pub name: String,

    /// The caller's role
    pub role: FamilyRole,

    /// Join code, only shown to owners/admins (they share it)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub join_code: Option<String>,
}

/// Permissions probe response
#[derive(Debug, Serialize)]
pub struct PermissionsResponse {
    /// Whether the caller may use the admin panel for the active family
    #[serde(rename = "hasAdminRights")]
    pub has_admin_rights: bool,
}

/// Simple confirmation response
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// Confirmation message
    pub message: String,
}

/// Creates a family
///
/// Validates the trimmed name, allocates a unique join code, and inserts
/// the family row together with the caller's owner membership in one
/// transaction. On success the new family becomes the session's active
/// family.
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Name out of range
/// - `500 Internal Server Error`: Join-code allocation exhausted
pub async fn create_family(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(req): Json<CreateFamilyRequest>,
) -> ApiResult<Json<CreateFamilyResponse>> {
    let name = validate_family_name(&req.name).map_err(|e| {
        ApiError::ValidationError(vec![crate::error::ValidationErrorDetail {
            field: "name".to_string(),
            message: e,
        }])
    })?;

    let family = Family::create(
        &state.db,
        CreateFamily {
            name: name.to_string(),
            owner_id: ctx.user_id,
        },
    )
    .await?;

    // The creator starts operating against the new family immediately
    state
        .sessions
        .update(
            &ctx.token,
            &SessionData {
                user_id: ctx.user_id,
                active_family_id: Some(family.id),
            },
        )
        .await?;

    Ok(Json(CreateFamilyResponse {
        family_id: family.id,
        name: family.name,
        join_code: family.join_code,
    }))
}

/// Lists the caller's families with roles
pub async fn list_my_families(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> ApiResult<Json<Vec<UserFamilyView>>> {
    let families = Membership::list_families_for_user(&state.db, ctx.user_id).await?;
    Ok(Json(families))
}

/// Returns the session's active family
///
/// The join code is included for owners/admins only, since they are the
/// ones who hand it out.
///
/// # Errors
///
/// - `400 Bad Request`: No active family selected
/// - `403 Forbidden`: Caller is not a member of the active family
/// - `404 Not Found`: Active family no longer exists
pub async fn get_active_family(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> ApiResult<Json<ActiveFamilyResponse>> {
    let family_id = require_active_family(&ctx)?;

    let family = Family::find_by_id(&state.db, family_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Family not found".to_string()))?;

    let role = Membership::get_role(&state.db, family_id, ctx.user_id)
        .await?
        .ok_or_else(|| ApiError::Forbidden("Not a member of this family".to_string()))?;

    let join_code = role.has_admin_rights().then_some(family.join_code);

    Ok(Json(ActiveFamilyResponse {
        family_id: family.id,
        name: family.name,
        role,
        join_code,
    }))
}

/// Switches the session's active family
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not a member of the target family
pub async fn switch_active_family(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(req): Json<SwitchFamilyRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let is_member = Membership::is_member(&state.db, req.family_id, ctx.user_id).await?;
    if !is_member {
        return Err(ApiError::Forbidden(
            "Not a member of this family".to_string(),
        ));
    }

    state
        .sessions
        .update(
            &ctx.token,
            &SessionData {
                user_id: ctx.user_id,
                active_family_id: Some(req.family_id),
            },
        )
        .await?;

    tracing::debug!(user_id = %ctx.user_id, family_id = %req.family_id, "Active family switched");

    Ok(Json(MessageResponse {
        message: "Active family switched".to_string(),
    }))
}

/// Lists members of the active family
///
/// Feeds the task-assignment dropdown, so it returns (id, username, role)
/// triples ordered by join date.
pub async fn list_family_members(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> ApiResult<Json<Vec<FamilyMemberView>>> {
    let family_id = require_active_family(&ctx)?;
    let members = Membership::list_members(&state.db, family_id).await?;
    Ok(Json(members))
}

/// Admin-rights probe
///
/// The dashboard calls this before a family may have been selected, so a
/// missing active family answers `false` rather than failing.
pub async fn get_permissions(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> ApiResult<Json<PermissionsResponse>> {
    let has_admin_rights = match ctx.active_family_id {
        Some(family_id) => Membership::get_role(&state.db, family_id, ctx.user_id)
            .await?
            .map(|role| role.has_admin_rights())
            .unwrap_or(false),
        None => false,
    };

    Ok(Json(PermissionsResponse { has_admin_rights }))
}
