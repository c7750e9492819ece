/// Join-request endpoints
///
/// # Endpoints
///
/// - `POST /api/join-requests` - Redeem a join code into a pending request
/// - `GET /api/join-requests` - Pending requests visible to the approver
/// - `POST /api/join-requests/:request_id/respond` - Accept or reject
///
/// Responding is idempotency-guarded: a request already resolved answers
/// `409 Conflict`, it is never silently re-applied.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use famtask_shared::{
    models::{
        family::Family,
        join_request::{JoinRequest, JoinRequestStatus},
        membership::{CreateMembership, FamilyRole, Membership},
    },
    session::AuthContext,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Submit join request body
#[derive(Debug, Deserialize)]
pub struct SubmitJoinRequest {
    /// Join code to redeem
    ///
    /// The original web client posts this as `joinCode`
    #[serde(alias = "joinCode")]
    pub join_code: String,
}

/// Submit join request response
#[derive(Debug, Serialize)]
pub struct SubmitJoinResponse {
    /// Confirmation message
    pub message: String,

    /// New request ID
    pub request_id: Uuid,

    /// When the request expires if left unresolved
    pub expires_at: DateTime<Utc>,
}

/// A pending request as the admin panel consumes it
#[derive(Debug, Serialize)]
pub struct PendingRequestResponse {
    /// Request ID
    #[serde(rename = "requestId")]
    pub request_id: Uuid,

    /// Target family
    pub family_id: Uuid,

    /// Target family name
    pub family_name: String,

    /// Requester's display name
    #[serde(rename = "requesterUsername")]
    pub requester_username: String,

    /// Requester's email
    #[serde(rename = "requesterEmail")]
    pub requester_email: String,

    /// When the request was submitted
    pub requested_at: DateTime<Utc>,

    /// When the request expires
    pub expires_at: DateTime<Utc>,
}

/// Respond request body
#[derive(Debug, Deserialize)]
pub struct RespondRequest {
    /// "accept" or "reject"
    pub action: String,
}

/// Simple confirmation response
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// Confirmation message
    pub message: String,
}

/// Submits a join request by redeeming a join code
///
/// # Errors
///
/// - `400 Bad Request`: Missing join code
/// - `404 Not Found`: No family has that code
/// - `409 Conflict`: Already a member, or a pending request already exists
pub async fn submit_join_request(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(req): Json<SubmitJoinRequest>,
) -> ApiResult<Json<SubmitJoinResponse>> {
    if req.join_code.trim().is_empty() {
        return Err(ApiError::BadRequest("Join code is required".to_string()));
    }

    let family = Family::find_by_join_code(&state.db, &req.join_code)
        .await?
        .ok_or_else(|| ApiError::NotFound("No family with that join code".to_string()))?;

    if Membership::is_member(&state.db, family.id, ctx.user_id).await? {
        return Err(ApiError::Conflict(
            "You are already a member of this family".to_string(),
        ));
    }

    if JoinRequest::pending_exists(&state.db, family.id, ctx.user_id).await? {
        return Err(ApiError::Conflict(
            "A join request for this family is already pending".to_string(),
        ));
    }

    let request = JoinRequest::create(&state.db, family.id, ctx.user_id).await?;

    tracing::info!(
        request_id = %request.id,
        family_id = %family.id,
        user_id = %ctx.user_id,
        "Join request submitted"
    );

    Ok(Json(SubmitJoinResponse {
        message: format!("Join request sent to {}", family.name),
        request_id: request.id,
        expires_at: request.expires_at,
    }))
}

/// Lists pending requests for families the caller administers, newest first
pub async fn list_pending(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> ApiResult<Json<Vec<PendingRequestResponse>>> {
    let requests = JoinRequest::list_pending_for_approver(&state.db, ctx.user_id).await?;

    let response = requests
        .into_iter()
        .map(|r| PendingRequestResponse {
            request_id: r.id,
            family_id: r.family_id,
            family_name: r.family_name,
            requester_username: r.requester_username,
            requester_email: r.requester_email,
            requested_at: r.requested_at,
            expires_at: r.expires_at,
        })
        .collect();

    Ok(Json(response))
}

/// Accepts or rejects a pending join request
///
/// Runs as a single transaction: the request is loaded together with the
/// responder's role in its family and locked, the checks run in order
/// (exists → still pending → responder may decide), then the decision and
/// its side effect commit atomically. On accept, a requester who raced
/// into membership some other way keeps their existing membership and the
/// request is still marked approved.
///
/// # Errors
///
/// - `400 Bad Request`: Action is neither "accept" nor "reject"
/// - `404 Not Found`: No such request
/// - `409 Conflict`: Request already resolved
/// - `403 Forbidden`: Responder is not an owner/admin of the family
pub async fn respond_to_request(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(request_id): Path<Uuid>,
    Json(req): Json<RespondRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let accept = match req.action.as_str() {
        "accept" => true,
        "reject" => false,
        other => {
            return Err(ApiError::BadRequest(format!(
                "Unknown action '{}', expected accept or reject",
                other
            )))
        }
    };

    let mut tx = state.db.begin().await?;

    let target = JoinRequest::find_for_respond(&mut *tx, request_id, ctx.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Join request not found".to_string()))?;

    if target.status != JoinRequestStatus::Pending {
        return Err(ApiError::Conflict(format!(
            "Request was already {}",
            target.status.as_str()
        )));
    }

    match target.approver_role {
        Some(role) if role.can_approve_requests() => {}
        _ => {
            return Err(ApiError::Forbidden(
                "Only a family owner or admin can respond to join requests".to_string(),
            ))
        }
    }

    let message = if accept {
        // Tolerate the race where the requester became a member through
        // another pending request; membership stays untouched either way
        let already_member =
            Membership::is_member(&mut *tx, target.family_id, target.user_id).await?;

        if !already_member {
            Membership::create(
                &mut *tx,
                CreateMembership {
                    family_id: target.family_id,
                    user_id: target.user_id,
                    role: FamilyRole::Standard,
                },
            )
            .await?;
        }

        JoinRequest::set_status(&mut *tx, target.id, JoinRequestStatus::Approved).await?;
        "Join request accepted"
    } else {
        JoinRequest::set_status(&mut *tx, target.id, JoinRequestStatus::Rejected).await?;
        "Join request rejected"
    };

    tx.commit().await?;

    tracing::info!(
        request_id = %request_id,
        approver_id = %ctx.user_id,
        accepted = accept,
        "Join request resolved"
    );

    Ok(Json(MessageResponse {
        message: message.to_string(),
    }))
}
