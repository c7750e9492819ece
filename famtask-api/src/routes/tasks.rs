/// Task endpoints
///
/// # Endpoints
///
/// - `POST /api/tasks` - Create a task with its assignment (owner/admin)
/// - `GET /api/tasks` - Family board, newest first
/// - `GET /api/mytasks` - Personal worklist
/// - `GET /api/tasks/pending-approval` - Completed work awaiting review
/// - `POST /api/tasks/:assignment_id/complete` - Assignee marks done
/// - `POST /api/tasks/:assignment_id/approve` - Reviewer accepts, awards points
/// - `POST /api/tasks/:assignment_id/reject` - Reviewer sends it back
///
/// Complete, approve, and reject each run in one transaction with the
/// assignment row locked, so concurrent transitions serialize and the
/// status checks decide exactly one winner.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
    routes::require_active_family,
};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use famtask_shared::{
    models::{
        membership::Membership,
        points::PointsLedger,
        task::{
            AssignmentStatus, CreateTask, Difficulty, FamilyTaskView, MyTaskView,
            PendingApprovalView, Task, TaskAssignment, MAX_TITLE_LENGTH,
        },
        user::User,
    },
    session::AuthContext,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Create task request
#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    /// Title (non-empty, at most 28 characters after trimming)
    pub title: String,

    /// Optional description
    #[serde(default)]
    pub description: Option<String>,

    /// Difficulty; absent or unrecognized values fall back to medium
    #[serde(default)]
    pub difficulty: Option<String>,

    /// Member to assign the task to
    #[serde(default, alias = "assignedTo")]
    pub assigned_to: Option<Uuid>,

    /// Optional deadline
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
}

/// Create task response: the joined task + assignment + assignee view
#[derive(Debug, Serialize)]
pub struct CreateTaskResponse {
    /// New task ID
    pub task_id: Uuid,

    /// Its assignment ID
    pub assignment_id: Uuid,

    /// Title
    pub title: String,

    /// Difficulty actually applied
    pub difficulty: Difficulty,

    /// Fixed reward
    pub points_reward: i32,

    /// Assignment status (`pending` when assigned, else `not_assigned`)
    pub status: AssignmentStatus,

    /// Assignee's display name, if assigned
    pub assignee_username: Option<String>,

    /// Deadline, if any
    pub deadline: Option<DateTime<Utc>>,
}

/// Approve response
#[derive(Debug, Serialize)]
pub struct ApproveResponse {
    /// Confirmation message
    pub message: String,

    /// Points credited to the assignee
    pub points_awarded: i32,
}

/// Simple confirmation response
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// Confirmation message
    pub message: String,
}

/// Creates a task with its single assignment
///
/// Requires an owner/admin role in the active family. Task and assignment
/// are inserted in one transaction; the assignment starts `pending` when an
/// assignee is given.
///
/// # Errors
///
/// - `400 Bad Request`: No active family, or assignee outside the family
/// - `403 Forbidden`: Caller is a standard member
/// - `422 Unprocessable Entity`: Title empty or too long
pub async fn create_task(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<Json<CreateTaskResponse>> {
    let family_id = require_active_family(&ctx)?;

    let role = Membership::get_role(&state.db, family_id, ctx.user_id).await?;
    match role {
        Some(role) if role.can_create_tasks() => {}
        _ => {
            return Err(ApiError::Forbidden(
                "Only a family owner or admin can create tasks".to_string(),
            ))
        }
    }

    let title = req.title.trim();
    if title.is_empty() || title.len() > MAX_TITLE_LENGTH {
        return Err(ApiError::ValidationError(vec![ValidationErrorDetail {
            field: "title".to_string(),
            message: format!(
                "Title must be 1-{} characters",
                MAX_TITLE_LENGTH
            ),
        }]));
    }

    // Assignments never cross family boundaries
    if let Some(assignee) = req.assigned_to {
        if !Membership::is_member(&state.db, family_id, assignee).await? {
            return Err(ApiError::BadRequest(
                "Assignee is not a member of this family".to_string(),
            ));
        }
    }

    let difficulty = Difficulty::from_input(req.difficulty.as_deref());

    let created = Task::create_with_assignment(
        &state.db,
        CreateTask {
            family_id,
            created_by: ctx.user_id,
            title: title.to_string(),
            description: req.description.filter(|d| !d.trim().is_empty()),
            difficulty,
            assignee: req.assigned_to,
            deadline: req.deadline,
        },
    )
    .await?;

    let assignee_username = match created.assignment.user_id {
        Some(user_id) => User::find_by_id(&state.db, user_id)
            .await?
            .map(|u| u.username),
        None => None,
    };

    Ok(Json(CreateTaskResponse {
        task_id: created.task.id,
        assignment_id: created.assignment.id,
        title: created.task.title,
        difficulty: created.task.difficulty,
        points_reward: created.task.points_reward,
        status: created.assignment.status,
        assignee_username,
        deadline: created.task.deadline,
    }))
}

/// Lists every task on the active family's board, newest first
pub async fn list_family_tasks(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> ApiResult<Json<Vec<FamilyTaskView>>> {
    let family_id = require_active_family(&ctx)?;
    let tasks = Task::list_family_tasks(&state.db, family_id).await?;
    Ok(Json(tasks))
}

/// Lists the caller's open worklist in the active family
///
/// Pending and completed assignments only; deadline soonest-first, undated
/// last.
pub async fn list_my_tasks(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> ApiResult<Json<Vec<MyTaskView>>> {
    let family_id = require_active_family(&ctx)?;
    let tasks = Task::list_my_tasks(&state.db, ctx.user_id, family_id).await?;
    Ok(Json(tasks))
}

/// Lists completed assignments awaiting review, oldest first
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not an owner/admin of the active family
pub async fn list_pending_approval(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> ApiResult<Json<Vec<PendingApprovalView>>> {
    let family_id = require_active_family(&ctx)?;

    let role = Membership::get_role(&state.db, family_id, ctx.user_id).await?;
    match role {
        Some(role) if role.can_review_assignments() => {}
        _ => {
            return Err(ApiError::Forbidden(
                "Only a family owner or admin can review completions".to_string(),
            ))
        }
    }

    let tasks = Task::list_pending_approval(&state.db, family_id).await?;
    Ok(Json(tasks))
}

/// Marks an assignment complete
///
/// Only the assigned member may complete, and only from `pending`.
///
/// # Errors
///
/// - `404 Not Found`: No such assignment
/// - `403 Forbidden`: Assignment belongs to someone else
/// - `409 Conflict`: Assignment is not pending (the current status is named)
pub async fn complete_assignment(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(assignment_id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    let mut tx = state.db.begin().await?;

    let assignment = TaskAssignment::find_by_id_for_update(&mut *tx, assignment_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Assignment not found".to_string()))?;

    if assignment.user_id != Some(ctx.user_id) {
        return Err(ApiError::Forbidden(
            "This task is not assigned to you".to_string(),
        ));
    }

    if assignment.status != AssignmentStatus::Pending {
        return Err(ApiError::Conflict(format!(
            "Assignment is {}, only pending tasks can be completed",
            assignment.status.as_str()
        )));
    }

    TaskAssignment::set_status(&mut *tx, assignment.id, AssignmentStatus::Completed).await?;

    tx.commit().await?;

    tracing::info!(
        assignment_id = %assignment_id,
        user_id = %ctx.user_id,
        "Assignment completed, awaiting approval"
    );

    Ok(Json(MessageResponse {
        message: "Task marked as complete, awaiting approval".to_string(),
    }))
}

/// Approves a completed assignment and credits its points
///
/// Single transaction: the assignment, its family, and the reviewer's role
/// resolve in one locked query; the status flips to `approved` and the
/// assignee's ledger is upserted with the task's fixed reward. The status
/// check makes double-approval impossible: a second attempt finds
/// `approved` and conflicts.
///
/// # Errors
///
/// - `404 Not Found`: No such assignment, or the reviewer has no role in
///   the assignment's family
/// - `403 Forbidden`: Reviewer is a standard member
/// - `409 Conflict`: Assignment is not completed
pub async fn approve_assignment(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(assignment_id): Path<Uuid>,
) -> ApiResult<Json<ApproveResponse>> {
    let mut tx = state.db.begin().await?;

    let target = TaskAssignment::find_for_review(&mut *tx, assignment_id, ctx.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Assignment not found".to_string()))?;

    let role = target
        .reviewer_role
        .ok_or_else(|| ApiError::NotFound("Assignment not found".to_string()))?;

    if !role.can_review_assignments() {
        return Err(ApiError::Forbidden(
            "Only a family owner or admin can approve tasks".to_string(),
        ));
    }

    if target.status != AssignmentStatus::Completed {
        return Err(ApiError::Conflict(format!(
            "Assignment is {}, only completed tasks can be approved",
            target.status.as_str()
        )));
    }

    // A completed assignment always has an assignee; anything else is a
    // broken invariant, not a caller error
    let assignee_id = target.assignee_id.ok_or_else(|| {
        ApiError::InternalError("Completed assignment has no assignee".to_string())
    })?;

    TaskAssignment::set_status(&mut *tx, target.assignment_id, AssignmentStatus::Approved).await?;

    let ledger =
        PointsLedger::add(&mut *tx, assignee_id, target.family_id, target.points_reward).await?;

    tx.commit().await?;

    tracing::info!(
        assignment_id = %assignment_id,
        assignee_id = %assignee_id,
        points = target.points_reward,
        total = ledger.points,
        "Assignment approved, points awarded"
    );

    Ok(Json(ApproveResponse {
        message: "Task approved".to_string(),
        points_awarded: target.points_reward,
    }))
}

/// Rejects a completed assignment, returning it to the worklist
///
/// Same authorization resolution as approval; the status cycles back to
/// `pending` so the assignee can redo the work. Rejection is corrective,
/// not destructive; no points move.
///
/// # Errors
///
/// Same statuses as [`approve_assignment`]
pub async fn reject_assignment(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(assignment_id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    let mut tx = state.db.begin().await?;

    let target = TaskAssignment::find_for_review(&mut *tx, assignment_id, ctx.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Assignment not found".to_string()))?;

    let role = target
        .reviewer_role
        .ok_or_else(|| ApiError::NotFound("Assignment not found".to_string()))?;

    if !role.can_review_assignments() {
        return Err(ApiError::Forbidden(
            "Only a family owner or admin can reject tasks".to_string(),
        ));
    }

    if target.status != AssignmentStatus::Completed {
        return Err(ApiError::Conflict(format!(
            "Assignment is {}, only completed tasks can be rejected",
            target.status.as_str()
        )));
    }

    TaskAssignment::set_status(&mut *tx, target.assignment_id, AssignmentStatus::Pending).await?;

    tx.commit().await?;

    tracing::info!(
        assignment_id = %assignment_id,
        reviewer_id = %ctx.user_id,
        "Assignment rejected, returned to worklist"
    );

    Ok(Json(MessageResponse {
        message: "Task rejected and returned to the worklist".to_string(),
    }))
}
