/// Join request model and database operations
///
/// A join request is a prospective member's ask to enter a family, created
/// by redeeming the family's join code and resolved by an owner or admin.
/// Requests expire seven days after submission; expired rows in `pending`
/// or `rejected` state are swept by the periodic cleanup. Approved rows are
/// never swept; they are the audit trail of how members arrived.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE join_request_status AS ENUM ('pending', 'approved', 'rejected');
///
/// CREATE TABLE join_requests (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     family_id UUID NOT NULL REFERENCES families(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     status join_request_status NOT NULL DEFAULT 'pending',
///     requested_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     expires_at TIMESTAMPTZ NOT NULL
/// );
/// ```
///
/// At most one `pending` request may exist per (family, user) pair; the
/// check lives in the submit flow rather than a storage constraint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::membership::FamilyRole;

/// How long a request stays redeemable
pub const REQUEST_TTL_DAYS: i64 = 7;

/// Join request lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "join_request_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JoinRequestStatus {
    /// Awaiting a decision from an owner/admin
    Pending,

    /// Accepted; the requester was added as a standard member
    Approved,

    /// Declined
    Rejected,
}

impl JoinRequestStatus {
    /// Converts status to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinRequestStatus::Pending => "pending",
            JoinRequestStatus::Approved => "approved",
            JoinRequestStatus::Rejected => "rejected",
        }
    }
}

/// Join request model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct JoinRequest {
    /// Unique request ID
    pub id: Uuid,

    /// Target family
    pub family_id: Uuid,

    /// Requesting user
    pub user_id: Uuid,

    /// Lifecycle state
    pub status: JoinRequestStatus,

    /// When the request was submitted
    pub requested_at: DateTime<Utc>,

    /// When the request becomes eligible for cleanup
    pub expires_at: DateTime<Utc>,
}

/// A pending request joined with requester details, for the approver view
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PendingJoinRequestView {
    /// Request ID
    pub id: Uuid,

    /// Target family
    pub family_id: Uuid,

    /// Target family name
    pub family_name: String,

    /// Requester's display name
    pub requester_username: String,

    /// Requester's email
    pub requester_email: String,

    /// When the request was submitted
    pub requested_at: DateTime<Utc>,

    /// When the request expires
    pub expires_at: DateTime<Utc>,
}

/// A request joined with the responder's role, locked for a respond decision
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RespondTarget {
    /// Request ID
    pub id: Uuid,

    /// Target family
    pub family_id: Uuid,

    /// Requesting user
    pub user_id: Uuid,

    /// Current request status
    pub status: JoinRequestStatus,

    /// The responder's role in the target family (None = not a member)
    pub approver_role: Option<FamilyRole>,
}

impl JoinRequest {
    /// Creates a pending request expiring [`REQUEST_TTL_DAYS`] from now
    pub async fn create(
        pool: &PgPool,
        family_id: Uuid,
        user_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let request = sqlx::query_as::<_, JoinRequest>(
            r#"
            INSERT INTO join_requests (family_id, user_id, status, expires_at)
            VALUES ($1, $2, 'pending', NOW() + make_interval(days => $3))
            RETURNING id, family_id, user_id, status, requested_at, expires_at
            "#,
        )
        .bind(family_id)
        .bind(user_id)
        .bind(REQUEST_TTL_DAYS as i32)
        .fetch_one(pool)
        .await?;

        Ok(request)
    }

    /// Finds a request by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let request = sqlx::query_as::<_, JoinRequest>(
            r#"
            SELECT id, family_id, user_id, status, requested_at, expires_at
            FROM join_requests
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(request)
    }

    /// Checks whether a pending request already exists for (family, user)
    pub async fn pending_exists(
        pool: &PgPool,
        family_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM join_requests
                WHERE family_id = $1 AND user_id = $2 AND status = 'pending'
            )
            "#,
        )
        .bind(family_id)
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }

    /// Lists pending requests visible to an approver, newest first
    ///
    /// A request is visible when the approver holds an owner or admin role
    /// in its target family.
    pub async fn list_pending_for_approver(
        pool: &PgPool,
        approver_id: Uuid,
    ) -> Result<Vec<PendingJoinRequestView>, sqlx::Error> {
        let requests = sqlx::query_as::<_, PendingJoinRequestView>(
            r#"
            SELECT jr.id, jr.family_id, f.name AS family_name,
                   u.username AS requester_username, u.email AS requester_email,
                   jr.requested_at, jr.expires_at
            FROM join_requests jr
            JOIN families f ON f.id = jr.family_id
            JOIN users u ON u.id = jr.user_id
            JOIN family_members fm ON fm.family_id = jr.family_id AND fm.user_id = $1
            WHERE jr.status = 'pending' AND fm.role IN ('owner', 'admin')
            ORDER BY jr.requested_at DESC
            "#,
        )
        .bind(approver_id)
        .fetch_all(pool)
        .await?;

        Ok(requests)
    }

    /// Loads a request with the responder's role in its family, locking the
    /// request row for the rest of the transaction
    ///
    /// The LEFT JOIN keeps non-members visible so the caller can distinguish
    /// "no such request" (NotFound) from "no role" (Forbidden). Only the
    /// request row is locked; `family_members` sits on the nullable side of
    /// the join and cannot be.
    pub async fn find_for_respond(
        executor: impl sqlx::PgExecutor<'_>,
        request_id: Uuid,
        approver_id: Uuid,
    ) -> Result<Option<RespondTarget>, sqlx::Error> {
        let target = sqlx::query_as::<_, RespondTarget>(
            r#"
            SELECT jr.id, jr.family_id, jr.user_id, jr.status, fm.role AS approver_role
            FROM join_requests jr
            LEFT JOIN family_members fm
                   ON fm.family_id = jr.family_id AND fm.user_id = $2
            WHERE jr.id = $1
            FOR UPDATE OF jr
            "#,
        )
        .bind(request_id)
        .bind(approver_id)
        .fetch_optional(executor)
        .await?;

        Ok(target)
    }

    /// Sets a request's status
    pub async fn set_status(
        executor: impl sqlx::PgExecutor<'_>,
        id: Uuid,
        status: JoinRequestStatus,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE join_requests SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(executor)
            .await?;

        Ok(())
    }

    /// Deletes expired requests that never led to a membership
    ///
    /// Only `pending` and `rejected` rows are eligible; `approved` rows are
    /// kept whatever their age. Returns the number of rows removed.
    pub async fn cleanup_expired(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM join_requests
            WHERE status IN ('pending', 'rejected') AND expires_at < NOW()
            "#,
        )
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_as_str() {
        assert_eq!(JoinRequestStatus::Pending.as_str(), "pending");
        assert_eq!(JoinRequestStatus::Approved.as_str(), "approved");
        assert_eq!(JoinRequestStatus::Rejected.as_str(), "rejected");
    }

    #[test]
    fn test_request_ttl() {
        assert_eq!(REQUEST_TTL_DAYS, 7);
    }

    // The submit/respond/cleanup flows are exercised end-to-end by the
    // famtask-api integration tests
}
