/// Family membership model and database operations
///
/// Implements the many-to-many relationship between users and families
/// with role-based access control.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE family_role AS ENUM ('owner', 'admin', 'standard');
///
/// CREATE TABLE family_members (
///     family_id UUID NOT NULL REFERENCES families(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     role family_role NOT NULL DEFAULT 'standard',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (family_id, user_id)
/// );
/// ```
///
/// # Roles
///
/// - **owner**: created the family; full control
/// - **admin**: may approve join requests, create tasks, review completions
/// - **standard**: may complete assigned tasks

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// RBAC roles within a family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "family_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FamilyRole {
    /// Created the family, full control
    Owner,

    /// May manage join requests, tasks, and approvals
    Admin,

    /// May complete tasks assigned to them
    Standard,
}

impl FamilyRole {
    /// Converts role to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            FamilyRole::Owner => "owner",
            FamilyRole::Admin => "admin",
            FamilyRole::Standard => "standard",
        }
    }

    /// Whether this role carries the admin-panel rights
    pub fn has_admin_rights(&self) -> bool {
        matches!(self, FamilyRole::Owner | FamilyRole::Admin)
    }

    /// Can respond to join requests
    pub fn can_approve_requests(&self) -> bool {
        self.has_admin_rights()
    }

    /// Can create tasks
    pub fn can_create_tasks(&self) -> bool {
        self.has_admin_rights()
    }

    /// Can approve or reject completed assignments
    pub fn can_review_assignments(&self) -> bool {
        self.has_admin_rights()
    }
}

/// Membership model representing a user-family relationship with a role
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Membership {
    /// Family ID
    pub family_id: Uuid,

    /// User ID
    pub user_id: Uuid,

    /// Role within the family
    pub role: FamilyRole,

    /// When the membership was created
    pub created_at: DateTime<Utc>,
}

/// Input for creating a new membership
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMembership {
    /// Family ID
    pub family_id: Uuid,

    /// User ID
    pub user_id: Uuid,

    /// Role to assign
    pub role: FamilyRole,
}

/// A family member joined with their username, for member listings
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct FamilyMemberView {
    /// User ID
    pub user_id: Uuid,

    /// Display name
    pub username: String,

    /// Role within the family
    pub role: FamilyRole,
}

/// A family the user belongs to, joined with the family name
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserFamilyView {
    /// Family ID
    pub family_id: Uuid,

    /// Family name
    pub family_name: String,

    /// The user's role in that family
    pub role: FamilyRole,
}

impl Membership {
    /// Creates a new membership (adds user to family)
    ///
    /// Takes any executor so it can participate in a larger transaction;
    /// family creation and join-request approval both insert memberships
    /// atomically with their other writes.
    ///
    /// # Errors
    ///
    /// Returns an error if the membership already exists (unique constraint
    /// violation) or the family/user doesn't exist (foreign key violation)
    pub async fn create(
        executor: impl sqlx::PgExecutor<'_>,
        data: CreateMembership,
    ) -> Result<Self, sqlx::Error> {
        let membership = sqlx::query_as::<_, Membership>(
            r#"
            INSERT INTO family_members (family_id, user_id, role)
            VALUES ($1, $2, $3)
            RETURNING family_id, user_id, role, created_at
            "#,
        )
        .bind(data.family_id)
        .bind(data.user_id)
        .bind(data.role)
        .fetch_one(executor)
        .await?;

        Ok(membership)
    }

    /// Finds a specific membership by family and user
    pub async fn find(
        pool: &PgPool,
        family_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let membership = sqlx::query_as::<_, Membership>(
            r#"
            SELECT family_id, user_id, role, created_at
            FROM family_members
            WHERE family_id = $1 AND user_id = $2
            "#,
        )
        .bind(family_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(membership)
    }

    /// Checks if a user is a member of a family (any role)
    pub async fn is_member(
        executor: impl sqlx::PgExecutor<'_>,
        family_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM family_members
                WHERE family_id = $1 AND user_id = $2
            )
            "#,
        )
        .bind(family_id)
        .bind(user_id)
        .fetch_one(executor)
        .await?;

        Ok(exists)
    }

    /// Gets a user's role in a family
    ///
    /// Returns None if the user is not a member.
    pub async fn get_role(
        executor: impl sqlx::PgExecutor<'_>,
        family_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<FamilyRole>, sqlx::Error> {
        let role: Option<FamilyRole> = sqlx::query_scalar(
            r#"
            SELECT role FROM family_members
            WHERE family_id = $1 AND user_id = $2
            "#,
        )
        .bind(family_id)
        .bind(user_id)
        .fetch_optional(executor)
        .await?;

        Ok(role)
    }

    /// Lists all members of a family with their usernames
    ///
    /// Ordered by join date, so the owner comes first.
    pub async fn list_members(
        pool: &PgPool,
        family_id: Uuid,
    ) -> Result<Vec<FamilyMemberView>, sqlx::Error> {
        let members = sqlx::query_as::<_, FamilyMemberView>(
            r#"
            SELECT fm.user_id, u.username, fm.role
            FROM family_members fm
            JOIN users u ON u.id = fm.user_id
            WHERE fm.family_id = $1
            ORDER BY fm.created_at ASC
            "#,
        )
        .bind(family_id)
        .fetch_all(pool)
        .await?;

        Ok(members)
    }

    /// Lists all families a user belongs to, with names and roles
    pub async fn list_families_for_user(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<UserFamilyView>, sqlx::Error> {
        let families = sqlx::query_as::<_, UserFamilyView>(
            r#"
            SELECT fm.family_id, f.name AS family_name, fm.role
            FROM family_members fm
            JOIN families f ON f.id = fm.family_id
            WHERE fm.user_id = $1
            ORDER BY fm.created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(families)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_role_as_str() {
        assert_eq!(FamilyRole::Owner.as_str(), "owner");
        assert_eq!(FamilyRole::Admin.as_str(), "admin");
        assert_eq!(FamilyRole::Standard.as_str(), "standard");
    }

    #[test]
    fn test_role_permissions() {
        // Owner and admin share the approval and task-creation rights
        assert!(FamilyRole::Owner.has_admin_rights());
        assert!(FamilyRole::Owner.can_approve_requests());
        assert!(FamilyRole::Owner.can_create_tasks());
        assert!(FamilyRole::Owner.can_review_assignments());

        assert!(FamilyRole::Admin.has_admin_rights());
        assert!(FamilyRole::Admin.can_approve_requests());
        assert!(FamilyRole::Admin.can_create_tasks());
        assert!(FamilyRole::Admin.can_review_assignments());

        // Standard members only work their own task list
        assert!(!FamilyRole::Standard.has_admin_rights());
        assert!(!FamilyRole::Standard.can_approve_requests());
        assert!(!FamilyRole::Standard.can_create_tasks());
        assert!(!FamilyRole::Standard.can_review_assignments());
    }

    // Integration tests for database operations are in famtask-api/tests/
}
