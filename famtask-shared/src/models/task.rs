/// Task and assignment models
///
/// A task is a chore posted on the family board; it is immutable once
/// created and owns exactly one assignment. The assignment carries the
/// completion-approval lifecycle independently of the task definition.
///
/// # State Machine
///
/// ```text
/// not_assigned   (created without an assignee; terminal in current scope)
/// pending      → completed    (by the assignee)
/// completed    → approved     (by an owner/admin; terminal, awards points)
/// completed    → pending      (owner/admin reject; back onto the worklist)
/// ```
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_difficulty AS ENUM ('light', 'easy', 'medium', 'hard');
/// CREATE TYPE assignment_status AS ENUM ('not_assigned', 'pending', 'completed', 'approved');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     family_id UUID NOT NULL REFERENCES families(id) ON DELETE CASCADE,
///     title VARCHAR(28) NOT NULL,
///     description TEXT,
///     difficulty task_difficulty NOT NULL DEFAULT 'medium',
///     points_reward INTEGER NOT NULL,
///     created_by UUID NOT NULL REFERENCES users(id),
///     deadline TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE task_assignments (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     task_id UUID NOT NULL UNIQUE REFERENCES tasks(id) ON DELETE CASCADE,
///     user_id UUID REFERENCES users(id),
///     status assignment_status NOT NULL DEFAULT 'not_assigned',
///     assigned_date TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::membership::FamilyRole;

/// Maximum task title length
pub const MAX_TITLE_LENGTH: usize = 28;

/// Task difficulty, which fixes the points reward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_difficulty", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// 5 points
    Light,

    /// 10 points
    Easy,

    /// 25 points
    Medium,

    /// 50 points
    Hard,
}

impl Difficulty {
    /// Fixed reward table
    pub fn points_reward(&self) -> i32 {
        match self {
            Difficulty::Light => 5,
            Difficulty::Easy => 10,
            Difficulty::Medium => 25,
            Difficulty::Hard => 50,
        }
    }

    /// Converts difficulty to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Light => "light",
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    /// Parses client input, defaulting to medium
    ///
    /// Absent or unrecognized values map to `Medium` rather than failing;
    /// the task form treats difficulty as a hint, not a contract.
    pub fn from_input(input: Option<&str>) -> Self {
        match input.map(|s| s.trim().to_lowercase()).as_deref() {
            Some("light") => Difficulty::Light,
            Some("easy") => Difficulty::Easy,
            Some("medium") => Difficulty::Medium,
            Some("hard") => Difficulty::Hard,
            _ => Difficulty::Medium,
        }
    }
}

/// Assignment lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "assignment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    /// Created without an assignee
    NotAssigned,

    /// On the assignee's worklist
    Pending,

    /// Marked done by the assignee, awaiting review
    Completed,

    /// Accepted by an owner/admin; points awarded
    Approved,
}

impl AssignmentStatus {
    /// Converts status to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::NotAssigned => "not_assigned",
            AssignmentStatus::Pending => "pending",
            AssignmentStatus::Completed => "completed",
            AssignmentStatus::Approved => "approved",
        }
    }

    /// Checks if the status is terminal
    pub fn is_terminal(&self) -> bool {
        matches!(self, AssignmentStatus::Approved)
    }

    /// Checks if a transition to the target status is legal
    ///
    /// The reject path (`completed → pending`) is the one cycle: rejection
    /// returns the chore to the worklist instead of killing it.
    pub fn can_transition_to(&self, target: AssignmentStatus) -> bool {
        matches!(
            (self, target),
            (AssignmentStatus::Pending, AssignmentStatus::Completed)
                | (AssignmentStatus::Completed, AssignmentStatus::Approved)
                | (AssignmentStatus::Completed, AssignmentStatus::Pending)
        )
    }
}

/// Task model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    /// Unique task ID
    pub id: Uuid,

    /// Family this task belongs to
    pub family_id: Uuid,

    /// Short title (at most 28 characters)
    pub title: String,

    /// Optional longer description
    pub description: Option<String>,

    /// Difficulty, fixed at creation
    pub difficulty: Difficulty,

    /// Reward, derived from difficulty at creation
    pub points_reward: i32,

    /// User who posted the task
    pub created_by: Uuid,

    /// Optional deadline
    pub deadline: Option<DateTime<Utc>>,

    /// When the task was created
    pub created_at: DateTime<Utc>,
}

/// Assignment model: the binding of a task to (at most) one member
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TaskAssignment {
    /// Unique assignment ID
    pub id: Uuid,

    /// The owning task (one assignment per task)
    pub task_id: Uuid,

    /// Assigned member (None while not assigned)
    pub user_id: Option<Uuid>,

    /// Lifecycle state
    pub status: AssignmentStatus,

    /// When the assignment was made
    pub assigned_date: DateTime<Utc>,
}

/// Input for creating a task with its assignment
#[derive(Debug, Clone)]
pub struct CreateTask {
    /// Family the task belongs to
    pub family_id: Uuid,

    /// Posting user
    pub created_by: Uuid,

    /// Title (already validated by the caller)
    pub title: String,

    /// Optional description
    pub description: Option<String>,

    /// Difficulty (already defaulted by the caller)
    pub difficulty: Difficulty,

    /// Member to assign the task to, if any
    pub assignee: Option<Uuid>,

    /// Optional deadline
    pub deadline: Option<DateTime<Utc>>,
}

/// A task joined with its assignment, returned from creation
#[derive(Debug, Clone, Serialize)]
pub struct TaskWithAssignment {
    /// The task
    pub task: Task,

    /// Its single assignment
    pub assignment: TaskAssignment,
}

/// Board view: every family task with creator/assignee names and status
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct FamilyTaskView {
    pub task_id: Uuid,
    pub assignment_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub difficulty: Difficulty,
    pub points_reward: i32,
    pub created_by_username: String,
    pub assignee_username: Option<String>,
    pub status: AssignmentStatus,
    pub deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Personal worklist entry
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MyTaskView {
    pub assignment_id: Uuid,
    pub task_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub points_reward: i32,
    pub status: AssignmentStatus,
    pub deadline: Option<DateTime<Utc>>,
}

/// Approval queue entry
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PendingApprovalView {
    pub assignment_id: Uuid,
    pub title: String,
    pub points_reward: i32,
    pub completed_by: String,
    pub assigned_date: DateTime<Utc>,
}

/// An assignment joined with its task's family and the reviewer's role,
/// locked for an approve/reject decision
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReviewTarget {
    /// Assignment ID
    pub assignment_id: Uuid,

    /// Assigned member (None only while not assigned)
    pub assignee_id: Option<Uuid>,

    /// Current assignment status
    pub status: AssignmentStatus,

    /// Family the owning task belongs to
    pub family_id: Uuid,

    /// The task's fixed reward
    pub points_reward: i32,

    /// The reviewer's role in that family (None = not a member)
    pub reviewer_role: Option<FamilyRole>,
}

impl Task {
    /// Creates a task together with its single assignment
    ///
    /// Both rows are inserted in one transaction; the assignment starts
    /// `pending` when an assignee is given, `not_assigned` otherwise.
    pub async fn create_with_assignment(
        pool: &PgPool,
        data: CreateTask,
    ) -> Result<TaskWithAssignment, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let task = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (family_id, title, description, difficulty, points_reward, created_by, deadline)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, family_id, title, description, difficulty, points_reward,
                      created_by, deadline, created_at
            "#,
        )
        .bind(data.family_id)
        .bind(&data.title)
        .bind(&data.description)
        .bind(data.difficulty)
        .bind(data.difficulty.points_reward())
        .bind(data.created_by)
        .bind(data.deadline)
        .fetch_one(&mut *tx)
        .await?;

        let status = if data.assignee.is_some() {
            AssignmentStatus::Pending
        } else {
            AssignmentStatus::NotAssigned
        };

        let assignment = sqlx::query_as::<_, TaskAssignment>(
            r#"
            INSERT INTO task_assignments (task_id, user_id, status)
            VALUES ($1, $2, $3)
            RETURNING id, task_id, user_id, status, assigned_date
            "#,
        )
        .bind(task.id)
        .bind(data.assignee)
        .bind(status)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            task_id = %task.id,
            family_id = %task.family_id,
            status = status.as_str(),
            "Task created"
        );

        Ok(TaskWithAssignment { task, assignment })
    }

    /// Lists every task on a family's board, newest first
    pub async fn list_family_tasks(
        pool: &PgPool,
        family_id: Uuid,
    ) -> Result<Vec<FamilyTaskView>, sqlx::Error> {
        let tasks = sqlx::query_as::<_, FamilyTaskView>(
            r#"
            SELECT t.id AS task_id, ta.id AS assignment_id, t.title, t.description,
                   t.difficulty, t.points_reward,
                   cu.username AS created_by_username,
                   au.username AS assignee_username,
                   ta.status, t.deadline, t.created_at
            FROM tasks t
            JOIN task_assignments ta ON ta.task_id = t.id
            JOIN users cu ON cu.id = t.created_by
            LEFT JOIN users au ON au.id = ta.user_id
            WHERE t.family_id = $1
            ORDER BY t.created_at DESC
            "#,
        )
        .bind(family_id)
        .fetch_all(pool)
        .await?;

        Ok(tasks)
    }

    /// Lists a member's open worklist within a family
    ///
    /// Only `pending` and `completed` assignments appear; approved ones
    /// are history, not work. Deadlines sort soonest-first with undated
    /// tasks last, ties broken newest-created-first.
    pub async fn list_my_tasks(
        pool: &PgPool,
        user_id: Uuid,
        family_id: Uuid,
    ) -> Result<Vec<MyTaskView>, sqlx::Error> {
        let tasks = sqlx::query_as::<_, MyTaskView>(
            r#"
            SELECT ta.id AS assignment_id, t.id AS task_id, t.title, t.description,
                   t.points_reward, ta.status, t.deadline
            FROM task_assignments ta
            JOIN tasks t ON t.id = ta.task_id
            WHERE ta.user_id = $1
              AND t.family_id = $2
              AND ta.status IN ('pending', 'completed')
            ORDER BY t.deadline ASC NULLS LAST, t.created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(family_id)
        .fetch_all(pool)
        .await?;

        Ok(tasks)
    }

    /// Lists completed assignments awaiting review in a family
    ///
    /// Oldest assignment first: completions are reviewed in FIFO order.
    pub async fn list_pending_approval(
        pool: &PgPool,
        family_id: Uuid,
    ) -> Result<Vec<PendingApprovalView>, sqlx::Error> {
        let tasks = sqlx::query_as::<_, PendingApprovalView>(
            r#"
            SELECT ta.id AS assignment_id, t.title, t.points_reward,
                   u.username AS completed_by, ta.assigned_date
            FROM task_assignments ta
            JOIN tasks t ON t.id = ta.task_id
            JOIN users u ON u.id = ta.user_id
            WHERE t.family_id = $1 AND ta.status = 'completed'
            ORDER BY ta.assigned_date ASC
            "#,
        )
        .bind(family_id)
        .fetch_all(pool)
        .await?;

        Ok(tasks)
    }
}

impl TaskAssignment {
    /// Finds an assignment by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let assignment = sqlx::query_as::<_, TaskAssignment>(
            r#"
            SELECT id, task_id, user_id, status, assigned_date
            FROM task_assignments
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(assignment)
    }

    /// Finds an assignment by ID, locking the row for the transaction
    ///
    /// Used by the complete flow so two concurrent transitions serialize.
    pub async fn find_by_id_for_update(
        executor: impl sqlx::PgExecutor<'_>,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let assignment = sqlx::query_as::<_, TaskAssignment>(
            r#"
            SELECT id, task_id, user_id, status, assigned_date
            FROM task_assignments
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(assignment)
    }

    /// Loads an assignment with its family and the reviewer's role, locking
    /// the assignment row for the rest of the transaction
    ///
    /// The lock is what makes double-approval impossible: the second
    /// reviewer blocks until the first commits, then sees `approved` and
    /// fails the status check.
    pub async fn find_for_review(
        executor: impl sqlx::PgExecutor<'_>,
        assignment_id: Uuid,
        reviewer_id: Uuid,
    ) -> Result<Option<ReviewTarget>, sqlx::Error> {
        let target = sqlx::query_as::<_, ReviewTarget>(
            r#"
            SELECT ta.id AS assignment_id, ta.user_id AS assignee_id, ta.status,
                   t.family_id, t.points_reward, fm.role AS reviewer_role
            FROM task_assignments ta
            JOIN tasks t ON t.id = ta.task_id
            LEFT JOIN family_members fm
                   ON fm.family_id = t.family_id AND fm.user_id = $2
            WHERE ta.id = $1
            FOR UPDATE OF ta
            "#,
        )
        .bind(assignment_id)
        .bind(reviewer_id)
        .fetch_optional(executor)
        .await?;

        Ok(target)
    }

    /// Sets an assignment's status
    pub async fn set_status(
        executor: impl sqlx::PgExecutor<'_>,
        id: Uuid,
        status: AssignmentStatus,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE task_assignments SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(executor)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_points_reward_table() {
        assert_eq!(Difficulty::Light.points_reward(), 5);
        assert_eq!(Difficulty::Easy.points_reward(), 10);
        assert_eq!(Difficulty::Medium.points_reward(), 25);
        assert_eq!(Difficulty::Hard.points_reward(), 50);
    }

    #[test]
    fn test_difficulty_from_input() {
        assert_eq!(Difficulty::from_input(Some("light")), Difficulty::Light);
        assert_eq!(Difficulty::from_input(Some("easy")), Difficulty::Easy);
        assert_eq!(Difficulty::from_input(Some("medium")), Difficulty::Medium);
        assert_eq!(Difficulty::from_input(Some("hard")), Difficulty::Hard);

        // Case and whitespace tolerated
        assert_eq!(Difficulty::from_input(Some("HARD")), Difficulty::Hard);
        assert_eq!(Difficulty::from_input(Some(" Easy ")), Difficulty::Easy);

        // Absent or unrecognized defaults to medium
        assert_eq!(Difficulty::from_input(None), Difficulty::Medium);
        assert_eq!(Difficulty::from_input(Some("extreme")), Difficulty::Medium);
        assert_eq!(Difficulty::from_input(Some("")), Difficulty::Medium);
    }

    #[test]
    fn test_status_as_str() {
        assert_eq!(AssignmentStatus::NotAssigned.as_str(), "not_assigned");
        assert_eq!(AssignmentStatus::Pending.as_str(), "pending");
        assert_eq!(AssignmentStatus::Completed.as_str(), "completed");
        assert_eq!(AssignmentStatus::Approved.as_str(), "approved");
    }

    #[test]
    fn test_legal_transitions() {
        assert!(AssignmentStatus::Pending.can_transition_to(AssignmentStatus::Completed));
        assert!(AssignmentStatus::Completed.can_transition_to(AssignmentStatus::Approved));
        // Rejection cycles back onto the worklist
        assert!(AssignmentStatus::Completed.can_transition_to(AssignmentStatus::Pending));
    }

    #[test]
    fn test_illegal_transitions() {
        // Approved is terminal
        assert!(!AssignmentStatus::Approved.can_transition_to(AssignmentStatus::Pending));
        assert!(!AssignmentStatus::Approved.can_transition_to(AssignmentStatus::Completed));
        assert!(!AssignmentStatus::Approved.can_transition_to(AssignmentStatus::NotAssigned));

        // No skipping review
        assert!(!AssignmentStatus::Pending.can_transition_to(AssignmentStatus::Approved));

        // Re-assignment is out of scope
        assert!(!AssignmentStatus::NotAssigned.can_transition_to(AssignmentStatus::Pending));
        assert!(!AssignmentStatus::NotAssigned.can_transition_to(AssignmentStatus::Completed));
    }

    #[test]
    fn test_terminal_status() {
        assert!(AssignmentStatus::Approved.is_terminal());
        assert!(!AssignmentStatus::Pending.is_terminal());
        assert!(!AssignmentStatus::Completed.is_terminal());
        assert!(!AssignmentStatus::NotAssigned.is_terminal());
    }

    // Integration tests for database operations are in famtask-api/tests/
}
