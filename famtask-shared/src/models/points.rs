/// Points ledger model
///
/// One row per (user, family) pair holding a monotonically increasing
/// points accumulator. The only writer is assignment approval, which
/// upserts with insert-or-add semantics: points accumulate, they are
/// never overwritten.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE points (
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     family_id UUID NOT NULL REFERENCES families(id) ON DELETE CASCADE,
///     points INTEGER NOT NULL DEFAULT 0,
///     PRIMARY KEY (user_id, family_id)
/// );
/// ```

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Points ledger row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PointsLedger {
    /// Member the points belong to
    pub user_id: Uuid,

    /// Family the points were earned in
    pub family_id: Uuid,

    /// Accumulated total
    pub points: i32,
}

impl PointsLedger {
    /// Adds points for a member, creating the row if needed
    ///
    /// Takes any executor so approval can run it inside its transaction.
    pub async fn add(
        executor: impl sqlx::PgExecutor<'_>,
        user_id: Uuid,
        family_id: Uuid,
        delta: i32,
    ) -> Result<Self, sqlx::Error> {
        let ledger = sqlx::query_as::<_, PointsLedger>(
            r#"
            INSERT INTO points (user_id, family_id, points)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, family_id)
            DO UPDATE SET points = points.points + EXCLUDED.points
            RETURNING user_id, family_id, points
            "#,
        )
        .bind(user_id)
        .bind(family_id)
        .bind(delta)
        .fetch_one(executor)
        .await?;

        Ok(ledger)
    }

    /// Gets a member's total for a family (0 if no row exists yet)
    pub async fn get(
        pool: &PgPool,
        user_id: Uuid,
        family_id: Uuid,
    ) -> Result<i32, sqlx::Error> {
        let points: Option<i32> = sqlx::query_scalar(
            "SELECT points FROM points WHERE user_id = $1 AND family_id = $2",
        )
        .bind(user_id)
        .bind(family_id)
        .fetch_optional(pool)
        .await?;

        Ok(points.unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    // Upsert accumulation is exercised by the famtask-api integration
    // tests; there is no pure logic to test here
}
