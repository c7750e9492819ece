/// Family model and database operations
///
/// A family is a group of users sharing a task board. Each family carries a
/// unique join code that prospective members redeem to submit a join
/// request.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE families (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(50) NOT NULL,
///     owner_id UUID NOT NULL REFERENCES users(id),
///     join_code VARCHAR(12) NOT NULL UNIQUE,
///     last_code_update TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Join codes
///
/// Codes are 12 uppercase hex characters, compared case-insensitively
/// (input is uppercased before lookup). Creation retries generation until
/// the code misses every existing one; the unique index on
/// `families.join_code` is the actual invariant, the retry loop is an
/// optimization around it.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::membership::{CreateMembership, FamilyRole, Membership};

/// Length of a join code
pub const JOIN_CODE_LENGTH: usize = 12;

/// Alphabet join codes are drawn from
const JOIN_CODE_CHARSET: &[u8] = b"0123456789ABCDEF";

/// Upper bound on generation attempts before giving up
///
/// With 16^12 possible codes the loop terminates on the first attempt in
/// practice; the bound exists so a pathological storage state cannot spin
/// forever.
pub const MAX_JOIN_CODE_ATTEMPTS: u32 = 32;

/// Family name length limits (applied to the trimmed name)
pub const MIN_NAME_LENGTH: usize = 2;
pub const MAX_NAME_LENGTH: usize = 50;

/// Errors from family creation
#[derive(Debug, thiserror::Error)]
pub enum FamilyCreateError {
    /// Could not allocate a unique join code within the attempt budget
    #[error("Could not allocate a unique join code after {0} attempts")]
    JoinCodeExhausted(u32),

    /// Underlying database error
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Family model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Family {
    /// Unique family ID
    pub id: Uuid,

    /// Family name (2-50 characters)
    pub name: String,

    /// User who created the family
    pub owner_id: Uuid,

    /// Unique join code, stored uppercase
    pub join_code: String,

    /// When the join code was last (re)generated
    pub last_code_update: DateTime<Utc>,

    /// When the family was created
    pub created_at: DateTime<Utc>,
}

/// Input for creating a new family
#[derive(Debug, Clone)]
pub struct CreateFamily {
    /// Family name (already validated and trimmed by the caller)
    pub name: String,

    /// User who becomes the owner
    pub owner_id: Uuid,
}

impl Family {
    /// Generates a candidate join code
    ///
    /// 12 characters drawn uniformly from `0-9A-F`.
    pub fn generate_join_code() -> String {
        let mut rng = rand::thread_rng();
        (0..JOIN_CODE_LENGTH)
            .map(|_| JOIN_CODE_CHARSET[rng.gen_range(0..JOIN_CODE_CHARSET.len())] as char)
            .collect()
    }

    /// Creates a family together with its owner membership
    ///
    /// Runs the join-code retry loop: generate a code, check it against
    /// existing codes, then insert the family row and the owner's
    /// `FamilyRole::Owner` membership in a single transaction. A unique
    /// violation on the join code (two creations racing between the
    /// existence check and the insert) counts as a failed attempt and
    /// retries; any other database error is returned as-is.
    ///
    /// # Errors
    ///
    /// - `FamilyCreateError::JoinCodeExhausted` after
    ///   [`MAX_JOIN_CODE_ATTEMPTS`] failed attempts
    /// - `FamilyCreateError::Database` for any other storage failure
    pub async fn create(pool: &PgPool, data: CreateFamily) -> Result<Self, FamilyCreateError> {
        for attempt in 1..=MAX_JOIN_CODE_ATTEMPTS {
            let code = Self::generate_join_code();

            if Self::join_code_exists(pool, &code).await? {
                tracing::debug!(attempt, "Join code collision, regenerating");
                continue;
            }

            let mut tx = pool.begin().await?;

            let inserted = sqlx::query_as::<_, Family>(
                r#"
                INSERT INTO families (name, owner_id, join_code)
                VALUES ($1, $2, $3)
                RETURNING id, name, owner_id, join_code, last_code_update, created_at
                "#,
            )
            .bind(&data.name)
            .bind(data.owner_id)
            .bind(&code)
            .fetch_one(&mut *tx)
            .await;

            let family = match inserted {
                Ok(family) => family,
                Err(sqlx::Error::Database(db_err))
                    if db_err
                        .constraint()
                        .is_some_and(|c| c.contains("join_code")) =>
                {
                    // Lost the race for this code; the transaction dies with
                    // the failed insert and we try a fresh one
                    tracing::debug!(attempt, "Join code insert raced, regenerating");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            Membership::create(
                &mut *tx,
                CreateMembership {
                    family_id: family.id,
                    user_id: data.owner_id,
                    role: FamilyRole::Owner,
                },
            )
            .await?;

            tx.commit().await?;

            tracing::info!(family_id = %family.id, owner_id = %data.owner_id, "Family created");
            return Ok(family);
        }

        Err(FamilyCreateError::JoinCodeExhausted(MAX_JOIN_CODE_ATTEMPTS))
    }

    /// Finds a family by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let family = sqlx::query_as::<_, Family>(
            r#"
            SELECT id, name, owner_id, join_code, last_code_update, created_at
            FROM families
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(family)
    }

    /// Finds a family by join code
    ///
    /// The comparison is case-insensitive: codes are stored uppercase, so
    /// the input is uppercased before the exact-match lookup.
    pub async fn find_by_join_code(
        pool: &PgPool,
        code: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let family = sqlx::query_as::<_, Family>(
            r#"
            SELECT id, name, owner_id, join_code, last_code_update, created_at
            FROM families
            WHERE join_code = $1
            "#,
        )
        .bind(code.trim().to_uppercase())
        .fetch_optional(pool)
        .await?;

        Ok(family)
    }

    /// Checks whether any family already uses the given code
    async fn join_code_exists(pool: &PgPool, code: &str) -> Result<bool, sqlx::Error> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM families WHERE join_code = $1)")
                .bind(code)
                .fetch_one(pool)
                .await?;

        Ok(exists)
    }
}

/// Validates a family name against the length limits
///
/// Returns the trimmed name on success.
pub fn validate_family_name(name: &str) -> Result<&str, String> {
    let trimmed = name.trim();
    if trimmed.len() < MIN_NAME_LENGTH || trimmed.len() > MAX_NAME_LENGTH {
        return Err(format!(
            "Family name must be between {} and {} characters",
            MIN_NAME_LENGTH, MAX_NAME_LENGTH
        ));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_join_code_shape() {
        let code = Family::generate_join_code();
        assert_eq!(code.len(), JOIN_CODE_LENGTH);
        assert!(code
            .bytes()
            .all(|b| JOIN_CODE_CHARSET.contains(&b)), "unexpected character in {}", code);
    }

    #[test]
    fn test_generate_join_code_is_uppercase() {
        let code = Family::generate_join_code();
        assert_eq!(code, code.to_uppercase());
    }

    #[test]
    fn test_generated_codes_vary() {
        // Not a uniqueness proof, just a sanity check that the RNG is wired up
        let codes: std::collections::HashSet<String> =
            (0..64).map(|_| Family::generate_join_code()).collect();
        assert!(codes.len() > 1);
    }

    #[test]
    fn test_validate_family_name() {
        assert_eq!(validate_family_name("Smiths"), Ok("Smiths"));
        assert_eq!(validate_family_name("  Smiths  "), Ok("Smiths"));
        assert_eq!(validate_family_name("ab"), Ok("ab"));

        assert!(validate_family_name("a").is_err());
        assert!(validate_family_name("   ").is_err());
        assert!(validate_family_name(&"x".repeat(51)).is_err());
        assert!(validate_family_name(&"x".repeat(50)).is_ok());
    }

    // The retry loop and uniqueness constraint are exercised by the
    // famtask-api integration tests
}
