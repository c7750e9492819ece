/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Registration, login, logout
/// - `families`: Family creation, listing, active-family context, permissions
/// - `join_requests`: Join-code redemption and request approval
/// - `tasks`: Task creation and the completion-approval lifecycle

pub mod auth;
pub mod families;
pub mod health;
pub mod join_requests;
pub mod tasks;

use crate::error::ApiError;
use famtask_shared::session::AuthContext;
use uuid::Uuid;

/// Resolves the session's active family, or fails
///
/// Family-scoped operations always read the family from the session
/// context; a session that never created or switched into a family has
/// nothing to operate on.
pub(crate) fn require_active_family(ctx: &AuthContext) -> Result<Uuid, ApiError> {
    ctx.active_family_id
        .ok_or_else(|| ApiError::BadRequest("No active family selected".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_active_family() {
        let mut ctx = AuthContext {
            user_id: Uuid::new_v4(),
            active_family_id: None,
            token: "t".to_string(),
        };

        assert!(require_active_family(&ctx).is_err());

        let family_id = Uuid::new_v4();
        ctx.active_family_id = Some(family_id);
        assert_eq!(require_active_family(&ctx).unwrap(), family_id);
    }
}
