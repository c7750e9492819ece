/// Session layer
///
/// FamTask authenticates browsers with opaque server-side sessions: a random
/// token in an HttpOnly cookie keys a small JSON record in Redis. The record
/// carries the user identity and the currently selected family, and its TTL
/// slides forward on every authenticated request.
///
/// - `store`: Redis-backed session store

pub mod store;

pub use store::{SessionData, SessionError, SessionStore, SESSION_TTL_SECONDS};

use uuid::Uuid;

/// Per-request authentication context
///
/// Built by the API's session middleware after a successful session lookup
/// and injected into request extensions for handlers to read.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Authenticated user
    pub user_id: Uuid,

    /// Family the session currently operates against (None until the user
    /// creates or switches into one)
    pub active_family_id: Option<Uuid>,

    /// Session token backing this context, used to write selector updates
    pub token: String,
}

impl AuthContext {
    /// Builds a context from a session record and its token
    pub fn from_session(token: String, data: &SessionData) -> Self {
        Self {
            user_id: data.user_id,
            active_family_id: data.active_family_id,
            token,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_context_from_session() {
        let user_id = Uuid::new_v4();
        let family_id = Uuid::new_v4();
        let data = SessionData {
            user_id,
            active_family_id: Some(family_id),
        };

        let ctx = AuthContext::from_session("token123".to_string(), &data);
        assert_eq!(ctx.user_id, user_id);
        assert_eq!(ctx.active_family_id, Some(family_id));
        assert_eq!(ctx.token, "token123");
    }
}
