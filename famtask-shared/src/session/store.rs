/// Redis-backed session store
///
/// Sessions are opaque to clients: the browser holds a random 64-character
/// hex token in a cookie, and the server keeps the session record in Redis
/// under `famtask:session:{token}` with a 24-hour TTL. Every successful
/// fetch re-issues the record with a fresh TTL, giving a sliding expiry:
/// an idle day logs the user out, active users stay signed in.
///
/// # Example
///
/// ```no_run
/// use famtask_shared::session::store::{SessionData, SessionStore};
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = SessionStore::connect("redis://localhost:6379").await?;
///
/// let token = store
///     .create(&SessionData { user_id: Uuid::new_v4(), active_family_id: None })
///     .await?;
///
/// let session = store.fetch(&token).await?;
/// assert!(session.is_some());
/// # Ok(())
/// # }
/// ```

use rand::RngCore;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Session lifetime: 24 hours, sliding
pub const SESSION_TTL_SECONDS: u64 = 24 * 60 * 60;

/// Number of random bytes in a session token (hex-encoded to 64 chars)
const TOKEN_BYTES: usize = 32;

/// Session store errors
#[derive(Error, Debug)]
pub enum SessionError {
    /// Connection error
    #[error("Session store connection error: {0}")]
    ConnectionError(String),

    /// Command execution error
    #[error("Session store command error: {0}")]
    CommandError(String),

    /// Stored session record could not be decoded
    #[error("Session record corrupt: {0}")]
    CorruptRecord(String),
}

impl From<RedisError> for SessionError {
    fn from(err: RedisError) -> Self {
        match err.kind() {
            redis::ErrorKind::IoError => {
                SessionError::ConnectionError(format!("IO error: {}", err))
            }
            _ => SessionError::CommandError(err.to_string()),
        }
    }
}

/// The record a session token resolves to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    /// Authenticated user
    pub user_id: Uuid,

    /// Family the session currently operates against
    pub active_family_id: Option<Uuid>,
}

/// Redis-backed session store
///
/// Cheap to clone; the underlying `ConnectionManager` handles reconnection.
#[derive(Clone)]
pub struct SessionStore {
    manager: ConnectionManager,
}

impl SessionStore {
    /// Connects to Redis at the given URL
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the initial connection fails
    pub async fn connect(url: &str) -> Result<Self, SessionError> {
        let client = Client::open(url)
            .map_err(|e| SessionError::ConnectionError(format!("Invalid Redis URL: {}", e)))?;

        let manager = ConnectionManager::new(client).await.map_err(|e| {
            SessionError::ConnectionError(format!("Failed to connect to Redis: {}", e))
        })?;

        tracing::info!("Session store connected");

        Ok(Self { manager })
    }

    /// Creates a session for the given record and returns its token
    ///
    /// The token is 32 bytes from the OS RNG, hex-encoded. Collisions are
    /// not a practical concern at that size.
    pub async fn create(&self, data: &SessionData) -> Result<String, SessionError> {
        let token = generate_session_token();
        self.write(&token, data).await?;

        tracing::debug!(user_id = %data.user_id, "Session created");
        Ok(token)
    }

    /// Fetches the session for a token, refreshing its TTL
    ///
    /// Returns `None` for unknown or expired tokens. A successful fetch
    /// re-issues the record with the full TTL (sliding expiry).
    pub async fn fetch(&self, token: &str) -> Result<Option<SessionData>, SessionError> {
        let key = session_key(token);
        let mut conn = self.manager.clone();

        let value: Option<String> = conn.get(&key).await?;

        let Some(json) = value else {
            return Ok(None);
        };

        let data: SessionData = serde_json::from_str(&json)
            .map_err(|e| SessionError::CorruptRecord(e.to_string()))?;

        // Sliding expiry: re-issue with a fresh TTL
        let _: () = conn.set_ex(&key, json, SESSION_TTL_SECONDS).await?;

        Ok(Some(data))
    }

    /// Overwrites the session record for a token
    ///
    /// Used when the active-family selector changes. Resets the TTL, which
    /// is fine: the caller just made an authenticated request.
    pub async fn update(&self, token: &str, data: &SessionData) -> Result<(), SessionError> {
        self.write(token, data).await
    }

    /// Deletes a session (logout)
    ///
    /// Returns true if a session was removed, false if it didn't exist
    pub async fn delete(&self, token: &str) -> Result<bool, SessionError> {
        let key = session_key(token);
        let mut conn = self.manager.clone();

        let deleted: u32 = conn.del(&key).await?;

        Ok(deleted > 0)
    }

    async fn write(&self, token: &str, data: &SessionData) -> Result<(), SessionError> {
        let key = session_key(token);
        let json = serde_json::to_string(data)
            .map_err(|e| SessionError::CorruptRecord(e.to_string()))?;

        let mut conn = self.manager.clone();
        let _: () = conn.set_ex(&key, json, SESSION_TTL_SECONDS).await?;

        Ok(())
    }
}

/// Builds the Redis key for a session token
fn session_key(token: &str) -> String {
    format!("famtask:session:{}", token)
}

/// Generates a fresh session token
fn generate_session_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_key_format() {
        assert_eq!(session_key("abc"), "famtask:session:abc");
    }

    #[test]
    fn test_generate_session_token_shape() {
        let token = generate_session_token();
        assert_eq!(token.len(), TOKEN_BYTES * 2);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generate_session_token_unique() {
        let a = generate_session_token();
        let b = generate_session_token();
        assert_ne!(a, b);
    }

    #[test]
    fn test_session_data_roundtrip() {
        let data = SessionData {
            user_id: Uuid::new_v4(),
            active_family_id: Some(Uuid::new_v4()),
        };

        let json = serde_json::to_string(&data).unwrap();
        let back: SessionData = serde_json::from_str(&json).unwrap();
        assert_eq!(back.user_id, data.user_id);
        assert_eq!(back.active_family_id, data.active_family_id);
    }

    // Store operations against Redis are covered by the famtask-api
    // integration tests
}
