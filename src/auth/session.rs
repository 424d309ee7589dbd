use async_trait::async_trait;
use rand::Rng;
use rusqlite::{params, OptionalExtension};

use crate::comments::domain::UserId;
use crate::comments::repository::{SqliteStore, StoreError};
use crate::state::DbPool;

/// Resolves session tokens issued by the identity provider.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// The user behind `token`, or `None` when unknown or expired.
    async fn resolve(&self, token: &str) -> Result<Option<UserId>, StoreError>;
}

#[async_trait]
impl SessionRepository for SqliteStore {
    async fn resolve(&self, token: &str) -> Result<Option<UserId>, StoreError> {
        let conn = self.pool().get()?;

        let user_id = conn
            .query_row(
                "SELECT user_id FROM sessions
                 WHERE token = ?1 AND expires_at > datetime('now')",
                params![token],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        Ok(user_id.map(UserId))
    }
}

/// Create a new session for a user. Returns the session token.
pub fn create_session(pool: &DbPool, user_id: &str, hours: u64) -> Result<String, StoreError> {
    let conn = pool.get()?;

    let token = generate_token();
    let id = uuid::Uuid::now_v7().to_string();

    conn.execute(
        "INSERT INTO sessions (id, user_id, token, expires_at) VALUES (?1, ?2, ?3, datetime('now', ?4))",
        params![id, user_id, token, format!("+{} hours", hours)],
    )?;

    Ok(token)
}

/// Generate a cryptographically random 32-byte hex token.
fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
