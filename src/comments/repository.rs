// Repository pattern - isolates all database side effects
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use rusqlite::{params, OptionalExtension, Row};
use thiserror::Error;

use crate::comments::domain::{Comment, CommentId, NewComment, PostId, ReplyTarget, UserId};
use crate::db::models::Profile;
use crate::state::DbPool;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),
}

/// Persistent comment records.
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Fetch the threading fields of a would-be parent.
    async fn find_reply_target(&self, id: &CommentId)
        -> Result<Option<ReplyTarget>, StoreError>;

    /// Insert and return the stored row joined with its author profile.
    async fn insert(&self, comment: &NewComment) -> Result<Comment, StoreError>;

    async fn find(&self, id: &CommentId) -> Result<Option<Comment>, StoreError>;

    async fn count_top_level(&self, post_id: &PostId) -> Result<u64, StoreError>;

    /// Top-level comments newest first.
    async fn top_level_page(
        &self,
        post_id: &PostId,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<Comment>, StoreError>;

    /// Direct replies oldest first.
    async fn replies_of(&self, parent_id: &CommentId) -> Result<Vec<Comment>, StoreError>;

    async fn update_content(&self, id: &CommentId, content: &str) -> Result<bool, StoreError>;

    /// Delete a comment; replies go with it. Returns rows removed.
    async fn delete(&self, id: &CommentId) -> Result<u64, StoreError>;
}

/// User profile lookups.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn find_profile(&self, user_id: &UserId) -> Result<Option<Profile>, StoreError>;
}

/// SQLite implementation
#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

const COMMENT_COLUMNS: &str = "c.id, c.post_id, c.content, c.parent_id, c.user_id,
     c.mentioned_username, c.created_at, c.updated_at,
     p.id, p.username, p.avatar_url";

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<Comment> {
    let profile_id: Option<String> = row.get(8)?;
    let profile_username: Option<String> = row.get(9)?;
    let profiles = match (profile_id, profile_username) {
        (Some(id), Some(username)) => Some(Profile {
            id,
            username,
            avatar_url: row.get(10)?,
        }),
        _ => None,
    };

    Ok(Comment {
        id: CommentId(row.get(0)?),
        post_id: PostId(row.get(1)?),
        content: row.get(2)?,
        parent_id: row.get::<_, Option<String>>(3)?.map(CommentId),
        user_id: UserId(row.get(4)?),
        mentioned_username: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
        profiles,
        replies: Vec::new(),
    })
}

/// Microsecond RFC 3339 in UTC sorts lexicographically.
fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn to_sql_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[async_trait]
impl CommentRepository for SqliteStore {
    async fn find_reply_target(
        &self,
        id: &CommentId,
    ) -> Result<Option<ReplyTarget>, StoreError> {
        let conn = self.pool.get()?;

        let target = conn
            .query_row(
                "SELECT id, post_id, parent_id, user_id FROM comments WHERE id = ?1",
                params![id.as_str()],
                |row| {
                    Ok(ReplyTarget {
                        id: CommentId(row.get(0)?),
                        post_id: PostId(row.get(1)?),
                        parent_id: row.get::<_, Option<String>>(2)?.map(CommentId),
                        user_id: UserId(row.get(3)?),
                    })
                },
            )
            .optional()?;

        Ok(target)
    }

    async fn insert(&self, comment: &NewComment) -> Result<Comment, StoreError> {
        let conn = self.pool.get()?;
        let now = now_timestamp();

        conn.execute(
            "INSERT INTO comments
               (id, post_id, user_id, content, parent_id, mentioned_username, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                comment.id.as_str(),
                comment.post_id.as_str(),
                comment.user_id.as_str(),
                comment.content,
                comment.parent_id.as_ref().map(CommentId::as_str),
                comment.mentioned_username,
                now,
            ],
        )?;

        let stored = conn.query_row(
            &format!(
                "SELECT {COMMENT_COLUMNS} FROM comments c
                 LEFT JOIN profiles p ON p.id = c.user_id
                 WHERE c.id = ?1"
            ),
            params![comment.id.as_str()],
            comment_from_row,
        )?;

        Ok(stored)
    }

    async fn find(&self, id: &CommentId) -> Result<Option<Comment>, StoreError> {
        let conn = self.pool.get()?;

        let comment = conn
            .query_row(
                &format!(
                    "SELECT {COMMENT_COLUMNS} FROM comments c
                     LEFT JOIN profiles p ON p.id = c.user_id
                     WHERE c.id = ?1"
                ),
                params![id.as_str()],
                comment_from_row,
            )
            .optional()?;

        Ok(comment)
    }

    async fn count_top_level(&self, post_id: &PostId) -> Result<u64, StoreError> {
        let conn = self.pool.get()?;

        let total: i64 = conn.query_row(
            "SELECT COUNT(*) FROM comments WHERE post_id = ?1 AND parent_id IS NULL",
            params![post_id.as_str()],
            |row| row.get(0),
        )?;

        Ok(u64::try_from(total).unwrap_or(0))
    }

    async fn top_level_page(
        &self,
        post_id: &PostId,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<Comment>, StoreError> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments c
             LEFT JOIN profiles p ON p.id = c.user_id
             WHERE c.post_id = ?1 AND c.parent_id IS NULL
             ORDER BY c.created_at DESC, c.rowid DESC
             LIMIT ?2 OFFSET ?3"
        ))?;

        let comments = stmt
            .query_map(
                params![post_id.as_str(), i64::from(limit), to_sql_int(offset)],
                comment_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(comments)
    }

    async fn replies_of(&self, parent_id: &CommentId) -> Result<Vec<Comment>, StoreError> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments c
             LEFT JOIN profiles p ON p.id = c.user_id
             WHERE c.parent_id = ?1
             ORDER BY c.created_at ASC, c.rowid ASC"
        ))?;

        let replies = stmt
            .query_map(params![parent_id.as_str()], comment_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(replies)
    }

    async fn update_content(&self, id: &CommentId, content: &str) -> Result<bool, StoreError> {
        let conn = self.pool.get()?;

        let rows = conn.execute(
            "UPDATE comments SET content = ?2, updated_at = ?3 WHERE id = ?1",
            params![id.as_str(), content, now_timestamp()],
        )?;

        Ok(rows > 0)
    }

    async fn delete(&self, id: &CommentId) -> Result<u64, StoreError> {
        let conn = self.pool.get()?;

        let replies: i64 = conn.query_row(
            "SELECT COUNT(*) FROM comments WHERE parent_id = ?1",
            params![id.as_str()],
            |row| row.get(0),
        )?;
        let rows = conn.execute("DELETE FROM comments WHERE id = ?1", params![id.as_str()])?;

        if rows == 0 {
            return Ok(0);
        }
        Ok(rows as u64 + u64::try_from(replies).unwrap_or(0))
    }
}

#[async_trait]
impl ProfileRepository for SqliteStore {
    async fn find_profile(&self, user_id: &UserId) -> Result<Option<Profile>, StoreError> {
        let conn = self.pool.get()?;

        let profile = conn
            .query_row(
                "SELECT id, username, avatar_url FROM profiles WHERE id = ?1",
                params![user_id.as_str()],
                |row| {
                    Ok(Profile {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        avatar_url: row.get(2)?,
                    })
                },
            )
            .optional()?;

        Ok(profile)
    }
}
