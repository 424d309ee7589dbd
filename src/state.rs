use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::auth::SessionRepository;
use crate::comments::repository::{CommentRepository, ProfileRepository, SqliteStore};
use crate::comments::CommentService;
use crate::config::Config;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Everything a request handler needs, passed in explicitly.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub comments: Arc<dyn CommentRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
    pub sessions: Arc<dyn SessionRepository>,
}

impl AppState {
    /// Wire every repository to the same SQLite pool.
    pub fn sqlite(db: DbPool, config: Config) -> Self {
        let store = Arc::new(SqliteStore::new(db.clone()));
        Self {
            db,
            config,
            comments: store.clone(),
            profiles: store.clone(),
            sessions: store,
        }
    }

    pub fn comment_service(&self) -> CommentService {
        CommentService::new(
            self.comments.clone(),
            self.profiles.clone(),
            self.config.comments,
        )
    }
}
