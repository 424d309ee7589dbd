pub mod domain;
pub mod pagination;
pub mod repository;
pub mod service;

pub use domain::{Comment, CommentId, PostId, UserId};
pub use pagination::{CommentPage, PageRequest};
pub use repository::{CommentRepository, ProfileRepository, SqliteStore, StoreError};
pub use service::{CommentError, CommentService, CreateComment};
