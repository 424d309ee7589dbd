// Domain types and the reply-threading rules. No I/O in here.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::db::models::Profile;

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_id!(CommentId);
string_id!(PostId);
string_id!(UserId);

impl CommentId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }
}

/// A comment as returned to clients, with its author profile and direct replies.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,
    pub content: String,
    pub parent_id: Option<CommentId>,
    pub user_id: UserId,
    pub mentioned_username: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub profiles: Option<Profile>,
    pub replies: Vec<Comment>,
}

impl Comment {
    pub fn is_top_level(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// The fields of a referenced parent that threading needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyTarget {
    pub id: CommentId,
    pub post_id: PostId,
    pub parent_id: Option<CommentId>,
    pub user_id: UserId,
}

/// A fully resolved row ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub id: CommentId,
    pub post_id: PostId,
    pub user_id: UserId,
    pub content: String,
    pub parent_id: Option<CommentId>,
    pub mentioned_username: Option<String>,
}

/// Where a new comment lands in the two-level thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    TopLevel,
    Reply {
        parent_id: CommentId,
        /// Author of the reply that was collapsed away, if any.
        reparented_from: Option<UserId>,
    },
}

impl Placement {
    pub fn parent_id(&self) -> Option<&CommentId> {
        match self {
            Placement::TopLevel => None,
            Placement::Reply { parent_id, .. } => Some(parent_id),
        }
    }

    pub fn is_reparented(&self) -> bool {
        matches!(
            self,
            Placement::Reply {
                reparented_from: Some(_),
                ..
            }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementError {
    PostMismatch,
}

/// Place a comment on `post_id` replying to `target`.
///
/// Replies to a reply are moved up to the thread's top-level comment so
/// stored threads never exceed two levels.
pub fn place(post_id: &PostId, target: Option<&ReplyTarget>) -> Result<Placement, PlacementError> {
    let Some(target) = target else {
        return Ok(Placement::TopLevel);
    };

    if &target.post_id != post_id {
        return Err(PlacementError::PostMismatch);
    }

    Ok(match &target.parent_id {
        Some(top_level) => Placement::Reply {
            parent_id: top_level.clone(),
            reparented_from: Some(target.user_id.clone()),
        },
        None => Placement::Reply {
            parent_id: target.id.clone(),
            reparented_from: None,
        },
    })
}

/// Trim optional text input; blank counts as absent.
pub fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
