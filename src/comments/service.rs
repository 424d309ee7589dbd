use std::sync::Arc;

use futures::future::join_all;
use thiserror::Error;

use crate::comments::domain::{
    non_blank, place, Comment, CommentId, NewComment, Placement, PlacementError, PostId, UserId,
};
use crate::comments::pagination::{CommentPage, PageRequest};
use crate::comments::repository::{CommentRepository, ProfileRepository, StoreError};
use crate::config::CommentsConfig;

#[derive(Debug, Error)]
pub enum CommentError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Parent comment belongs to a different post")]
    PostMismatch,

    #[error("You can only change your own comments")]
    Forbidden,

    #[error("{0}")]
    Storage(#[from] StoreError),
}

/// Raw writer input, as decoded from the request body.
#[derive(Debug, Clone, Default)]
pub struct CreateComment {
    pub post_id: Option<String>,
    pub content: Option<String>,
    pub parent_id: Option<String>,
    pub mentioned_username: Option<String>,
}

/// Writer and reader for threaded comments.
#[derive(Clone)]
pub struct CommentService {
    comments: Arc<dyn CommentRepository>,
    profiles: Arc<dyn ProfileRepository>,
    limits: CommentsConfig,
}

impl CommentService {
    pub fn new(
        comments: Arc<dyn CommentRepository>,
        profiles: Arc<dyn ProfileRepository>,
        limits: CommentsConfig,
    ) -> Self {
        Self {
            comments,
            profiles,
            limits,
        }
    }

    pub fn limits(&self) -> &CommentsConfig {
        &self.limits
    }

    /// Store a new comment or reply authored by `author`.
    pub async fn create(&self, author: &UserId, input: CreateComment) -> Result<Comment, CommentError> {
        let post_id = non_blank(input.post_id.as_deref()).map(PostId);
        let content = non_blank(input.content.as_deref());
        let (Some(post_id), Some(content)) = (post_id, content) else {
            return Err(CommentError::InvalidInput(
                "postId and content are required".into(),
            ));
        };
        self.check_length(&content)?;

        let target = match non_blank(input.parent_id.as_deref()).map(CommentId) {
            Some(parent_id) => Some(
                self.comments
                    .find_reply_target(&parent_id)
                    .await?
                    .ok_or_else(|| CommentError::NotFound("Parent comment not found".into()))?,
            ),
            None => None,
        };

        let placement = place(&post_id, target.as_ref()).map_err(|e| match e {
            PlacementError::PostMismatch => CommentError::PostMismatch,
        })?;

        // A collapsed reply still addresses the author it was written to.
        let mentioned_username = match (non_blank(input.mentioned_username.as_deref()), &placement) {
            (Some(name), _) => Some(name),
            (
                None,
                Placement::Reply {
                    reparented_from: Some(parent_author),
                    ..
                },
            ) => self
                .profiles
                .find_profile(parent_author)
                .await?
                .map(|p| p.username),
            (None, _) => None,
        };

        let new_comment = NewComment {
            id: CommentId::generate(),
            post_id,
            user_id: author.clone(),
            content,
            parent_id: placement.parent_id().cloned(),
            mentioned_username,
        };

        let stored = self.comments.insert(&new_comment).await?;
        tracing::info!(
            comment_id = %stored.id,
            post_id = %stored.post_id,
            parent_id = ?stored.parent_id.as_ref().map(CommentId::as_str),
            reparented = placement.is_reparented(),
            "Comment created"
        );

        Ok(stored)
    }

    /// One page of top-level comments for `post_id`, each with all its replies.
    pub async fn list(
        &self,
        post_id: Option<&str>,
        page: PageRequest,
    ) -> Result<CommentPage, CommentError> {
        let post_id = non_blank(post_id)
            .map(PostId)
            .ok_or_else(|| CommentError::InvalidInput("postId is required".into()))?;

        let total = self.comments.count_top_level(&post_id).await?;
        let mut comments = self
            .comments
            .top_level_page(&post_id, page.offset(), page.limit)
            .await?;

        // Replies are read after the page, so a reply written in between may
        // or may not show up. Fine for a thread display.
        let replies = join_all(comments.iter().map(|c| self.replies_or_empty(&c.id))).await;
        for (comment, replies) in comments.iter_mut().zip(replies) {
            comment.replies = replies;
        }

        tracing::debug!(
            post_id = %post_id,
            page = page.page,
            returned = comments.len(),
            total,
            "Listed comments"
        );

        Ok(CommentPage {
            comments,
            total,
            page: page.page,
            limit: page.limit,
            has_more: page.has_more(total),
        })
    }

    /// Replace the body of a comment owned by `author`.
    pub async fn edit(
        &self,
        author: &UserId,
        id: &CommentId,
        content: Option<&str>,
    ) -> Result<Comment, CommentError> {
        let content = non_blank(content)
            .ok_or_else(|| CommentError::InvalidInput("content is required".into()))?;
        self.check_length(&content)?;

        self.owned(author, id).await?;
        self.comments.update_content(id, &content).await?;

        let mut updated = self
            .comments
            .find(id)
            .await?
            .ok_or_else(|| CommentError::NotFound("Comment not found".into()))?;
        if updated.is_top_level() {
            updated.replies = self.comments.replies_of(id).await?;
        }

        tracing::info!(comment_id = %id, "Comment edited");
        Ok(updated)
    }

    /// Delete a comment owned by `author`, together with its replies.
    pub async fn delete(&self, author: &UserId, id: &CommentId) -> Result<u64, CommentError> {
        self.owned(author, id).await?;
        let removed = self.comments.delete(id).await?;
        tracing::info!(comment_id = %id, removed, "Comment deleted");
        Ok(removed)
    }

    async fn owned(&self, author: &UserId, id: &CommentId) -> Result<Comment, CommentError> {
        let existing = self
            .comments
            .find(id)
            .await?
            .ok_or_else(|| CommentError::NotFound("Comment not found".into()))?;
        if &existing.user_id != author {
            return Err(CommentError::Forbidden);
        }
        Ok(existing)
    }

    async fn replies_or_empty(&self, id: &CommentId) -> Vec<Comment> {
        match self.comments.replies_of(id).await {
            Ok(replies) => replies,
            Err(e) => {
                tracing::warn!(comment_id = %id, "Failed to load replies: {}", e);
                Vec::new()
            }
        }
    }

    fn check_length(&self, content: &str) -> Result<(), CommentError> {
        let max = self.limits.max_content_length;
        if content.chars().count() > max {
            return Err(CommentError::InvalidInput(format!(
                "Comment must be {} characters or less",
                max
            )));
        }
        Ok(())
    }
}
