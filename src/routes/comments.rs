use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::{Json, Router};
use serde::Deserialize;

use crate::comments::{Comment, CommentId, CommentPage, CreateComment, PageRequest};
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::state::AppState;

// --- Request bodies ---

#[derive(Deserialize)]
pub struct CreateCommentBody {
    #[serde(rename = "postId")]
    pub post_id: Option<String>,
    pub content: Option<String>,
    #[serde(rename = "parentId")]
    pub parent_id: Option<String>,
    pub mentioned_username: Option<String>,
}

#[derive(Deserialize)]
pub struct ListCommentsQuery {
    #[serde(rename = "postId")]
    pub post_id: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Deserialize)]
pub struct EditCommentBody {
    pub content: Option<String>,
}

// --- Router ---

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/comments", get(list_comments).post(create_comment))
        .route(
            "/api/comments/{id}",
            patch(edit_comment).delete(delete_comment),
        )
}

// --- Handlers ---

async fn create_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    body: Result<Json<CreateCommentBody>, JsonRejection>,
) -> AppResult<Json<Comment>> {
    let Json(body) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let comment = state
        .comment_service()
        .create(
            &user.id,
            CreateComment {
                post_id: body.post_id,
                content: body.content,
                parent_id: body.parent_id,
                mentioned_username: body.mentioned_username,
            },
        )
        .await?;

    Ok(Json(comment))
}

async fn list_comments(
    State(state): State<AppState>,
    Query(query): Query<ListCommentsQuery>,
) -> AppResult<Json<CommentPage>> {
    let service = state.comment_service();
    if query.post_id.as_deref().map_or(true, |p| p.trim().is_empty()) {
        return Err(AppError::BadRequest("postId is required".into()));
    }
    let page = PageRequest::parse(
        query.page.as_deref(),
        query.limit.as_deref(),
        service.limits(),
    )
    .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let page = service.list(query.post_id.as_deref(), page).await?;
    Ok(Json(page))
}

async fn edit_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    body: Result<Json<EditCommentBody>, JsonRejection>,
) -> AppResult<Json<Comment>> {
    let Json(body) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let comment = state
        .comment_service()
        .edit(&user.id, &CommentId(id), body.content.as_deref())
        .await?;

    Ok(Json(comment))
}

async fn delete_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state
        .comment_service()
        .delete(&user.id, &CommentId(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
