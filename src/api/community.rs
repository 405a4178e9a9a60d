//! Community board API endpoints
//!
//! Public:
//! - GET /api/v1/community/categories
//! - GET /api/v1/community/posts                 - Paged list (?category=&q=)
//! - GET /api/v1/community/posts/{id}
//! - GET /api/v1/community/posts/{id}/comments   - Threaded comments
//!
//! Auth required:
//! - POST          /api/v1/community/posts
//! - PUT/PATCH     /api/v1/community/posts/{id}  - Author only
//! - DELETE        /api/v1/community/posts/{id}  - Author or admin
//! - POST          /api/v1/community/posts/{id}/comments
//! - DELETE        /api/v1/community/comments/{id}
//! - POST          /api/v1/community/posts/{id}/like
//! - POST          /api/v1/community/comments/{id}/like
//! - POST          /api/v1/community/posts/{id}/report
//! - POST          /api/v1/community/comments/{id}/report

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::api::common::{default_page, default_page_size, non_blank, PageResponse};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{
    Comment, CommentWithMeta, CommunityCategory, CreateCommentInput, CreatePostInput, LikeStatus,
    ListParams, PostFilter, PostWithMeta, ReportInput, ReportOutcome, UpdatePostInput,
    MAX_PAGE_SIZE,
};
use crate::services::CommunityServiceError;

impl From<CommunityServiceError> for ApiError {
    fn from(err: CommunityServiceError) -> Self {
        match err {
            CommunityServiceError::NotFound(what) => {
                ApiError::not_found(format!("{} not found", what))
            }
            CommunityServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            CommunityServiceError::Forbidden(msg) => ApiError::forbidden(msg),
            CommunityServiceError::Conflict(msg) => ApiError::conflict(msg),
            CommunityServiceError::InternalError(e) => ApiError::from(e),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PostListQuery {
    /// Category slug
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories))
        .route("/posts", get(list_posts))
        .route("/posts/{id}", get(get_post))
        .route("/posts/{id}/comments", get(list_comments))
}

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/posts", post(create_post))
        .route(
            "/posts/{id}",
            axum::routing::put(update_post)
                .patch(update_post)
                .delete(delete_post),
        )
        .route("/posts/{id}/comments", post(create_comment))
        .route("/posts/{id}/like", post(like_post))
        .route("/posts/{id}/report", post(report_post))
        .route("/comments/{id}", delete(delete_comment))
        .route("/comments/{id}/like", post(like_comment))
        .route("/comments/{id}/report", post(report_comment))
}

/// GET /api/v1/community/categories
async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<CommunityCategory>>, ApiError> {
    Ok(Json(state.community_service.categories().await?))
}

/// GET /api/v1/community/posts
async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<PostListQuery>,
) -> Result<Json<PageResponse<PostWithMeta>>, ApiError> {
    let filter = PostFilter {
        category: non_blank(query.category),
        query: non_blank(query.q),
    };
    let params = ListParams::with_max(query.page, query.page_size, MAX_PAGE_SIZE);
    let posts = state.community_service.list_posts(&filter, &params).await?;
    Ok(Json(posts.into()))
}

/// GET /api/v1/community/posts/{id}
async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PostWithMeta>, ApiError> {
    Ok(Json(state.community_service.get_post(id).await?))
}

/// POST /api/v1/community/posts
async fn create_post(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(body): Json<CreatePostInput>,
) -> Result<(StatusCode, Json<PostWithMeta>), ApiError> {
    let post = state.community_service.create_post(&user, body).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

/// PUT|PATCH /api/v1/community/posts/{id}
async fn update_post(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdatePostInput>,
) -> Result<Json<PostWithMeta>, ApiError> {
    Ok(Json(state.community_service.update_post(&user, id, body).await?))
}

/// DELETE /api/v1/community/posts/{id}
async fn delete_post(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.community_service.delete_post(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/community/posts/{id}/comments
async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<Json<Vec<CommentWithMeta>>, ApiError> {
    Ok(Json(state.community_service.comments(post_id).await?))
}

/// POST /api/v1/community/posts/{id}/comments
async fn create_comment(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(post_id): Path<i64>,
    Json(body): Json<CreateCommentInput>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    let comment = state
        .community_service
        .create_comment(&user, post_id, body)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// DELETE /api/v1/community/comments/{id}
async fn delete_comment(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.community_service.delete_comment(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/community/posts/{id}/like
async fn like_post(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<LikeStatus>, ApiError> {
    Ok(Json(state.community_service.like_post(&user, id).await?))
}

/// POST /api/v1/community/comments/{id}/like
async fn like_comment(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<LikeStatus>, ApiError> {
    Ok(Json(state.community_service.like_comment(&user, id).await?))
}

/// POST /api/v1/community/posts/{id}/report
async fn report_post(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<ReportInput>,
) -> Result<(StatusCode, Json<ReportOutcome>), ApiError> {
    let outcome = state.community_service.report_post(&user, id, body).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// POST /api/v1/community/comments/{id}/report
async fn report_comment(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<ReportInput>,
) -> Result<(StatusCode, Json<ReportOutcome>), ApiError> {
    let outcome = state
        .community_service
        .report_comment(&user, id, body)
        .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}
