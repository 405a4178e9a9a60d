//! Bookmark API endpoints (all require auth)
//!
//! - GET  /api/v1/bookmarks                  - Paged bookmarks, newest first
//! - POST /api/v1/bookmarks/{room_id}/toggle - Add or remove a bookmark

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::common::PageResponse;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::BookmarkEntry;
use crate::services::BookmarkServiceError;

impl From<BookmarkServiceError> for ApiError {
    fn from(err: BookmarkServiceError) -> Self {
        match err {
            BookmarkServiceError::NotFound => ApiError::not_found("Room not found"),
            BookmarkServiceError::InternalError(e) => ApiError::from(e),
        }
    }
}

/// Bookmark pages default to 6 entries, unlike the other lists
#[derive(Debug, Default, Deserialize)]
pub struct BookmarkQuery {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub page_size: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub bookmarked: bool,
    pub room_id: i64,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_bookmarks))
        .route("/{room_id}/toggle", post(toggle_bookmark))
}

/// GET /api/v1/bookmarks
async fn list_bookmarks(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(query): Query<BookmarkQuery>,
) -> Result<Json<PageResponse<BookmarkEntry>>, ApiError> {
    let bookmarks = state
        .bookmark_service
        .list(user.id, query.page, query.page_size)
        .await?;
    Ok(Json(bookmarks.into()))
}

/// POST /api/v1/bookmarks/{room_id}/toggle
///
/// 201 when the bookmark was created, 200 when it was removed.
async fn toggle_bookmark(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(room_id): Path<i64>,
) -> Result<(StatusCode, Json<ToggleResponse>), ApiError> {
    let bookmarked = state.bookmark_service.toggle(user.id, room_id).await?;
    let status = if bookmarked {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(ToggleResponse { bookmarked, room_id })))
}
