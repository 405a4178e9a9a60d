//! Room API endpoints
//!
//! Public:
//! - GET /api/v1/rooms               - Paged list, newest first
//! - GET /api/v1/rooms/search        - Search by text and room type
//! - GET /api/v1/rooms/stats         - Aggregate statistics
//! - GET /api/v1/rooms/{id}          - Detail with images and ratings
//!
//! Admin:
//! - POST   /api/v1/rooms            - Create
//! - PUT    /api/v1/rooms/{id}       - Full replace
//! - PATCH  /api/v1/rooms/{id}       - Partial update
//! - DELETE /api/v1/rooms/{id}       - Delete
//! - POST   /api/v1/rooms/import     - Bulk import of scraped listings

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::common::{default_page, default_page_size, non_blank, PageResponse, PaginationQuery};
use crate::api::middleware::{ApiError, AppState};
use crate::models::{
    ListParams, Room, RoomImportSummary, RoomInput, RoomPatch, RoomSearch, MAX_PAGE_SIZE,
};
use crate::services::room::{RoomDetail, RoomStats};
use crate::services::{ImportError, RoomServiceError};

impl From<RoomServiceError> for ApiError {
    fn from(err: RoomServiceError) -> Self {
        match err {
            RoomServiceError::NotFound => ApiError::not_found("Room not found"),
            RoomServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            RoomServiceError::Import(ImportError::InvalidRecord { index, message }) => {
                ApiError::with_details(
                    "VALIDATION_ERROR",
                    format!("Record {}: {}", index, message),
                    serde_json::json!({ "index": index }),
                )
            }
            RoomServiceError::Import(e) => ApiError::validation_error(e.to_string()),
            RoomServiceError::InternalError(e) => ApiError::from(e),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub room_type: Option<String>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    #[serde(flatten)]
    pub page: PageResponse<Room>,
    /// Trimmed query, empty when absent
    pub search_query: String,
    pub room_type: String,
    pub filters_applied: FiltersApplied,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct FiltersApplied {
    pub search_query: bool,
    pub room_type: bool,
}

impl SearchResponse {
    fn new(page: PageResponse<Room>, search: RoomSearch) -> Self {
        Self {
            page,
            filters_applied: FiltersApplied {
                search_query: search.query.is_some(),
                room_type: search.room_type.is_some(),
            },
            search_query: search.query.unwrap_or_default(),
            room_type: search.room_type.unwrap_or_default(),
        }
    }
}

/// Public room routes
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_rooms))
        .route("/search", get(search_rooms))
        .route("/stats", get(room_stats))
        .route("/{id}", get(get_room))
}

/// Admin room routes
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_room))
        .route("/import", post(import_rooms))
        .route(
            "/{id}",
            axum::routing::put(replace_room)
                .patch(patch_room)
                .delete(delete_room),
        )
}

/// GET /api/v1/rooms
async fn list_rooms(
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<PageResponse<Room>>, ApiError> {
    let rooms = state.room_service.list(&query.params()).await?;
    Ok(Json(rooms.into()))
}

/// GET /api/v1/rooms/search?q=&room_type=
async fn search_rooms(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, ApiError> {
    let search = RoomSearch {
        query: non_blank(query.q),
        room_type: non_blank(query.room_type),
    };
    let params = ListParams::with_max(query.page, query.page_size, MAX_PAGE_SIZE);
    let rooms = state.room_service.search(&search, &params).await?;

    Ok(Json(SearchResponse::new(rooms.into(), search)))
}

/// GET /api/v1/rooms/stats
async fn room_stats(State(state): State<AppState>) -> Result<Json<RoomStats>, ApiError> {
    Ok(Json(state.room_service.stats().await?))
}

/// GET /api/v1/rooms/{id}
async fn get_room(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<RoomDetail>, ApiError> {
    Ok(Json(state.room_service.detail(id).await?))
}

/// POST /api/v1/rooms
async fn create_room(
    State(state): State<AppState>,
    Json(body): Json<RoomInput>,
) -> Result<impl IntoResponse, ApiError> {
    let room = state.room_service.create(body).await?;
    Ok((StatusCode::CREATED, Json(room)))
}

/// PUT /api/v1/rooms/{id}
async fn replace_room(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<RoomInput>,
) -> Result<Json<Room>, ApiError> {
    Ok(Json(state.room_service.replace(id, body).await?))
}

/// PATCH /api/v1/rooms/{id}
async fn patch_room(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<RoomPatch>,
) -> Result<Json<Room>, ApiError> {
    Ok(Json(state.room_service.patch(id, body).await?))
}

/// DELETE /api/v1/rooms/{id}
async fn delete_room(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.room_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/rooms/import
///
/// Accepts a listing array or an object wrapping one under
/// `items`, `data` or `results`.
async fn import_rooms(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<RoomImportSummary>), ApiError> {
    let summary = state.room_service.import(&body).await?;
    Ok((StatusCode::CREATED, Json(summary)))
}
