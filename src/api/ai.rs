//! AI room comparison API endpoints (all require auth)
//!
//! - POST /api/v1/ai/compare          - Compare two rooms and store the report
//! - GET  /api/v1/ai/history          - The caller's reports, newest first
//! - GET  /api/v1/ai/reports/{id}     - One of the caller's reports
//! - GET  /api/v1/ai/bookmarked-rooms - Candidates for comparison

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::services::comparison::{BookmarkedRooms, ComparisonResult, ReportSummary};
use crate::services::{CompareInput, ComparisonServiceError};

impl From<ComparisonServiceError> for ApiError {
    fn from(err: ComparisonServiceError) -> Self {
        match err {
            ComparisonServiceError::NotFound(what) => {
                ApiError::not_found(format!("{} not found", what))
            }
            ComparisonServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            ComparisonServiceError::NotConfigured => {
                ApiError::service_unavailable("AI comparison is not configured")
            }
            ComparisonServiceError::Upstream(msg) => {
                tracing::error!("AI provider failure: {}", msg);
                ApiError::bad_gateway("AI provider request failed")
            }
            ComparisonServiceError::InternalError(e) => ApiError::from(e),
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/compare", post(compare_rooms))
        .route("/history", get(history))
        .route("/reports/{id}", get(get_report))
        .route("/bookmarked-rooms", get(bookmarked_rooms))
}

/// POST /api/v1/ai/compare
async fn compare_rooms(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(body): Json<CompareInput>,
) -> Result<(StatusCode, Json<ComparisonResult>), ApiError> {
    let result = state.comparison_service.compare(user.id, body).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

/// GET /api/v1/ai/history
async fn history(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<Vec<ReportSummary>>, ApiError> {
    Ok(Json(state.comparison_service.history(user.id).await?))
}

/// GET /api/v1/ai/reports/{id}
async fn get_report(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<ComparisonResult>, ApiError> {
    Ok(Json(state.comparison_service.get_report(user.id, id).await?))
}

/// GET /api/v1/ai/bookmarked-rooms
async fn bookmarked_rooms(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<BookmarkedRooms>, ApiError> {
    Ok(Json(state.comparison_service.bookmarked_rooms(user.id).await?))
}
