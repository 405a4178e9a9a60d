//! Review API endpoints
//!
//! - GET    /api/v1/rooms/{id}/reviews         - Reviews and rating summary (auth)
//! - POST   /api/v1/rooms/{id}/reviews         - Write a review (auth)
//! - GET    /api/v1/rooms/{id}/reviews/summary - Rating summary (public)
//! - DELETE /api/v1/reviews/{id}               - Delete (author or admin)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{CreateReviewInput, RatingSummary, Review};
use crate::services::review::RoomReviews;
use crate::services::ReviewServiceError;

impl From<ReviewServiceError> for ApiError {
    fn from(err: ReviewServiceError) -> Self {
        match err {
            ReviewServiceError::NotFound(what) => ApiError::not_found(format!("{} not found", what)),
            ReviewServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            ReviewServiceError::Forbidden => {
                ApiError::forbidden("Not allowed to delete this review")
            }
            ReviewServiceError::InternalError(e) => ApiError::from(e),
        }
    }
}

pub fn public_router() -> Router<AppState> {
    Router::new().route("/rooms/{id}/reviews/summary", get(review_summary))
}

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/rooms/{id}/reviews", get(list_reviews).post(create_review))
        .route("/reviews/{id}", delete(delete_review))
}

/// GET /api/v1/rooms/{id}/reviews
async fn list_reviews(
    State(state): State<AppState>,
    Path(room_id): Path<i64>,
) -> Result<Json<RoomReviews>, ApiError> {
    Ok(Json(state.review_service.list(room_id).await?))
}

/// GET /api/v1/rooms/{id}/reviews/summary
async fn review_summary(
    State(state): State<AppState>,
    Path(room_id): Path<i64>,
) -> Result<Json<RatingSummary>, ApiError> {
    Ok(Json(state.review_service.summary(room_id).await?))
}

/// POST /api/v1/rooms/{id}/reviews
async fn create_review(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(room_id): Path<i64>,
    Json(body): Json<CreateReviewInput>,
) -> Result<(StatusCode, Json<Review>), ApiError> {
    let review = state.review_service.create(&user, room_id, body).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

/// DELETE /api/v1/reviews/{id}
async fn delete_review(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.review_service.delete(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
