//! Notification API endpoints (all require auth)
//!
//! - GET  /api/v1/community/notifications/unread - Unread, newest first
//! - POST /api/v1/community/notifications/read   - Mark listed (or all) read

use axum::{
    body::Bytes,
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::Notification;

#[derive(Debug, Default, Deserialize)]
pub struct MarkReadRequest {
    /// Omitted means every unread notification
    #[serde(default)]
    pub ids: Option<Vec<i64>>,
}

#[derive(Debug, Serialize)]
pub struct MarkReadResponse {
    pub updated: u64,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/unread", get(list_unread))
        .route("/read", post(mark_read))
}

/// GET /api/v1/community/notifications/unread
async fn list_unread(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<Vec<Notification>>, ApiError> {
    Ok(Json(state.notification_service.unread(user.id).await?))
}

/// POST /api/v1/community/notifications/read
///
/// An empty body marks everything read.
async fn mark_read(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    body: Bytes,
) -> Result<Json<MarkReadResponse>, ApiError> {
    let request = parse_request(&body)?;
    let updated = state
        .notification_service
        .mark_read(user.id, request.ids.as_deref())
        .await?;
    Ok(Json(MarkReadResponse { updated }))
}

fn parse_request(body: &[u8]) -> Result<MarkReadRequest, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(MarkReadRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError::validation_error(format!("Invalid request body: {}", e)))
}
