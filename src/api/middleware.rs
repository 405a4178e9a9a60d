//! API middleware
//!
//! Contains:
//! - the shared application state
//! - the JSON error type every handler returns
//! - bearer-token authentication and admin authorization

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::Config;
use crate::db::repositories::{
    SqlxBookmarkRepository, SqlxCommentRepository, SqlxComparisonRepository, SqlxNewsRepository,
    SqlxNotificationRepository, SqlxPostRepository, SqlxReviewRepository, SqlxRoomRepository,
    SqlxSessionRepository, SqlxUserRepository,
};
use crate::db::SqlitePool;
use crate::models::{User, UserRole};
use crate::services::{
    BookmarkService, ChatCompletion, CommunityService, ComparisonService, LoginRateLimiter,
    NewsService, NotificationService, OpenAiChatClient, ReviewService, RoomService, UserService,
};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub user_service: Arc<UserService>,
    pub room_service: Arc<RoomService>,
    pub review_service: Arc<ReviewService>,
    pub bookmark_service: Arc<BookmarkService>,
    pub community_service: Arc<CommunityService>,
    pub notification_service: Arc<NotificationService>,
    pub news_service: Arc<NewsService>,
    pub comparison_service: Arc<ComparisonService>,
    pub rate_limiter: Arc<LoginRateLimiter>,
}

impl AppState {
    /// Wire repositories and services, using the configured AI provider
    pub fn new(pool: SqlitePool, config: &Config) -> anyhow::Result<Self> {
        let client = OpenAiChatClient::from_config(&config.ai)?
            .map(|client| Arc::new(client) as Arc<dyn ChatCompletion>);
        if client.is_none() {
            tracing::warn!("No AI API key configured; room comparison is disabled");
        }
        Ok(Self::with_chat_client(pool, config, client))
    }

    /// Wire repositories and services around an explicit chat client
    pub fn with_chat_client(
        pool: SqlitePool,
        config: &Config,
        client: Option<Arc<dyn ChatCompletion>>,
    ) -> Self {
        let user_repo = SqlxUserRepository::boxed(pool.clone());
        let session_repo = SqlxSessionRepository::boxed(pool.clone());
        let room_repo = SqlxRoomRepository::boxed(pool.clone());
        let review_repo = SqlxReviewRepository::boxed(pool.clone());
        let bookmark_repo = SqlxBookmarkRepository::boxed(pool.clone());
        let notification_repo = SqlxNotificationRepository::boxed(pool.clone());

        let community_service = CommunityService::new(
            SqlxPostRepository::boxed(pool.clone()),
            SqlxCommentRepository::boxed(pool.clone()),
            notification_repo.clone(),
        )
        .with_report_hide_threshold(config.community.report_hide_threshold);

        let comparison_service = ComparisonService::new(
            room_repo.clone(),
            SqlxComparisonRepository::boxed(pool.clone()),
            bookmark_repo.clone(),
            client,
            config.ai.market_data_path.clone(),
        );

        Self {
            user_service: Arc::new(UserService::with_session_days(
                user_repo,
                session_repo,
                config.auth.session_days,
            )),
            room_service: Arc::new(RoomService::new(room_repo.clone(), review_repo.clone())),
            review_service: Arc::new(ReviewService::new(review_repo, room_repo.clone())),
            bookmark_service: Arc::new(BookmarkService::new(bookmark_repo, room_repo)),
            community_service: Arc::new(community_service),
            notification_service: Arc::new(NotificationService::new(notification_repo)),
            news_service: Arc::new(NewsService::new(SqlxNewsRepository::boxed(pool.clone()))),
            comparison_service: Arc::new(comparison_service),
            rate_limiter: Arc::new(LoginRateLimiter::new()),
            pool,
        }
    }
}

/// Authenticated user extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn rate_limited(message: impl Into<String>, retry_after: i64) -> Self {
        Self::with_details(
            "RATE_LIMIT",
            message,
            serde_json::json!({ "retry_after": retry_after }),
        )
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new("SERVICE_UNAVAILABLE", message)
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new("BAD_GATEWAY", message)
    }

    /// Log the cause and hide it from the client
    pub fn internal(err: impl std::fmt::Display) -> Self {
        tracing::error!("Internal error: {}", err);
        Self::new("INTERNAL_ERROR", "Internal server error")
    }

    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            "RATE_LIMIT" => StatusCode::TOO_MANY_REQUESTS,
            "SERVICE_UNAVAILABLE" => StatusCode::SERVICE_UNAVAILABLE,
            "BAD_GATEWAY" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal(format!("{:#}", err))
    }
}

/// Session token from `Authorization: Bearer` or the `session` cookie
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                let token = token.trim();
                if !token.is_empty() {
                    return Some(token.to_string());
                }
            }
        }
    }

    if let Some(cookie_header) = headers.get(header::COOKIE) {
        if let Ok(cookie_str) = cookie_header.to_str() {
            for cookie in cookie_str.split(';') {
                if let Some(token) = cookie.trim().strip_prefix("session=") {
                    return Some(token.to_string());
                }
            }
        }
    }

    None
}

/// Authentication middleware
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_session_token(request.headers())
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    let user = state
        .user_service
        .validate_session(&token)
        .await
        .map_err(ApiError::internal)?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired session"))?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

/// Admin authorization middleware; runs after [`require_auth`]
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    if user.0.role != UserRole::Admin {
        return Err(ApiError::forbidden("Admin privileges required"));
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::conflict("x").status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::rate_limited("x", 30).status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(ApiError::service_unavailable("x").status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(ApiError::bad_gateway("x").status(), StatusCode::BAD_GATEWAY);
        assert_eq!(ApiError::new("SOMETHING", "x").status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_internal_error_hides_cause() {
        let err = ApiError::from(anyhow::anyhow!("database is locked"));
        assert_eq!(err.error.code, "INTERNAL_ERROR");
        assert!(!err.error.message.contains("locked"));
    }

    #[test]
    fn test_extract_session_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_session_token(&headers), None);

        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; session=abc"));
        assert_eq!(extract_session_token(&headers).as_deref(), Some("abc"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer tok-1"));
        assert_eq!(extract_session_token(&headers).as_deref(), Some("tok-1"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic xyz"));
        assert_eq!(extract_session_token(&headers).as_deref(), Some("abc"));
    }
}
