//! User account API endpoints
//!
//! - GET  /api/v1/users/signup - Signup form description
//! - POST /api/v1/users/signup - Create an account
//! - POST /api/v1/users/login  - Exchange credentials for a session token
//! - POST /api/v1/users/logout - Delete the current session
//! - GET  /api/v1/users/me     - Current user

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use std::net::IpAddr;

use crate::api::middleware::{extract_session_token, ApiError, AppState, AuthenticatedUser};
use crate::models::User;
use crate::services::user::{signup_form, LoginInput, SignupInput, UserServiceError};

/// Response for successful authentication
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

impl From<UserServiceError> for ApiError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            UserServiceError::UserExists(msg) => ApiError::conflict(msg),
            UserServiceError::AuthenticationError(msg) => ApiError::unauthorized(msg),
            UserServiceError::InternalError(e) => ApiError::from(e),
        }
    }
}

/// Build public user routes (no auth required)
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/signup", get(get_signup_form).post(signup))
        .route("/login", post(login))
}

/// Build protected user routes (requires auth middleware)
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/logout", post(logout))
        .route("/me", get(get_current_user))
}

/// GET /api/v1/users/signup
async fn get_signup_form() -> Json<Value> {
    Json(signup_form())
}

/// POST /api/v1/users/signup
///
/// The first account becomes an admin.
async fn signup(
    State(state): State<AppState>,
    Json(body): Json<SignupInput>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.user_service.signup(body).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /api/v1/users/login
///
/// Rate limited per client IP and per username; failed attempts count
/// against the username until a successful login clears them.
async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<LoginInput>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(ip) = extract_ip_address(&headers) {
        if let Some(retry_after) = state.rate_limiter.ip_retry_after(ip).await {
            tracing::warn!("Login rate limit hit for IP {}", ip);
            return Err(ApiError::rate_limited(
                "Too many login requests, try again later",
                retry_after,
            ));
        }
        state.rate_limiter.record_ip_request(ip).await;
    }

    let username = body.username.trim().to_string();
    if let Some(retry_after) = state.rate_limiter.username_retry_after(&username).await {
        tracing::warn!("Login rate limit hit for username {}", username);
        return Err(ApiError::rate_limited(
            "Too many failed login attempts, try again later",
            retry_after,
        ));
    }

    let (user, session) = match state.user_service.login(body).await {
        Ok(result) => result,
        Err(UserServiceError::AuthenticationError(msg)) => {
            state.rate_limiter.record_failed_attempt(&username).await;
            tracing::info!("Failed login for {}", username);
            return Err(ApiError::unauthorized(msg));
        }
        Err(e) => return Err(e.into()),
    };

    state.rate_limiter.clear_username_attempts(&username).await;

    let cookie = format!(
        "session={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        session.id,
        (session.expires_at - session.created_at).num_seconds()
    );
    let mut response_headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        response_headers.insert(header::SET_COOKIE, value);
    }

    Ok((
        response_headers,
        Json(AuthResponse {
            user,
            token: session.id,
        }),
    ))
}

/// POST /api/v1/users/logout
async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(token) = extract_session_token(&headers) {
        state.user_service.logout(&token).await?;
    }

    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_static("session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"),
    );
    Ok((StatusCode::NO_CONTENT, response_headers))
}

/// GET /api/v1/users/me
async fn get_current_user(AuthenticatedUser(user): AuthenticatedUser) -> Json<User> {
    Json(user)
}

/// Client IP from the proxy headers
fn extract_ip_address(headers: &HeaderMap) -> Option<IpAddr> {
    if let Some(forwarded) = headers.get("x-forwarded-for") {
        if let Ok(forwarded_str) = forwarded.to_str() {
            if let Some(ip) = forwarded_str.split(',').next() {
                if let Ok(ip) = ip.trim().parse() {
                    return Some(ip);
                }
            }
        }
    }

    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_ip_address() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_ip_address(&headers), None);

        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        assert_eq!(extract_ip_address(&headers), "10.0.0.2".parse().ok());

        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.9, 10.0.0.1"));
        assert_eq!(extract_ip_address(&headers), "203.0.113.9".parse().ok());

        headers.insert("x-forwarded-for", HeaderValue::from_static("garbage"));
        assert_eq!(extract_ip_address(&headers), "10.0.0.2".parse().ok());
    }
}
