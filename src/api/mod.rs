//! API layer - HTTP handlers and routing
//!
//! This module contains all HTTP API endpoints for the Roomnest backend.
//! It includes:
//! - User account endpoints
//! - Room listing, search, stats and import endpoints
//! - Review and bookmark endpoints
//! - Community board, notification and news endpoints
//! - AI room comparison endpoints
//! - Health check

pub mod ai;
pub mod auth;
pub mod bookmarks;
pub mod common;
pub mod community;
pub mod health;
pub mod middleware;
pub mod news;
pub mod notifications;
pub mod reviews;
pub mod rooms;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

pub use middleware::{ApiError, AppState, AuthenticatedUser};

/// Build the main API router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Admin routes (need admin role)
    let admin_routes = Router::new()
        .nest("/rooms", rooms::admin_router())
        .route_layer(axum_middleware::from_fn(middleware::require_admin))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Protected routes (need auth but not admin)
    let protected_routes = Router::new()
        .nest("/users", auth::protected_router())
        .nest("/bookmarks", bookmarks::router())
        .nest("/community", community::protected_router())
        .nest("/community/notifications", notifications::router())
        .nest("/ai", ai::router())
        .merge(reviews::protected_router())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Public routes
    Router::new()
        .nest("/health", health::router())
        .nest("/users", auth::public_router())
        .nest("/rooms", rooms::public_router())
        .nest("/community", community::public_router())
        .nest("/community/news", news::router())
        .merge(reviews::public_router())
        .merge(admin_routes)
        .merge(protected_routes)
}

/// CORS policy; an unparsable origin falls back to any origin
fn cors_layer(cors_origin: &str) -> CorsLayer {
    let origin = match cors_origin.parse::<HeaderValue>() {
        Ok(value) if cors_origin != "*" => AllowOrigin::exact(value),
        Ok(_) => AllowOrigin::mirror_request(),
        Err(e) => {
            tracing::warn!("Invalid CORS origin {:?}: {}; allowing any origin", cors_origin, e);
            AllowOrigin::mirror_request()
        }
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
        .allow_credentials(true)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    // Middleware stack (outermost first)
    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors_layer(cors_origin));

    Router::new()
        .nest("/api/v1", build_api_router(state.clone()))
        .layer(middleware)
        .with_state(state)
}
