//! Health check
//!
//! - GET /api/v1/health - Liveness plus a database round trip

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::api::middleware::AppState;
use crate::db;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub version: &'static str,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(health))
}

/// GET /api/v1/health
///
/// Always 200; a failing database shows up as `database: "error"`.
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match db::ping(&state.pool).await {
        Ok(()) => "ok",
        Err(e) => {
            tracing::warn!("Health check database ping failed: {:#}", e);
            "error"
        }
    };

    Json(HealthResponse {
        status: "ok",
        database,
        version: env!("CARGO_PKG_VERSION"),
    })
}
