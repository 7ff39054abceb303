use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use super::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: String,
    pub version: &'static str,
}

/// `GET /api/health`
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let body = HealthResponse {
        status: "healthy",
        service: state.service_name.to_string(),
        version: env!("CARGO_PKG_VERSION"),
    };
    (StatusCode::OK, Json(body))
}
