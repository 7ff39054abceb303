//! HTTP layer for the gateway.
//!
//! Routes:
//! - `GET  /api/health`         - Health check
//! - `POST /api/git/init`       - Initialize the repository
//! - `POST /api/git/add`        - Stage files
//! - `POST /api/git/commit`     - Commit the index
//! - `GET  /api/git/status`     - Status counts
//! - `GET  /api/git/log`        - Commit history
//! - `GET  /api/git/branches`   - List branches
//! - `POST /api/git/branches`   - Create a branch
//! - `POST /api/git/remotes`    - Add a remote
//! - `POST /api/git/push`       - Push a branch
//! - `POST /api/git/pull`       - Pull a branch

pub mod handlers;
pub mod health;

use std::sync::Arc;

use axum::{
    extract::Request,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::git::ErrorKind;
use crate::session::{Envelope, RepositorySession};
use crate::telemetry::create_request_span;

/// State shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<RepositorySession>,
    pub service_name: Arc<str>,
}

impl AppState {
    pub fn new(session: Arc<RepositorySession>, service_name: impl Into<Arc<str>>) -> Self {
        Self {
            session,
            service_name: service_name.into(),
        }
    }
}

/// Build the axum [`Router`] with all HTTP routes and shared state.
pub fn create_router(state: AppState) -> Router {
    let git = Router::new()
        .route("/init", post(handlers::init_repository))
        .route("/add", post(handlers::stage_files))
        .route("/commit", post(handlers::commit))
        .route("/status", get(handlers::status))
        .route("/log", get(handlers::log))
        .route(
            "/branches",
            get(handlers::list_branches).post(handlers::create_branch),
        )
        .route("/remotes", post(handlers::add_remote))
        .route("/push", post(handlers::push))
        .route("/pull", post(handlers::pull));

    Router::new()
        .route("/api/health", get(health::health_handler))
        .nest("/api/git", git)
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            create_request_span(request.method().as_str(), request.uri().path())
        }))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// HTTP status for an error envelope
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::UnboundSession
        | ErrorKind::DuplicateName
        | ErrorKind::NothingToCommit
        | ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::RefNotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
        ErrorKind::TransportFailure => StatusCode::BAD_GATEWAY,
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::Corruption | ErrorKind::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        let status = match self.error_kind() {
            Some(kind) => status_for(kind),
            None => StatusCode::OK,
        };
        (status, Json(self)).into_response()
    }
}
