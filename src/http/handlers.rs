//! Git route handlers. Each one forwards to the session and returns its
//! envelope unchanged; the envelope picks the HTTP status.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use super::AppState;
use crate::git::{CommitRecord, CommitSummary, PullOutcome, StatusCounts};
use crate::session::{Envelope, MessageEnvelope, DEFAULT_BRANCH, DEFAULT_LOG_COUNT, DEFAULT_REMOTE};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AddRequest {
    pub files: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct CommitRequest {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct BranchRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct RemoteRequest {
    pub name: String,
    pub url: String,
}

/// Body of push and pull; both fields fall back to origin/main
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SyncRequest {
    pub remote: String,
    pub branch: String,
}

impl Default for SyncRequest {
    fn default() -> Self {
        Self {
            remote: DEFAULT_REMOTE.to_string(),
            branch: DEFAULT_BRANCH.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LogQuery {
    pub max_count: Option<usize>,
}

pub async fn init_repository(State(state): State<AppState>) -> MessageEnvelope {
    state.session.initialize().await
}

pub async fn stage_files(
    State(state): State<AppState>,
    body: Option<Json<AddRequest>>,
) -> MessageEnvelope {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    state.session.stage_files(request.files).await
}

pub async fn commit(
    State(state): State<AppState>,
    Json(request): Json<CommitRequest>,
) -> Envelope<CommitSummary> {
    state.session.commit(request.message).await
}

pub async fn status(State(state): State<AppState>) -> Envelope<StatusCounts> {
    state.session.get_status().await
}

pub async fn log(
    State(state): State<AppState>,
    Query(query): Query<LogQuery>,
) -> Envelope<Vec<CommitRecord>> {
    let max_count = query.max_count.unwrap_or(DEFAULT_LOG_COUNT);
    state.session.get_log(max_count).await
}

pub async fn list_branches(State(state): State<AppState>) -> Envelope<Vec<String>> {
    state.session.list_branches().await
}

pub async fn create_branch(
    State(state): State<AppState>,
    Json(request): Json<BranchRequest>,
) -> MessageEnvelope {
    state.session.create_branch(request.name).await
}

pub async fn add_remote(
    State(state): State<AppState>,
    Json(request): Json<RemoteRequest>,
) -> MessageEnvelope {
    state.session.add_remote(request.name, request.url).await
}

pub async fn push(
    State(state): State<AppState>,
    body: Option<Json<SyncRequest>>,
) -> MessageEnvelope {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    state.session.push(request.remote, request.branch).await
}

pub async fn pull(
    State(state): State<AppState>,
    body: Option<Json<SyncRequest>>,
) -> Envelope<PullOutcome> {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    state.session.pull(request.remote, request.branch).await
}
