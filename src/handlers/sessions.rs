//! Session maintenance endpoint

use crate::error::AppResult;
use crate::handlers::AppState;
use axum::{Json, extract::State};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub status: &'static str,
    pub cleaned_sessions: usize,
}

/// GET /cleanup-sessions
///
/// Removes histories whose session has expired.
pub async fn cleanup_handler(State(state): State<AppState>) -> AppResult<Json<CleanupResponse>> {
    let cleaned_sessions = state.sessions().cleanup_expired().await?;

    tracing::info!(cleaned_sessions = cleaned_sessions, "Session cleanup finished");

    Ok(Json(CleanupResponse {
        status: "success",
        cleaned_sessions,
    }))
}
