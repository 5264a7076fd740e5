//! Health check endpoint
//!
//! Provides a simple health check for monitoring and load balancers.

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

use crate::handlers::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: &'static str,
    /// Number of loaded question/answer pairs (0 when the load failed)
    pub knowledge_base_entries: usize,
    /// Number of configured credential profiles
    pub credential_profiles: usize,
}

/// Health check handler
///
/// Always 200 OK. An empty knowledge base is reported, not treated as unhealthy.
pub async fn handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "OK",
            knowledge_base_entries: state.router().knowledge().len(),
            credential_profiles: state.config().credentials.len(),
        }),
    )
}
