//! GET /status - 수집 여부와 청크 수

use std::sync::Arc;

use axum::{extract::State, Json};

use crate::knowledge::PipelineStatus;
use crate::server::AppState;

/// Handler: GET /status
pub async fn status(State(state): State<Arc<AppState>>) -> Json<PipelineStatus> {
    Json(state.pipeline.status().await)
}
