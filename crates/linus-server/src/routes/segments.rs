//! Segment submission and per-segment history.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::state::AppState;
use crate::views::{SegmentBatch, SegmentBatchResponse, SegmentLogView};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/segments", post(post_segments))
        .route("/segments/{segment_id}/log", get(get_segment_log))
}

/// POST /api/segments: classify and file a batch of segments.
async fn post_segments(
    State(state): State<Arc<AppState>>,
    Json(batch): Json<SegmentBatch>,
) -> Json<SegmentBatchResponse> {
    Json(state.service.post_segments(batch).await)
}

/// GET /api/segments/{segment_id}/log: decision history for a segment.
async fn get_segment_log(
    State(state): State<Arc<AppState>>,
    Path(segment_id): Path<String>,
) -> Json<SegmentLogView> {
    Json(state.service.get_segment_log(&segment_id))
}
