//! Grid reads and full-state export.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use linus_core::TopicId;
use linus_store::StateDocument;

use crate::state::AppState;
use crate::views::AllGridsView;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/grids", get(get_all_grids))
        .route("/grids/{grid_id}", get(get_grid))
        .route("/state", get(export_state))
}

/// GET /api/grids: every cell, ordered by grid id.
async fn get_all_grids(State(state): State<Arc<AppState>>) -> Json<AllGridsView> {
    Json(state.service.get_all_grids())
}

/// GET /api/grids/{grid_id}: one cell, 404 when unknown.
async fn get_grid(State(state): State<Arc<AppState>>, Path(grid_id): Path<String>) -> Response {
    let found = grid_id
        .trim()
        .parse::<TopicId>()
        .ok()
        .and_then(|id| state.service.get_grid(id).ok());

    match found {
        Some(view) => Json(view).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": "grid not found"})),
        )
            .into_response(),
    }
}

/// GET /api/state: the document the store would write.
async fn export_state(State(state): State<Arc<AppState>>) -> Json<StateDocument> {
    Json(state.service.export_state())
}
