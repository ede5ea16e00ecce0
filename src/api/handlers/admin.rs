use axum::{extract::State, http::StatusCode, response::IntoResponse};
use log;
use std::sync::Arc;

use super::AppState;

/// Kicks off an immediate matching sweep without waiting for the periodic
/// one. Work runs in the background; the request returns right away.
pub async fn trigger_sweep(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    tokio::spawn(async move {
        log::info!("Admin triggered sweep started");
        match state.sweep.process_pending_games() {
            Ok(summary) => log::info!(
                "Admin triggered sweep completed: {} assigned, {} emergency, {} unmatched",
                summary.assigned,
                summary.emergency,
                summary.unmatched
            ),
            Err(e) => log::error!("Admin triggered sweep failed: {:?}", e),
        }
    });

    (StatusCode::ACCEPTED, "Sweep triggered").into_response()
}
