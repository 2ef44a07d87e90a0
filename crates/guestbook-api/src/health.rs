use axum::{extract::State, Json};
use chrono::Utc;

use guestbook_types::api::HealthResponse;

use crate::error::ApiError;
use crate::AppState;

/// GET /health — liveness probe that also touches the database, so a
/// wedged store shows up here instead of only on real traffic.
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let db = state.clone();
    tokio::task::spawn_blocking(move || db.db.ping())
        .await
        .map_err(|e| anyhow::anyhow!("blocking task failed: {e}"))??;

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        time: Utc::now(),
    }))
}
