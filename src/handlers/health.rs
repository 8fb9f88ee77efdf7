use axum::{extract::State, Json};

use crate::models::order::HealthResponse;
use crate::AppState;

/// Handler for GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let storage = if state.orders.storage_available() { "up" } else { "degraded" };
    Json(HealthResponse {
        status: "ok".to_string(),
        storage: storage.to_string(),
    })
}
