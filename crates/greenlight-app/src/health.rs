use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

use crate::state::AppState;

pub async fn healthcheck(State(state): State<AppState>) -> impl IntoResponse {
    let config = state.config();
    Json(json!({
        "status": "available",
        "environment": config.environment,
        "version": config.version,
    }))
}
