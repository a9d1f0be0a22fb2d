use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::app::AppState;

/// GET <prefix>/v1/health: 200 while the task store answers, 503 otherwise.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    if !state.engine.ping_store() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"message": "health check failed"})),
        );
    }
    (
        StatusCode::OK,
        Json(json!({
            "message": format!("{} is running", state.config.application),
            "version": env!("CARGO_PKG_VERSION"),
            "live_tasks": state.engine.timers().periodic_count(),
            "pending_waiters": state.engine.timers().waiter_count(),
        })),
    )
}
