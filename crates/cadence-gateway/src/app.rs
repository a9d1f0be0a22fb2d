use std::sync::Arc;

use axum::{
    routing::{get, patch, post},
    Router,
};
use cadence_core::config::CadenceConfig;
use cadence_scheduler::SchedulerEngine;

use crate::http::{health, tasks};

/// Central shared state, passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub config: CadenceConfig,
    pub engine: SchedulerEngine,
}

impl AppState {
    pub fn new(config: CadenceConfig, engine: SchedulerEngine) -> Self {
        Self { config, engine }
    }
}

/// `<prefix>/v1` with stray slashes removed, e.g. `/scheduler/v1`.
pub fn api_base(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/v1".to_string()
    } else {
        format!("/{trimmed}/v1")
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/health", get(health::health_handler))
        .route("/restart", post(tasks::restart))
        .route("/task", post(tasks::insert))
        .route("/task/{id}", get(tasks::get_one).delete(tasks::delete))
        .route("/task/{id}/toggle", patch(tasks::toggle))
        .route("/task/{id}/execute", post(tasks::execute_now));

    Router::new()
        .nest(&api_base(&state.config.gateway.prefix), api)
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
