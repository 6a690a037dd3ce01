use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::json;

use appointment_cell::router::appointment_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "E-Booklet API is running!" }))
        .route(
            "/api/healthz",
            get(|| async { Json(json!({ "status": "ok" })) }),
        )
        .nest("/api/appointments", appointment_routes(state.clone()))
}
