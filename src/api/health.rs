use axum::{extract::State, response::Json, routing::get, Router};
use serde_json::{json, Value};

use crate::config::StorageBackend;

pub fn health_routes(storage: StorageBackend) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .with_state(storage)
}

/// Liveness check; needs no token
pub async fn health_check(State(storage): State<StorageBackend>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "training-log",
        "version": env!("CARGO_PKG_VERSION"),
        "storage": storage.as_str(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}
