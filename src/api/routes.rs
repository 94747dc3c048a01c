use axum::Router;
use tower_http::trace::TraceLayer;

use super::health::health_routes;
use super::training_logs::training_log_routes;
use crate::auth::{cors_layer, JwtService};
use crate::config::StorageBackend;
use crate::services::TrainingLogService;

pub fn create_routes(
    training_log_service: TrainingLogService,
    jwt_service: JwtService,
    storage: StorageBackend,
) -> Router {
    Router::new()
        .merge(health_routes(storage))
        .nest(
            "/api/training-logs",
            training_log_routes(training_log_service, jwt_service),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
}
