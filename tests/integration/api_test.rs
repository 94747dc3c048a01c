use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use training_log::api::routes::create_routes;
use training_log::auth::JwtService;
use training_log::config::StorageBackend;
use training_log::models::*;

use crate::common::*;

const TEST_SECRET: &str = "integration_test_secret";

#[cfg(test)]
mod api_integration_tests {
    use super::*;

    struct TestApp {
        router: Router,
        harness: TestHarness,
        token: String,
    }

    impl TestApp {
        fn new() -> Self {
            let harness = TestHarness::new();
            let jwt_service = JwtService::new(TEST_SECRET);
            let token = jwt_service.create_access_token(harness.user_id).unwrap();
            let router = create_routes(harness.service.clone(), jwt_service, StorageBackend::Memory);
            Self { router, harness, token }
        }

        async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
            self.send_as(&self.token, method, uri, body).await
        }

        async fn send_as(
            &self,
            token: &str,
            method: Method,
            uri: &str,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let builder = Request::builder()
                .method(method)
                .uri(uri)
                .header(header::AUTHORIZATION, format!("Bearer {}", token));
            let request = match body {
                Some(body) => builder
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };

            let response = self.router.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let value = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, value)
        }

        async fn start(&self, plan_id: Uuid) -> Value {
            let (status, body) = self
                .send(
                    Method::POST,
                    "/api/training-logs",
                    Some(json!({ "plan_id": plan_id, "weekday": 1 })),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED);
            body
        }
    }

    #[tokio::test]
    async fn test_health_check_is_public() {
        let app = TestApp::new();
        let response = app
            .router
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["service"], "training-log");
        assert_eq!(body["storage"], "memory");
    }

    #[tokio::test]
    async fn test_missing_or_bad_token_is_unauthorized() {
        let app = TestApp::new();

        let request = Request::builder()
            .uri("/api/training-logs")
            .body(Body::empty())
            .unwrap();
        let response = app.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let forged = JwtService::new("another_secret")
            .create_access_token(app.harness.user_id)
            .unwrap();
        let (status, _) = app
            .send_as(&forged, Method::GET, "/api/training-logs", None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_full_session_over_http() {
        let app = TestApp::new();
        let plan = app.harness.plan(vec![uniform_day(1, &[2])]).await;

        let log = app.start(plan.id).await;
        assert_eq!(log["status"], "in-progress");
        assert!(log.get("version").is_none());
        let log_id = log["id"].as_str().unwrap().to_string();
        let exercise_id = log["exercises"][0]["id"].as_str().unwrap().to_string();

        let (status, next) = app
            .send(Method::GET, &format!("/api/training-logs/{}/next", log_id), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(next["status"], "in-progress");
        assert_eq!(next["set_number"], 1);
        assert_eq!(next["total_sets"], 2);

        let complete_uri = |set: usize| {
            format!(
                "/api/training-logs/{}/exercises/{}/sets/{}/complete",
                log_id, exercise_id, set
            )
        };

        let (status, next) = app
            .send(
                Method::POST,
                &complete_uri(0),
                Some(json!({ "repetitions": 12, "difficulty": "easy" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(next["set_index"], 1);
        assert_eq!(next["is_last_set_in_exercise"], true);

        let (status, error) = app
            .send(Method::POST, &complete_uri(0), Some(json!({})))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(error["error"], "already_completed");

        let (status, done) = app
            .send(Method::POST, &complete_uri(1), Some(json!({})))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(done["status"], "completed");
        assert_eq!(done["total_duration_minutes"], 0);

        let (status, finished) = app
            .send(
                Method::POST,
                &format!("/api/training-logs/{}/complete", log_id),
                Some(json!({ "total_duration": 1500, "rating": 5 })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(finished["status"], "completed");
        assert_eq!(finished["total_duration"], 1500);
        assert_eq!(finished["exercises"][0]["difficulty"], "easy");
        assert_eq!(finished["exercises"][0]["sets"][0]["repetitions"], 12);

        let (status, stats) = app.send(Method::GET, "/api/training-logs/stats", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stats["completed_sessions"], 1);
        assert_eq!(stats["last_plan_name"], "Strength block");

        let (status, analysis) = app
            .send(Method::GET, &format!("/api/training-logs/{}/analysis", log_id), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(analysis["training_log"]["id"], log_id.as_str());
        assert_eq!(analysis["previous"], json!([]));
    }

    #[tokio::test]
    async fn test_preview_and_last_session_queries() {
        let app = TestApp::new();
        let plan = app.harness.plan(vec![uniform_day(1, &[1, 1])]).await;

        let (status, preview) = app
            .send(
                Method::GET,
                &format!("/api/training-logs/preview?plan_id={}&weekday=1", plan.id),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(preview["status"], "preview");
        assert_eq!(preview["exercises"].as_array().unwrap().len(), 2);

        let last_uri = format!("/api/training-logs/last?plan_id={}&weekday=1", plan.id);
        let (_, last) = app.send(Method::GET, &last_uri, None).await;
        assert_eq!(last, json!({ "result": "none" }));

        let log = app.start(plan.id).await;
        app.harness.clock.advance(chrono::Duration::minutes(45));

        let (status, last) = app.send(Method::GET, &last_uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(last["result"], "expired");
        assert_eq!(last["training_log_id"], log["id"]);
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let app = TestApp::new();
        let plan = app.harness.plan(vec![uniform_day(1, &[1])]).await;

        let (status, error) = app
            .send(
                Method::POST,
                "/api/training-logs",
                Some(json!({ "plan_id": plan.id, "weekday": 0 })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error["error"], "invalid_input");

        let (status, _) = app
            .send(
                Method::POST,
                "/api/training-logs",
                Some(json!({ "plan_id": Uuid::new_v4(), "weekday": 1 })),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let log = app.start(plan.id).await;
        let log_id = log["id"].as_str().unwrap();

        let (status, error) = app
            .send(
                Method::PUT,
                &format!("/api/training-logs/{}/status", log_id),
                Some(json!({ "status": "preview" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error["error"], "invalid_input");

        let (status, updated) = app
            .send(
                Method::PUT,
                &format!("/api/training-logs/{}/status", log_id),
                Some(json!({ "status": "canceled" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["status"], "canceled");

        let (status, error) = app
            .send(Method::GET, &format!("/api/training-logs/{}/next", log_id), None)
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(error["error"], "invalid_state");

        // Another user's log is indistinguishable from a missing one
        let stranger = JwtService::new(TEST_SECRET)
            .create_access_token(Uuid::new_v4())
            .unwrap();
        let (status, error) = app
            .send_as(&stranger, Method::GET, &format!("/api/training-logs/{}", log_id), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(error["error"], "not_found");

        let (status, body) = app
            .send(Method::DELETE, &format!("/api/training-logs/{}", log_id), None)
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(body, Value::Null);
        assert!(app.harness.logs.is_empty().await);
    }

    #[tokio::test]
    async fn test_malformed_identifiers_are_invalid_input() {
        let app = TestApp::new();
        let plan = app.harness.plan(vec![uniform_day(1, &[1])]).await;

        let (status, error) = app
            .send(Method::GET, "/api/training-logs/not-a-uuid", None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error["error"], "invalid_input");

        let (status, error) = app
            .send(
                Method::POST,
                "/api/training-logs",
                Some(json!({ "plan_id": plan.id, "weekday": 300 })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error["error"], "invalid_input");

        let (status, error) = app
            .send(
                Method::GET,
                &format!("/api/training-logs/last?plan_id={}&weekday=9999", plan.id),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error["error"], "invalid_input");

        let log = app.start(plan.id).await;
        let (status, error) = app
            .send(
                Method::POST,
                &format!(
                    "/api/training-logs/{}/exercises/{}/sets/first/complete",
                    log["id"].as_str().unwrap(),
                    log["exercises"][0]["id"].as_str().unwrap()
                ),
                Some(json!({})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error["error"], "invalid_input");

        let log_id = Uuid::parse_str(log["id"].as_str().unwrap()).unwrap();
        let stored = app.harness.stored(log_id).await;
        assert!(!stored.exercises[0].sets[0].completed);
    }

    #[tokio::test]
    async fn test_update_set_endpoint() {
        let app = TestApp::new();
        let plan = app
            .harness
            .plan(vec![day(1, vec![exercise("row", MeasurementType::Weight, 1)])])
            .await;
        let log = app.start(plan.id).await;

        let (status, updated) = app
            .send(
                Method::PATCH,
                &format!(
                    "/api/training-logs/{}/exercises/{}/sets/0",
                    log["id"].as_str().unwrap(),
                    log["exercises"][0]["id"].as_str().unwrap()
                ),
                Some(json!({ "weight": 32.5 })),
            )
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["exercises"][0]["sets"][0]["weight"], 32.5);
        assert_eq!(updated["exercises"][0]["sets"][0]["completed"], false);
    }
}
