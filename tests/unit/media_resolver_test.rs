use serde_json::json;
use training_log::models::MeasurementType;
use training_log::services::{ExerciseMediaResolver, HttpMediaResolver};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::*;

#[cfg(test)]
mod media_resolver_tests {
    use super::*;

    #[tokio::test]
    async fn test_generated_image_is_cached() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/images"))
            .and(body_json(json!({
                "key": "push-ups",
                "name": "push ups",
                "instructions": "How to do push-ups"
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "url": "https://cdn.example.com/push-ups.png" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let resolver = HttpMediaResolver::new(Some(format!("{}/images", server.uri()))).unwrap();
        assert_eq!(resolver.find_cached_image("push-ups"), None);

        resolver
            .request_image_generation(exercise("push-ups", MeasurementType::None, 3))
            .await
            .unwrap();

        assert_eq!(
            resolver.find_cached_image("push-ups").as_deref(),
            Some("https://cdn.example.com/push-ups.png")
        );
    }

    #[tokio::test]
    async fn test_provider_error_leaves_cache_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let resolver = HttpMediaResolver::new(Some(server.uri())).unwrap();
        let result = resolver
            .request_image_generation(exercise("plank", MeasurementType::Duration, 1))
            .await;

        assert!(result.is_err());
        assert_eq!(resolver.find_cached_image("plank"), None);
    }

    #[tokio::test]
    async fn test_without_endpoint_nothing_is_requested() {
        let resolver = HttpMediaResolver::new(None)
            .unwrap()
            .with_cached([("squat".to_string(), "/img/squat.png".to_string())]);

        resolver
            .request_image_generation(exercise("lunge", MeasurementType::None, 1))
            .await
            .unwrap();

        assert_eq!(resolver.find_cached_image("squat").as_deref(), Some("/img/squat.png"));
        assert_eq!(resolver.find_cached_image("lunge"), None);
    }
}
