use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use std::time::Duration;
use tracing::{debug, info};

use crate::models::ExerciseTemplate;

/// Supplies exercise images by exercise key
#[async_trait]
pub trait ExerciseMediaResolver: Send + Sync {
    /// Fast lookup; never performs I/O
    fn find_cached_image(&self, exercise_key: &str) -> Option<String>;

    /// Produce an image for the exercise. Callers run this detached.
    async fn request_image_generation(&self, exercise: ExerciseTemplate) -> Result<()>;
}

#[derive(Debug, Serialize)]
struct ImageGenerationRequest<'a> {
    key: &'a str,
    name: &'a str,
    instructions: &'a str,
}

#[derive(Debug, Deserialize)]
struct ImageGenerationResponse {
    url: String,
}

/// Resolver with an in-process URL cache that asks an HTTP image generation
/// endpoint for images it has not seen yet.
pub struct HttpMediaResolver {
    client: reqwest::Client,
    endpoint: Option<String>,
    cache: RwLock<HashMap<String, String>>,
    in_flight: RwLock<HashSet<String>>,
}

impl std::fmt::Debug for HttpMediaResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpMediaResolver")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl HttpMediaResolver {
    pub fn new(endpoint: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to build image generation HTTP client")?;

        Ok(Self {
            client,
            endpoint,
            cache: RwLock::new(HashMap::new()),
            in_flight: RwLock::new(HashSet::new()),
        })
    }

    pub fn with_cached(self, entries: impl IntoIterator<Item = (String, String)>) -> Self {
        if let Ok(mut cache) = self.cache.write() {
            cache.extend(entries);
        }
        self
    }

    /// Returns false when a generation for `key` is already running
    fn begin(&self, key: &str) -> bool {
        self.in_flight
            .write()
            .map(|mut in_flight| in_flight.insert(key.to_string()))
            .unwrap_or(false)
    }

    fn finish(&self, key: &str) {
        if let Ok(mut in_flight) = self.in_flight.write() {
            in_flight.remove(key);
        }
    }

    async fn generate(&self, endpoint: &str, exercise: &ExerciseTemplate) -> Result<String> {
        let response = self
            .client
            .post(endpoint)
            .json(&ImageGenerationRequest {
                key: &exercise.key,
                name: &exercise.name,
                instructions: &exercise.instructions,
            })
            .send()
            .await
            .context("Image generation request failed")?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Image generation for '{}' returned {}",
                exercise.key,
                response.status()
            ));
        }

        let body: ImageGenerationResponse = response
            .json()
            .await
            .context("Image generation response was not understood")?;
        Ok(body.url)
    }
}

#[async_trait]
impl ExerciseMediaResolver for HttpMediaResolver {
    fn find_cached_image(&self, exercise_key: &str) -> Option<String> {
        self.cache
            .read()
            .ok()
            .and_then(|cache| cache.get(exercise_key).cloned())
    }

    async fn request_image_generation(&self, exercise: ExerciseTemplate) -> Result<()> {
        let Some(endpoint) = self.endpoint.as_deref() else {
            debug!(exercise_key = %exercise.key, "No image generation endpoint configured");
            return Ok(());
        };

        if !self.begin(&exercise.key) {
            debug!(exercise_key = %exercise.key, "Image generation already in flight");
            return Ok(());
        }

        let result = self.generate(endpoint, &exercise).await;
        self.finish(&exercise.key);

        let url = result?;
        info!(exercise_key = %exercise.key, url = %url, "Generated exercise image");
        self.cache
            .write()
            .map_err(|_| anyhow!("Image cache lock poisoned"))?
            .insert(exercise.key, url);
        Ok(())
    }
}
