use async_trait::async_trait;
use reqwest::Client;

use crate::models::{Result, ServiceError};

/// Fixed-dimension vector source for product text and variant images.
///
/// Implementations may wrap a remote model service or a local model; the
/// sync and ranking engines only require a fixed-length float vector per
/// call, and image lookups may be cached by the caller.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>>;
    async fn embed_image(&self, image_url: &str) -> Result<Vec<f32>>;
}

/// HTTP client for the embeddings model service.
#[derive(Clone)]
pub struct EmbeddingsServiceClient {
    client: Client,
    base_url: String,
}

impl EmbeddingsServiceClient {
    pub fn new(base_url: String, timeout_ms: u64) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_millis(timeout_ms))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, base_url }
    }

    async fn post_for_vector(&self, path: &str, body: serde_json::Value) -> Result<Vec<f32>> {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            let message = format!("embeddings service error: status={} body={}", status, text);
            // 5xx and throttling are retryable; anything else means the
            // input itself was rejected.
            return if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                Err(ServiceError::Transient(message))
            } else {
                Err(ServiceError::Validation(message))
            };
        }

        let vector: Vec<f32> = response.json().await.map_err(|e| {
            ServiceError::Validation(format!("embeddings service returned a malformed vector: {}", e))
        })?;
        if vector.is_empty() {
            return Err(ServiceError::Validation(
                "embeddings service returned an empty vector".to_string(),
            ));
        }
        Ok(vector)
    }
}

#[async_trait]
impl EmbeddingProvider for EmbeddingsServiceClient {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        self.post_for_vector("/embed-text", serde_json::json!({ "description": text }))
            .await
    }

    async fn embed_image(&self, image_url: &str) -> Result<Vec<f32>> {
        self.post_for_vector("/embed-image", serde_json::json!({ "imageUrl": image_url }))
            .await
    }
}
