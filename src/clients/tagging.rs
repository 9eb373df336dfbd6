use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::models::{Result, ServiceError};

/// Structured-tag generator: derives a categorical label for a product from
/// its title and description. `Ok(None)` means the service answered but the
/// payload failed validation; the caller degrades to an uncategorized
/// product in both the `Ok(None)` and `Err` cases.
#[async_trait]
pub trait Categorizer: Send + Sync {
    async fn categorize(&self, title: &str, description: &str) -> Result<Option<String>>;
}

const CATEGORY_PROMPT: &str = "Categorize a product given the title and description.\n\
    The response should be a JSON object with a single field: productCategory (string).";

/// Expected shape of the generated payload. Anything that does not parse
/// into this is treated as a validation failure, never a crash.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CategoryPayload {
    product_category: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// HTTP client for a chat-completions style tagging service.
#[derive(Clone)]
pub struct TaggingServiceClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl TaggingServiceClient {
    pub fn new(base_url: String, api_key: Option<String>, model: String, timeout_ms: u64) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_millis(timeout_ms))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, base_url, api_key, model }
    }
}

#[async_trait]
impl Categorizer for TaggingServiceClient {
    async fn categorize(&self, title: &str, description: &str) -> Result<Option<String>> {
        let body = serde_json::json!({
            "model": self.model,
            "response_format": { "type": "json_object" },
            "messages": [{
                "role": "system",
                "content": format!("{}\nProduct info: {} - {}", CATEGORY_PROMPT, title, description),
            }],
        });

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let mut request = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            let message = format!("tagging service error: status={} body={}", status, text);
            return if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                Err(ServiceError::Transient(message))
            } else {
                Err(ServiceError::Validation(message))
            };
        }

        let completion: ChatCompletionResponse = response.json().await.map_err(|e| {
            ServiceError::Validation(format!("tagging service returned a malformed response: {}", e))
        })?;

        let content = completion
            .choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
            .unwrap_or_default();

        match serde_json::from_str::<CategoryPayload>(content) {
            Ok(payload) => Ok(Some(payload.product_category)),
            Err(e) => {
                tracing::warn!(
                    title = %title,
                    error = %e,
                    "tag payload failed schema validation; leaving product uncategorized"
                );
                Ok(None)
            }
        }
    }
}
