use serde::{Deserialize, Serialize};

use crate::models::{Result, ServiceError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub port: u16,
    pub mongodb_uri: String,
    pub database_name: String,
    pub embeddings_service_url: String,
    pub tagging_service_url: String,
    pub tagging_api_key: Option<String>,
    pub tagging_model: String,
    pub catalog_api_version: String,
    pub catalog_page_size: usize,
    pub http_timeout_ms: u64,
    pub sync_parallelism: usize,
    pub default_top_n: usize,
}

impl Config {
    pub fn from_env() -> Self {
        let get = |k: &str| std::env::var(k).ok();

        let port: u16 = get("PORT").and_then(|s| s.parse().ok()).unwrap_or(8092);
        let mongodb_uri = get("MONGODB_URI").unwrap_or_else(|| "mongodb://localhost:27017".to_string());
        let database_name = get("DATABASE_NAME").unwrap_or_else(|| "recommendations".to_string());
        let embeddings_service_url =
            get("EMBEDDINGS_SERVICE_URL").unwrap_or_else(|| "http://localhost:8091".to_string());
        let tagging_service_url =
            get("TAGGING_SERVICE_URL").unwrap_or_else(|| "https://api.openai.com/v1".to_string());
        let tagging_api_key = get("TAGGING_API_KEY");
        let tagging_model = get("TAGGING_MODEL").unwrap_or_else(|| "gpt-4o".to_string());
        let catalog_api_version = get("CATALOG_API_VERSION").unwrap_or_else(|| "2024-07".to_string());
        let catalog_page_size: usize = get("CATALOG_PAGE_SIZE").and_then(|s| s.parse().ok()).unwrap_or(250);
        let http_timeout_ms: u64 = get("HTTP_TIMEOUT_MS").and_then(|s| s.parse().ok()).unwrap_or(30_000);
        let sync_parallelism: usize = get("SYNC_PARALLELISM").and_then(|s| s.parse().ok()).unwrap_or(4);
        let default_top_n: usize = get("DEFAULT_TOP_N").and_then(|s| s.parse().ok()).unwrap_or(1);

        Self {
            port,
            mongodb_uri,
            database_name,
            embeddings_service_url,
            tagging_service_url,
            tagging_api_key,
            tagging_model,
            catalog_api_version,
            catalog_page_size,
            http_timeout_ms,
            sync_parallelism,
            default_top_n,
        }
    }

    /// Startup validation; anything caught here would otherwise surface as a
    /// failed run later.
    pub fn validate(&self) -> Result<()> {
        if self.mongodb_uri.is_empty() {
            return Err(ServiceError::Config("MONGODB_URI must not be empty".to_string()));
        }
        if self.embeddings_service_url.is_empty() {
            return Err(ServiceError::Config("EMBEDDINGS_SERVICE_URL must not be empty".to_string()));
        }
        if self.tagging_api_key.is_none() {
            tracing::warn!("TAGGING_API_KEY is not set; category lookups will be unauthenticated");
        }
        Ok(())
    }
}
