#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use tokio::sync::RwLock;

use recommendations_service::clients::{CatalogClient, Categorizer, EmbeddingProvider};
use recommendations_service::config::Config;
use recommendations_service::models::*;
use recommendations_service::storage::CatalogStore;

/// In-memory store mirroring the MongoDB implementation's upsert semantics:
/// records live in insertion order and upserts replace in place, so catalog
/// order survives repeated runs.
#[derive(Default)]
pub struct InMemoryStore {
    pub products: RwLock<Vec<ProductRecord>>,
    pub variants: RwLock<Vec<VariantRecord>>,
    pub statuses: RwLock<HashMap<String, SyncStatus>>,
    pub status_history: RwLock<Vec<(String, SyncStatus)>>,
    pub fail_writes: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn product_exists(&self, shop: &str, product_id: &str) -> Result<bool> {
        let products = self.products.read().await;
        Ok(products.iter().any(|p| p.shop == shop && p.product_id == product_id))
    }

    async fn upsert_product(&self, record: &ProductRecord) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ServiceError::Transient("store write failed".to_string()));
        }
        let mut products = self.products.write().await;
        match products
            .iter_mut()
            .find(|p| p.shop == record.shop && p.product_id == record.product_id)
        {
            Some(existing) => *existing = record.clone(),
            None => products.push(record.clone()),
        }
        Ok(())
    }

    async fn upsert_variant(&self, record: &VariantRecord) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ServiceError::Transient("store write failed".to_string()));
        }
        let mut variants = self.variants.write().await;
        match variants.iter_mut().find(|v| v.variant_id == record.variant_id) {
            Some(existing) => *existing = record.clone(),
            None => variants.push(record.clone()),
        }
        Ok(())
    }

    async fn set_shop_status(&self, shop: &str, status: SyncStatus) -> Result<()> {
        self.statuses.write().await.insert(shop.to_string(), status);
        self.status_history.write().await.push((shop.to_string(), status));
        Ok(())
    }

    async fn get_shop_status(&self, shop: &str) -> Result<SyncStatus> {
        Ok(self
            .statuses
            .read()
            .await
            .get(shop)
            .copied()
            .unwrap_or(SyncStatus::Pending))
    }

    async fn products_by_shop_and_type(
        &self,
        shop: &str,
        item_type: &str,
    ) -> Result<Vec<ProductWithVariants>> {
        let products = self.products.read().await;
        let variants = self.variants.read().await;
        Ok(products
            .iter()
            .filter(|p| p.shop == shop && p.category.as_deref() == Some(item_type))
            .map(|product| ProductWithVariants {
                product: product.clone(),
                variants: variants
                    .iter()
                    .filter(|v| v.product_id == product.product_id)
                    .cloned()
                    .collect(),
            })
            .collect())
    }
}

/// Counting embedding stub with configurable failures.
pub struct StubEmbeddings {
    pub text_vector: Vec<f32>,
    pub image_vector: Vec<f32>,
    pub text_calls: AtomicUsize,
    pub image_calls: AtomicUsize,
    pub image_urls: StdMutex<Vec<String>>,
    pub fail_text_containing: Option<String>,
    pub fail_image_url: Option<String>,
}

impl StubEmbeddings {
    pub fn returning(text_vector: Vec<f32>, image_vector: Vec<f32>) -> Self {
        Self {
            text_vector,
            image_vector,
            text_calls: AtomicUsize::new(0),
            image_calls: AtomicUsize::new(0),
            image_urls: StdMutex::new(Vec::new()),
            fail_text_containing: None,
            fail_image_url: None,
        }
    }

    pub fn seen_image_urls(&self) -> Vec<String> {
        self.image_urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmbeddingProvider for StubEmbeddings {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        self.text_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(marker) = &self.fail_text_containing {
            if text.contains(marker) {
                return Err(ServiceError::Transient("text model unavailable".to_string()));
            }
        }
        Ok(self.text_vector.clone())
    }

    async fn embed_image(&self, image_url: &str) -> Result<Vec<f32>> {
        self.image_calls.fetch_add(1, Ordering::SeqCst);
        self.image_urls.lock().unwrap().push(image_url.to_string());
        if self.fail_image_url.as_deref() == Some(image_url) {
            return Err(ServiceError::Transient("image model unavailable".to_string()));
        }
        Ok(self.image_vector.clone())
    }
}

/// Categorizer stub; titles listed in `fail_titles` error out.
pub struct StubCategorizer {
    pub category: Option<String>,
    pub fail_titles: Vec<String>,
    pub calls: AtomicUsize,
}

impl StubCategorizer {
    pub fn returning(category: &str) -> Self {
        Self {
            category: Some(category.to_string()),
            fail_titles: Vec::new(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Categorizer for StubCategorizer {
    async fn categorize(&self, title: &str, _description: &str) -> Result<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_titles.iter().any(|t| t == title) {
            return Err(ServiceError::Transient("tagging service unavailable".to_string()));
        }
        Ok(self.category.clone())
    }
}

pub fn test_config() -> Config {
    Config {
        port: 0,
        mongodb_uri: "mongodb://localhost:27017".to_string(),
        database_name: "recommendations_test".to_string(),
        embeddings_service_url: "http://127.0.0.1:1".to_string(),
        tagging_service_url: "http://127.0.0.1:1".to_string(),
        tagging_api_key: None,
        tagging_model: "test-model".to_string(),
        catalog_api_version: "2024-07".to_string(),
        catalog_page_size: 250,
        http_timeout_ms: 2_000,
        sync_parallelism: 4,
        default_top_n: 1,
    }
}

pub fn test_catalog_client() -> CatalogClient {
    let cfg = test_config();
    CatalogClient::new(cfg.catalog_api_version, cfg.catalog_page_size, cfg.http_timeout_ms)
}

pub fn catalog_variant(id: &str, image: Option<&str>) -> CatalogVariant {
    CatalogVariant {
        id: id.to_string(),
        title: Some(format!("{} title", id)),
        price: Some(serde_json::json!("19.99")),
        inventory_quantity: Some(5),
        image: image.map(|url| ImageRef { url: url.to_string() }),
        selected_options: vec![SelectedOption { name: "Size".to_string(), value: "M".to_string() }],
    }
}

pub fn catalog_product(
    id: &str,
    title: &str,
    description: &str,
    featured_image: Option<&str>,
    variants: Vec<CatalogVariant>,
) -> CatalogProduct {
    CatalogProduct {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        online_store_url: Some(format!("https://shop.example/products/{}", id)),
        total_inventory: Some(10),
        price_range: Some(serde_json::json!({ "maxVariantPrice": { "amount": "19.99" } })),
        featured_image: featured_image.map(|url| ImageRef { url: url.to_string() }),
        variants: Connection::from_nodes(variants),
    }
}

pub fn product_record(shop: &str, product_id: &str, category: &str, text_embedding: Vec<f32>) -> ProductRecord {
    ProductRecord {
        shop: shop.to_string(),
        product_id: product_id.to_string(),
        content: ProductContent {
            title: format!("{} title", product_id),
            description: String::new(),
            online_store_url: None,
            feature_image: None,
            price_range: None,
        },
        category: Some(category.to_string()),
        text_embedding,
    }
}

pub fn variant_record(product_id: &str, variant_id: &str, image_embedding: Vec<f32>) -> VariantRecord {
    VariantRecord {
        product_id: product_id.to_string(),
        variant_id: variant_id.to_string(),
        content: serde_json::json!({ "id": variant_id }),
        image_embedding,
    }
}
