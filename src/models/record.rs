use serde::{Deserialize, Serialize};

use crate::models::CatalogProduct;

/// The slice of product content we persist alongside the embedding. Treated
/// as an opaque blob by the ranking side; only the sync pipeline builds it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductContent {
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub online_store_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_range: Option<serde_json::Value>,
}

impl From<&CatalogProduct> for ProductContent {
    fn from(product: &CatalogProduct) -> Self {
        Self {
            title: product.title.clone(),
            description: product.description.clone(),
            online_store_url: product.online_store_url.clone(),
            feature_image: product.featured_image.as_ref().map(|image| image.url.clone()),
            price_range: product.price_range.clone(),
        }
    }
}

/// Persisted product row. Identity is `(shop, product_id)`; content is
/// mutable, identity is not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductRecord {
    pub shop: String,
    pub product_id: String,
    pub content: ProductContent,
    pub category: Option<String>,
    pub text_embedding: Vec<f32>,
}

/// Persisted variant row, keyed by `variant_id` and owned by exactly one
/// product. An empty `image_embedding` marks a failed or unresolvable image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantRecord {
    pub product_id: String,
    pub variant_id: String,
    pub content: serde_json::Value,
    pub image_embedding: Vec<f32>,
}

/// Read-side shape returned by the store for ranking: a product with its
/// variants assembled, in catalog order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductWithVariants {
    pub product: ProductRecord,
    pub variants: Vec<VariantRecord>,
}
