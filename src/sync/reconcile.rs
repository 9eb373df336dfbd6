use crate::clients::EmbeddingProvider;
use crate::models::{CatalogProduct, CatalogVariant, ServiceError, VariantRecord};
use crate::sync::EmbeddingCache;

/// Outcome of normalizing one catalog variant: the persistable record, plus
/// the embedding failure (if any) for the run's error list. Persistence
/// decisions stay with the synchronizer.
pub struct ReconciledVariant {
    pub record: VariantRecord,
    pub embedding_error: Option<ServiceError>,
}

/// Image resolution order: the variant's own image, then the parent
/// product's representative image. An absent variant image always resolves
/// through the parent, never to "no embedding needed".
pub fn resolve_image_url<'a>(
    variant: &'a CatalogVariant,
    product: &'a CatalogProduct,
) -> Option<&'a str> {
    variant
        .image
        .as_ref()
        .map(|image| image.url.as_str())
        .or_else(|| product.featured_image.as_ref().map(|image| image.url.as_str()))
}

pub async fn reconcile(
    variant: &CatalogVariant,
    product: &CatalogProduct,
    cache: &EmbeddingCache,
    provider: &dyn EmbeddingProvider,
) -> ReconciledVariant {
    if variant.inventory_quantity.map(|quantity| quantity < 1).unwrap_or(false) {
        tracing::warn!(
            product_id = %product.id,
            variant_id = %variant.id,
            "variant is out of stock"
        );
    }

    let mut embedding_error = None;
    let image_embedding = match resolve_image_url(variant, product) {
        Some(image_url) => match cache.get_or_compute(image_url, provider).await {
            Ok(vector) => vector,
            Err(e) => {
                tracing::warn!(
                    variant_id = %variant.id,
                    image_url,
                    error = %e,
                    "image embedding failed; storing empty vector"
                );
                embedding_error = Some(e);
                Vec::new()
            }
        },
        None => {
            embedding_error = Some(ServiceError::NotFound(format!(
                "variant {} has no image and product {} has no representative image",
                variant.id, product.id
            )));
            Vec::new()
        }
    };

    let record = VariantRecord {
        product_id: product.id.clone(),
        variant_id: variant.id.clone(),
        content: variant_content(variant),
        image_embedding,
    };
    ReconciledVariant { record, embedding_error }
}

/// Raw variant fields plus a flattened `variant_details` string built from
/// the selected options.
fn variant_content(variant: &CatalogVariant) -> serde_json::Value {
    let mut content = serde_json::to_value(variant).unwrap_or_else(|_| serde_json::json!({}));
    let details: String = variant
        .selected_options
        .iter()
        .map(|option| format!("{}- {},", option.name, option.value))
        .collect();
    if let Some(object) = content.as_object_mut() {
        object.insert("variant_details".to_string(), serde_json::Value::String(details));
    }
    content
}
