use std::cmp::Ordering;
use std::sync::Arc;

use futures::future;

use crate::models::{ProductWithVariants, Recommendation, Result};
use crate::storage::CatalogStore;

/// Cosine similarity, defined as `1 - cosine distance`, in [-1, 1].
///
/// A zero-norm vector (the empty-vector placeholder for failed embeddings)
/// and mismatched dimensions both score 0 instead of dividing by zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Score every (product, variant) pair against the query embedding: the
/// product's text similarity averaged with each variant's image similarity.
pub fn score_candidates(
    query: &[f32],
    candidates: &[ProductWithVariants],
    item_type: &str,
) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();
    for candidate in candidates {
        let text_similarity = cosine_similarity(query, &candidate.product.text_embedding);
        for variant in &candidate.variants {
            let image_similarity = cosine_similarity(query, &variant.image_embedding);
            let aggregated = (text_similarity + image_similarity) / 2.0;
            recommendations.push(Recommendation {
                product_id: candidate.product.product_id.clone(),
                variant_id: variant.variant_id.clone(),
                similarity: aggregated,
                item_type: candidate
                    .product
                    .category
                    .clone()
                    .unwrap_or_else(|| item_type.to_lowercase()),
                product_content: candidate.product.content.clone(),
            });
        }
    }
    recommendations
}

/// Ranks stored catalog embeddings against query embeddings. Read-only: one
/// store fetch per query, no shared mutable state between queries.
pub struct Ranker {
    store: Arc<dyn CatalogStore>,
}

impl Ranker {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// Top-N recommendations for one query embedding, scoped to a shop and
    /// item type. The stable sort keeps catalog order on ties, so repeated
    /// calls over the same candidates return the same order.
    pub async fn rank(
        &self,
        query_embedding: &[f32],
        shop: &str,
        item_type: &str,
        top_n: usize,
    ) -> Result<Vec<Recommendation>> {
        let candidates = self
            .store
            .products_by_shop_and_type(shop, &item_type.to_lowercase())
            .await?;
        tracing::debug!(
            shop = %shop,
            item_type = %item_type,
            candidate_count = candidates.len(),
            "ranking candidates"
        );

        let mut recommendations = score_candidates(query_embedding, &candidates, item_type);
        recommendations.sort_by(|a, b| {
            b.similarity.partial_cmp(&a.similarity).unwrap_or(Ordering::Equal)
        });
        recommendations.truncate(top_n.max(1));
        Ok(recommendations)
    }

    /// Batched ranking: each query runs independently and concurrently.
    pub async fn rank_batch(
        &self,
        shop: &str,
        queries: &[(Vec<f32>, String)],
        top_n: usize,
    ) -> Result<Vec<Vec<Recommendation>>> {
        let futures = queries
            .iter()
            .map(|(embedding, item_type)| self.rank(embedding, shop, item_type, top_n));
        future::try_join_all(futures).await
    }
}
