use serde::{Deserialize, Serialize};

use crate::models::ProductContent;

/// One ranked (product, variant) pair. Derived per query, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub product_id: String,
    pub variant_id: String,
    pub similarity: f32,
    pub item_type: String,
    pub product_content: ProductContent,
}

/// One free-text query against a shop's catalog, scoped to an item type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionInput {
    pub item_type: String,
    pub input: String,
}
