pub mod cache;
pub mod engine;
pub mod reconcile;

pub use cache::EmbeddingCache;
pub use engine::SyncEngine;
pub use reconcile::{reconcile, ReconciledVariant};
