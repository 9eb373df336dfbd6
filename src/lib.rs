pub mod api;
pub mod clients;
pub mod config;
pub mod models;
pub mod ranking;
pub mod storage;
pub mod sync;

// Convenient re-exports for tests and external callers
pub use api::AppContext;
pub use clients::*;
pub use config::Config;
pub use models::*;
pub use ranking::Ranker;
pub use storage::{CatalogStore, MongoCatalogStore};
pub use sync::{EmbeddingCache, SyncEngine};
