use chrono::{DateTime, Utc};
use mongodb::bson::DateTime as BsonDateTime;
use serde::{Deserialize, Serialize};

use crate::models::SyncStatus;

/// Persisted sync-run state for one shop, keyed by `shop`. Overwritten at
/// each run; never rolled back mid-run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRun {
    pub shop: String,
    pub status: SyncStatus,
    pub updated_at: BsonDateTime,
}

impl SyncRun {
    pub fn new(shop: &str, status: SyncStatus) -> Self {
        Self {
            shop: shop.to_string(),
            status,
            updated_at: BsonDateTime::now(),
        }
    }
}

/// Pipeline stage a per-product failure was recorded in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SyncStage {
    Categorize,
    TextEmbedding,
    ImageEmbedding,
    Persistence,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSyncError {
    pub product_id: String,
    pub stage: SyncStage,
    pub message: String,
}

/// Structured result of one sync run. A run that finished with per-product
/// failures still reports `Completed`; callers inspect `errors` to tell
/// "run finished" apart from "run had zero errors".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    pub shop: String,
    pub run_id: String,
    pub status: SyncStatus,
    pub started_at: DateTime<Utc>,
    pub processed: usize,
    pub skipped: usize,
    pub cancelled: usize,
    pub errors: Vec<ProductSyncError>,
    pub duration_ms: u64,
}

impl SyncReport {
    pub fn new(shop: &str, run_id: String) -> Self {
        Self {
            shop: shop.to_string(),
            run_id,
            status: SyncStatus::InProgress,
            started_at: Utc::now(),
            processed: 0,
            skipped: 0,
            cancelled: 0,
            errors: Vec::new(),
            duration_ms: 0,
        }
    }
}
