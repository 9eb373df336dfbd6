use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::clients::{CatalogClient, CatalogCredentials, Categorizer, EmbeddingProvider};
use crate::config::Config;
use crate::models::*;
use crate::storage::CatalogStore;
use crate::sync::{reconcile, EmbeddingCache};

/// Result of one product's trip through the pipeline. Degraded-category and
/// image-embedding failures ride along with a processed product; only text
/// embedding and persistence failures skip it.
enum ProductOutcome {
    Processed { errors: Vec<ProductSyncError> },
    Skipped { error: ProductSyncError },
    Cancelled,
}

/// Drives one full reconciliation pass over a shop's catalog: category
/// lookup, embedding computation through the run-scoped cache, and
/// identity-keyed upserts into the store.
pub struct SyncEngine {
    store: Arc<dyn CatalogStore>,
    embeddings: Arc<dyn EmbeddingProvider>,
    categorizer: Arc<dyn Categorizer>,
    catalog: CatalogClient,
    cfg: Config,
    active_runs: Mutex<HashMap<String, CancellationToken>>,
}

struct ActiveRunGuard<'a> {
    runs: &'a Mutex<HashMap<String, CancellationToken>>,
    shop: String,
}

impl Drop for ActiveRunGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut runs) = self.runs.lock() {
            runs.remove(&self.shop);
        }
    }
}

impl SyncEngine {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        embeddings: Arc<dyn EmbeddingProvider>,
        categorizer: Arc<dyn Categorizer>,
        catalog: CatalogClient,
        cfg: Config,
    ) -> Self {
        Self {
            store,
            embeddings,
            categorizer,
            catalog,
            cfg,
            active_runs: Mutex::new(HashMap::new()),
        }
    }

    /// Full pass: fetch the catalog, then reconcile every product. A fetch
    /// or credential failure aborts before the run is marked in progress and
    /// leaves the shop status `Failed`.
    pub async fn run_sync(&self, shop: &str, credentials: &CatalogCredentials) -> Result<SyncReport> {
        let cancel = {
            let mut active = self.active_runs.lock().expect("active runs mutex poisoned");
            if active.contains_key(shop) {
                return Err(ServiceError::Validation(format!(
                    "a sync for shop {} is already in progress",
                    shop
                )));
            }
            let token = CancellationToken::new();
            active.insert(shop.to_string(), token.clone());
            token
        };
        let _guard = ActiveRunGuard { runs: &self.active_runs, shop: shop.to_string() };

        let products = match self.catalog.fetch_all_products(credentials).await {
            Ok(products) => products,
            Err(e) => {
                tracing::error!(shop = %shop, error = %e, "catalog fetch failed; aborting run");
                if let Err(status_err) = self.store.set_shop_status(shop, SyncStatus::Failed).await {
                    tracing::error!(shop = %shop, error = %status_err, "failed to record failed run status");
                }
                return Err(e);
            }
        };

        self.sync(shop, products, &cancel).await
    }

    /// Request cancellation of the shop's running sync. In-flight work for
    /// the current products completes; undispatched products are dropped.
    pub fn cancel_run(&self, shop: &str) -> bool {
        let active = self.active_runs.lock().expect("active runs mutex poisoned");
        match active.get(shop) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// One reconciliation pass over an already-fetched product sequence.
    /// The run finishes `Completed` once every product has been attempted,
    /// regardless of per-product failures.
    pub async fn sync(
        &self,
        shop: &str,
        products: Vec<CatalogProduct>,
        cancel: &CancellationToken,
    ) -> Result<SyncReport> {
        let run_id = Uuid::new_v4().simple().to_string();
        let started = Instant::now();
        tracing::info!(
            shop = %shop,
            run_id = %run_id,
            product_count = products.len(),
            "starting catalog sync"
        );

        self.store.set_shop_status(shop, SyncStatus::InProgress).await?;

        // The cache is the only state shared between product tasks.
        let cache = Arc::new(EmbeddingCache::new());
        let outcomes = stream::iter(products.into_iter().map(|product| {
            let cache = cache.clone();
            let cancel = cancel.clone();
            async move {
                if cancel.is_cancelled() {
                    return ProductOutcome::Cancelled;
                }
                self.process_product(shop, product, &cache).await
            }
        }))
        .buffer_unordered(self.cfg.sync_parallelism.max(1))
        .collect::<Vec<_>>()
        .await;

        let mut report = SyncReport::new(shop, run_id);
        for outcome in outcomes {
            match outcome {
                ProductOutcome::Processed { errors } => {
                    report.processed += 1;
                    report.errors.extend(errors);
                }
                ProductOutcome::Skipped { error } => {
                    report.skipped += 1;
                    report.errors.push(error);
                }
                ProductOutcome::Cancelled => report.cancelled += 1,
            }
        }

        self.store.set_shop_status(shop, SyncStatus::Completed).await?;
        report.status = SyncStatus::Completed;
        report.duration_ms = started.elapsed().as_millis() as u64;
        tracing::info!(
            shop = %shop,
            run_id = %report.run_id,
            processed = report.processed,
            skipped = report.skipped,
            cancelled = report.cancelled,
            error_count = report.errors.len(),
            duration_ms = report.duration_ms,
            "catalog sync finished"
        );
        Ok(report)
    }

    /// Webhook path: reconcile a single product without touching the shop's
    /// run status. Uses a fresh cache so repeated updates never share state.
    pub async fn sync_product(&self, shop: &str, product: CatalogProduct) -> Result<SyncReport> {
        let run_id = Uuid::new_v4().simple().to_string();
        let started = Instant::now();
        let cache = EmbeddingCache::new();

        let outcome = self.process_product(shop, product, &cache).await;
        let mut report = SyncReport::new(shop, run_id);
        match outcome {
            ProductOutcome::Processed { errors } => {
                report.processed = 1;
                report.errors = errors;
            }
            ProductOutcome::Skipped { error } => {
                report.skipped = 1;
                report.errors.push(error);
            }
            ProductOutcome::Cancelled => report.cancelled = 1,
        }
        report.status = SyncStatus::Completed;
        report.duration_ms = started.elapsed().as_millis() as u64;
        Ok(report)
    }

    async fn process_product(
        &self,
        shop: &str,
        product: CatalogProduct,
        cache: &EmbeddingCache,
    ) -> ProductOutcome {
        let product_id = product.id.clone();
        let mut errors = Vec::new();

        // A miscategorized product beats a dropped sync: any failure here
        // degrades to an uncategorized product.
        let category = match self.categorizer.categorize(&product.title, &product.description).await {
            Ok(category) => category.map(|c| c.to_lowercase()),
            Err(e) => {
                tracing::warn!(
                    shop = %shop,
                    product_id = %product_id,
                    error = %e,
                    "category lookup failed; proceeding uncategorized"
                );
                errors.push(ProductSyncError {
                    product_id: product_id.clone(),
                    stage: SyncStage::Categorize,
                    message: e.to_string(),
                });
                None
            }
        };

        let mut variant_records = Vec::new();
        for variant in product.variants.nodes() {
            let reconciled = reconcile(variant, &product, cache, self.embeddings.as_ref()).await;
            if let Some(e) = reconciled.embedding_error {
                errors.push(ProductSyncError {
                    product_id: product_id.clone(),
                    stage: SyncStage::ImageEmbedding,
                    message: e.to_string(),
                });
            }
            variant_records.push(reconciled.record);
        }

        // Product text is assumed unique, so this call bypasses the cache.
        let text = format!("{} - {}", product.title, product.description);
        let text_embedding = match self.embeddings.embed_text(&text).await {
            Ok(vector) => vector,
            Err(e) => {
                tracing::warn!(
                    shop = %shop,
                    product_id = %product_id,
                    error = %e,
                    "text embedding failed; skipping product"
                );
                return ProductOutcome::Skipped {
                    error: ProductSyncError {
                        product_id,
                        stage: SyncStage::TextEmbedding,
                        message: e.to_string(),
                    },
                };
            }
        };

        let record = ProductRecord {
            shop: shop.to_string(),
            product_id: product_id.clone(),
            content: ProductContent::from(&product),
            category,
            text_embedding,
        };
        match self.persist(&record, &variant_records).await {
            Ok(created) => {
                tracing::info!(
                    shop = %shop,
                    product_id = %product_id,
                    created = created,
                    variant_count = variant_records.len(),
                    "product persisted"
                );
                ProductOutcome::Processed { errors }
            }
            Err(e) => {
                tracing::error!(
                    shop = %shop,
                    product_id = %product_id,
                    error = %e,
                    "persistence failed; skipping product"
                );
                ProductOutcome::Skipped {
                    error: ProductSyncError {
                        product_id,
                        stage: SyncStage::Persistence,
                        message: e.to_string(),
                    },
                }
            }
        }
    }

    /// The existence check only selects the create/update branch for
    /// logging; the writes are identity-keyed upserts either way, so a
    /// duplicate insert from two racing runs degrades to an overwrite.
    async fn persist(&self, record: &ProductRecord, variants: &[VariantRecord]) -> Result<bool> {
        let exists = self.store.product_exists(&record.shop, &record.product_id).await?;
        self.store.upsert_product(record).await?;
        for variant in variants {
            self.store.upsert_variant(variant).await?;
        }
        Ok(!exists)
    }
}
