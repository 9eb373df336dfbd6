use std::collections::HashMap;

use async_trait::async_trait;
use futures::StreamExt;
use mongodb::bson::{doc, Document};
use mongodb::options::{FindOptions, IndexOptions, ReplaceOptions};
use mongodb::{Collection, Database, IndexModel};

use crate::models::*;

/// Persistence seam for the sync and ranking engines. All writes are
/// identity-keyed idempotent upserts; `product_exists` is a branch selector,
/// not a correctness guarantee.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn product_exists(&self, shop: &str, product_id: &str) -> Result<bool>;
    async fn upsert_product(&self, record: &ProductRecord) -> Result<()>;
    async fn upsert_variant(&self, record: &VariantRecord) -> Result<()>;
    async fn set_shop_status(&self, shop: &str, status: SyncStatus) -> Result<()>;
    async fn get_shop_status(&self, shop: &str) -> Result<SyncStatus>;
    async fn products_by_shop_and_type(&self, shop: &str, item_type: &str)
        -> Result<Vec<ProductWithVariants>>;
}

#[derive(Clone)]
pub struct MongoCatalogStore {
    db: Database,
}

impl MongoCatalogStore {
    pub fn with_db(db: Database) -> Self {
        Self { db }
    }

    fn products(&self) -> Collection<ProductRecord> {
        self.db.collection("products")
    }

    fn variants(&self) -> Collection<VariantRecord> {
        self.db.collection("variants")
    }

    fn sync_runs(&self) -> Collection<SyncRun> {
        self.db.collection("sync_runs")
    }

    /// Unique indexes on the identity keys back the upsert discipline: a
    /// duplicate insert from two racing runs degrades to an overwrite, never
    /// a duplicate row.
    pub async fn ensure_indexes(&self) -> Result<()> {
        tracing::info!("creating catalog indexes");

        let products = self.db.collection::<Document>("products");
        products
            .create_index(
                IndexModel::builder()
                    .keys(doc! {"shop": 1, "product_id": 1})
                    .options(IndexOptions::builder().unique(true).build())
                    .build(),
                None,
            )
            .await?;
        products
            .create_index(IndexModel::builder().keys(doc! {"shop": 1, "category": 1}).build(), None)
            .await?;

        let variants = self.db.collection::<Document>("variants");
        variants
            .create_index(
                IndexModel::builder()
                    .keys(doc! {"variant_id": 1})
                    .options(IndexOptions::builder().unique(true).build())
                    .build(),
                None,
            )
            .await?;
        variants
            .create_index(IndexModel::builder().keys(doc! {"product_id": 1}).build(), None)
            .await?;

        let sync_runs = self.db.collection::<Document>("sync_runs");
        sync_runs
            .create_index(
                IndexModel::builder()
                    .keys(doc! {"shop": 1})
                    .options(IndexOptions::builder().unique(true).build())
                    .build(),
                None,
            )
            .await?;

        Ok(())
    }
}

#[async_trait]
impl CatalogStore for MongoCatalogStore {
    async fn product_exists(&self, shop: &str, product_id: &str) -> Result<bool> {
        let filter = doc! { "shop": shop, "product_id": product_id };
        Ok(self.products().find_one(filter, None).await?.is_some())
    }

    async fn upsert_product(&self, record: &ProductRecord) -> Result<()> {
        let filter = doc! { "shop": &record.shop, "product_id": &record.product_id };
        let options = ReplaceOptions::builder().upsert(true).build();
        self.products().replace_one(filter, record, options).await?;
        Ok(())
    }

    async fn upsert_variant(&self, record: &VariantRecord) -> Result<()> {
        let filter = doc! { "variant_id": &record.variant_id };
        let options = ReplaceOptions::builder().upsert(true).build();
        self.variants().replace_one(filter, record, options).await?;
        Ok(())
    }

    async fn set_shop_status(&self, shop: &str, status: SyncStatus) -> Result<()> {
        let filter = doc! { "shop": shop };
        let options = ReplaceOptions::builder().upsert(true).build();
        self.sync_runs().replace_one(filter, SyncRun::new(shop, status), options).await?;
        Ok(())
    }

    async fn get_shop_status(&self, shop: &str) -> Result<SyncStatus> {
        let filter = doc! { "shop": shop };
        let run = self.sync_runs().find_one(filter, None).await?;
        Ok(run.map(|r| r.status).unwrap_or(SyncStatus::Pending))
    }

    async fn products_by_shop_and_type(
        &self,
        shop: &str,
        item_type: &str,
    ) -> Result<Vec<ProductWithVariants>> {
        // _id order is first-insertion order, which is catalog order for the
        // first sync and stays stable across update-in-place runs.
        let options = FindOptions::builder().sort(doc! {"_id": 1}).build();
        let filter = doc! { "shop": shop, "category": item_type };
        let mut cursor = self.products().find(filter, options).await?;
        let mut products = Vec::new();
        while let Some(product) = cursor.next().await {
            products.push(product?);
        }
        if products.is_empty() {
            return Ok(Vec::new());
        }

        let product_ids: Vec<String> = products.iter().map(|p| p.product_id.clone()).collect();
        let variant_options = FindOptions::builder().sort(doc! {"_id": 1}).build();
        let variant_filter = doc! { "product_id": { "$in": product_ids } };
        let mut variant_cursor = self.variants().find(variant_filter, variant_options).await?;
        let mut variants_by_product: HashMap<String, Vec<VariantRecord>> = HashMap::new();
        while let Some(variant) = variant_cursor.next().await {
            let variant = variant?;
            variants_by_product.entry(variant.product_id.clone()).or_default().push(variant);
        }

        Ok(products
            .into_iter()
            .map(|product| {
                let variants = variants_by_product.remove(&product.product_id).unwrap_or_default();
                ProductWithVariants { product, variants }
            })
            .collect())
    }
}
