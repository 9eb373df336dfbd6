use std::net::SocketAddr;
use std::sync::Arc;

use mongodb::{options::ClientOptions, Client as MongoClient};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{fmt, EnvFilter};

use recommendations_service::api::{self, AppContext};
use recommendations_service::clients::{
    CatalogClient, Categorizer, EmbeddingProvider, EmbeddingsServiceClient, TaggingServiceClient,
};
use recommendations_service::config::Config;
use recommendations_service::ranking::Ranker;
use recommendations_service::storage::{CatalogStore, MongoCatalogStore};
use recommendations_service::sync::SyncEngine;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let filter = EnvFilter::from_default_env().add_directive("info".parse().unwrap());
    fmt()
        .with_env_filter(filter)
        .json()
        .flatten_event(true)
        .init();

    let cfg = Config::from_env();
    cfg.validate()?;
    tracing::info!(
        database = %cfg.database_name,
        port = cfg.port,
        sync_parallelism = cfg.sync_parallelism,
        "loaded configuration"
    );

    let client_options = ClientOptions::parse(&cfg.mongodb_uri).await?;
    let mongo_client = MongoClient::with_options(client_options)?;
    let db = mongo_client.database(&cfg.database_name);
    let mongo_store = MongoCatalogStore::with_db(db);
    mongo_store.ensure_indexes().await?;
    let store: Arc<dyn CatalogStore> = Arc::new(mongo_store);

    let embeddings: Arc<dyn EmbeddingProvider> = Arc::new(EmbeddingsServiceClient::new(
        cfg.embeddings_service_url.clone(),
        cfg.http_timeout_ms,
    ));
    let categorizer: Arc<dyn Categorizer> = Arc::new(TaggingServiceClient::new(
        cfg.tagging_service_url.clone(),
        cfg.tagging_api_key.clone(),
        cfg.tagging_model.clone(),
        cfg.http_timeout_ms,
    ));
    let catalog = CatalogClient::new(
        cfg.catalog_api_version.clone(),
        cfg.catalog_page_size,
        cfg.http_timeout_ms,
    );

    let engine = Arc::new(SyncEngine::new(
        store.clone(),
        embeddings.clone(),
        categorizer,
        catalog,
        cfg.clone(),
    ));
    let ranker = Arc::new(Ranker::new(store.clone()));

    let ctx = Arc::new(AppContext {
        config: cfg.clone(),
        engine,
        ranker,
        embeddings,
        store,
    });
    let app = api::router(ctx).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("0.0.0.0:{}", cfg.port).parse()?;
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            if e.kind() == std::io::ErrorKind::AddrInUse {
                tracing::error!(
                    port = cfg.port,
                    "Port is already in use. Another recommendations-service might be running. Try changing PORT env var or stop the other process."
                );
            }
            return Err(e.into());
        }
    };
    tracing::info!(port = cfg.port, "recommendations service listening");
    axum::serve(listener, app).await?;

    Ok(())
}
