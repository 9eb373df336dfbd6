use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::future;
use serde::Deserialize;

use crate::clients::{CatalogCredentials, EmbeddingProvider};
use crate::config::Config;
use crate::models::{CatalogProduct, Recommendation, ServiceError, SuggestionInput, SyncStatus};
use crate::ranking::Ranker;
use crate::storage::CatalogStore;
use crate::sync::SyncEngine;

/// Everything a request handler needs, built once in `main` and shared.
pub struct AppContext {
    pub config: Config,
    pub engine: Arc<SyncEngine>,
    pub ranker: Arc<Ranker>,
    pub embeddings: Arc<dyn EmbeddingProvider>,
    pub store: Arc<dyn CatalogStore>,
}

pub struct ApiError(ServiceError);

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ServiceError::Validation(_) | ServiceError::Config(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct SyncRequest {
    pub shop_url: String,
    pub access_token: String,
}

#[derive(Debug, Deserialize)]
pub struct CancelSyncRequest {
    pub shop_url: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    pub shop_url: String,
    pub product: CatalogProduct,
}

#[derive(Debug, Deserialize)]
pub struct SuggestionsRequest {
    pub shop_url: String,
    pub inputs: Vec<SuggestionInput>,
    pub top_n: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub shop_url: String,
}

pub fn router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/sync", post(sync_shop))
        .route("/sync/cancel", post(cancel_sync))
        .route("/sync/status", get(sync_status))
        .route("/products/update", post(update_product))
        .route("/suggestions", post(suggestions))
        .with_state(ctx)
}

async fn health() -> &'static str {
    "OK"
}

async fn sync_shop(
    State(ctx): State<Arc<AppContext>>,
    Json(request): Json<SyncRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let credentials = CatalogCredentials {
        shop_domain: request.shop_url.clone(),
        access_token: request.access_token,
    };
    let report = ctx.engine.run_sync(&request.shop_url, &credentials).await?;
    Ok(Json(report))
}

async fn cancel_sync(
    State(ctx): State<Arc<AppContext>>,
    Json(request): Json<CancelSyncRequest>,
) -> impl IntoResponse {
    let cancelled = ctx.engine.cancel_run(&request.shop_url);
    Json(serde_json::json!({ "shop": request.shop_url, "cancelled": cancelled }))
}

async fn sync_status(
    State(ctx): State<Arc<AppContext>>,
    Query(query): Query<StatusQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let status: SyncStatus = ctx.store.get_shop_status(&query.shop_url).await?;
    Ok(Json(serde_json::json!({ "shop": query.shop_url, "status": status })))
}

async fn update_product(
    State(ctx): State<Arc<AppContext>>,
    Json(request): Json<UpdateProductRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let report = ctx.engine.sync_product(&request.shop_url, request.product).await?;
    Ok(Json(report))
}

/// Embed each free-text query and rank it against the shop's stored
/// embeddings; queries run independently and concurrently.
async fn suggestions(
    State(ctx): State<Arc<AppContext>>,
    Json(request): Json<SuggestionsRequest>,
) -> Result<Json<Vec<Vec<Recommendation>>>, ApiError> {
    let top_n = request.top_n.unwrap_or(ctx.config.default_top_n);
    let embeddings = future::try_join_all(
        request.inputs.iter().map(|input| ctx.embeddings.embed_text(&input.input)),
    )
    .await?;
    let queries: Vec<(Vec<f32>, String)> = embeddings
        .into_iter()
        .zip(&request.inputs)
        .map(|(embedding, input)| (embedding, input.item_type.clone()))
        .collect();
    let results = ctx.ranker.rank_batch(&request.shop_url, &queries, top_n).await?;
    Ok(Json(results))
}
