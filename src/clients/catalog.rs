use reqwest::Client;
use serde::Deserialize;

use crate::models::{CatalogProduct, Connection, Result, ServiceError};

/// Per-request credentials for one shop's catalog feed.
#[derive(Debug, Clone)]
pub struct CatalogCredentials {
    pub shop_domain: String,
    pub access_token: String,
}

#[derive(Debug, Deserialize)]
struct FeedResponse {
    #[serde(default)]
    data: Option<FeedData>,
    #[serde(default)]
    errors: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct FeedData {
    products: Connection<CatalogProduct>,
}

/// Client for the cursor-paginated GraphQL-style product feed. Pagination
/// mechanics live entirely here; the sync engine consumes a flattened
/// product sequence.
#[derive(Clone)]
pub struct CatalogClient {
    client: Client,
    api_version: String,
    page_size: usize,
}

impl CatalogClient {
    pub fn new(api_version: String, page_size: usize, timeout_ms: u64) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_millis(timeout_ms))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, api_version, page_size }
    }

    fn products_query(&self, cursor: Option<&str>) -> String {
        let after_clause = cursor.map(|c| format!(", after: \"{}\"", c)).unwrap_or_default();
        format!(
            r#"{{
  products(first: {first}{after}, query: "status:active AND published_status:published AND inventory_total:>0") {{
    edges {{
      cursor
      node {{
        id
        title
        description
        totalInventory
        onlineStoreUrl
        priceRange {{ maxVariantPrice {{ amount }} }}
        featuredImage {{ url }}
        variants(first: 10) {{
          edges {{
            node {{
              id
              price
              title
              inventoryQuantity
              image {{ url }}
              selectedOptions {{ name value }}
            }}
          }}
        }}
      }}
    }}
    pageInfo {{ hasNextPage }}
  }}
}}"#,
            first = self.page_size,
            after = after_clause,
        )
    }

    fn endpoint_for(&self, credentials: &CatalogCredentials) -> Result<String> {
        if credentials.shop_domain.is_empty() || credentials.access_token.is_empty() {
            return Err(ServiceError::Config(
                "catalog credentials are missing: shop domain and access token are required".to_string(),
            ));
        }
        let base = if credentials.shop_domain.contains("://") {
            credentials.shop_domain.trim_end_matches('/').to_string()
        } else {
            format!("https://{}", credentials.shop_domain.trim_end_matches('/'))
        };
        let endpoint = format!("{}/admin/api/{}/graphql.json", base, self.api_version);
        url::Url::parse(&endpoint)
            .map_err(|e| ServiceError::Config(format!("invalid catalog endpoint {}: {}", endpoint, e)))?;
        Ok(endpoint)
    }

    /// Walk every page of the shop's catalog and return the flattened
    /// product list.
    pub async fn fetch_all_products(&self, credentials: &CatalogCredentials) -> Result<Vec<CatalogProduct>> {
        let endpoint = self.endpoint_for(credentials)?;

        let mut all_products = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let previous_cursor = cursor.clone();
            let page = self.fetch_page(&endpoint, &credentials.access_token, cursor.as_deref()).await?;
            let has_next_page = page.page_info.as_ref().map(|info| info.has_next_page).unwrap_or(false);

            for edge in page.edges {
                if edge.cursor.is_some() {
                    cursor = edge.cursor;
                }
                all_products.push(edge.node);
            }
            if has_next_page && cursor == previous_cursor {
                return Err(ServiceError::Transient(
                    "catalog pagination did not advance despite hasNextPage=true".to_string(),
                ));
            }
            tracing::info!(
                shop = %credentials.shop_domain,
                running_count = all_products.len(),
                "fetched catalog page"
            );
            if !has_next_page {
                break;
            }
        }
        Ok(all_products)
    }

    async fn fetch_page(
        &self,
        endpoint: &str,
        access_token: &str,
        cursor: Option<&str>,
    ) -> Result<Connection<CatalogProduct>> {
        let body = serde_json::json!({ "query": self.products_query(cursor) });
        let response = self
            .client
            .post(endpoint)
            .header("Content-Type", "application/json")
            .header("X-Shopify-Access-Token", access_token)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            let message = format!("catalog feed error: status={} body={}", status, text);
            return if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                Err(ServiceError::Transient(message))
            } else {
                Err(ServiceError::Validation(message))
            };
        }

        let feed: FeedResponse = response.json().await.map_err(|e| {
            ServiceError::Validation(format!("catalog feed returned a malformed response: {}", e))
        })?;
        if let Some(errors) = feed.errors.filter(|e| !e.is_null()) {
            return Err(ServiceError::Validation(format!("catalog feed errors: {}", errors)));
        }
        feed.data
            .map(|data| data.products)
            .ok_or_else(|| ServiceError::Validation("catalog feed response has no data".to_string()))
    }
}
