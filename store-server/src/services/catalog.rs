//! Product catalog lookup
//!
//! The composer snapshots name and unit price from the catalog at
//! order time; the catalog stays the source of truth for live prices.

use async_trait::async_trait;
use http::StatusCode;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Unknown product: {0}")]
    UnknownProduct(i64),

    #[error("Catalog unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed catalog response: {0}")]
    Malformed(String),
}

/// Price/name snapshot for a single product
#[derive(Debug, Clone, Deserialize)]
pub struct ProductQuote {
    pub product_id: i64,
    pub name: String,
    pub unit_price: f64,
}

#[async_trait]
pub trait CatalogLookup: Send + Sync {
    async fn quote(&self, product_id: i64) -> Result<ProductQuote, CatalogError>;
}

/// HTTP catalog client (GET {base}/products/{id})
pub struct HttpCatalog {
    base_url: String,
    client: reqwest::Client,
}

impl HttpCatalog {
    pub fn new(base_url: impl Into<String>, timeout_ms: u64) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_millis(timeout_ms))
                .build()
                .unwrap_or_default(),
        }
    }
}

#[async_trait]
impl CatalogLookup for HttpCatalog {
    async fn quote(&self, product_id: i64) -> Result<ProductQuote, CatalogError> {
        let url = format!(
            "{}/products/{}",
            self.base_url.trim_end_matches('/'),
            product_id
        );
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| CatalogError::Unavailable(e.to_string()))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(CatalogError::UnknownProduct(product_id));
        }
        if !resp.status().is_success() {
            return Err(CatalogError::Unavailable(format!(
                "catalog returned {}",
                resp.status()
            )));
        }

        resp.json::<ProductQuote>()
            .await
            .map_err(|e| CatalogError::Malformed(e.to_string()))
    }
}
