//! Catalog (product) service client.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use auth::ServiceIdentityCache;
use common::{ProductId, UserId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::http::{PeerConfig, PeerHttp};
use crate::{PeerError, Result};

const REQUIRED_FIELDS: [&str; 5] = ["id", "name", "price", "category", "seller_id"];

/// A product as reported by the catalog. Every field has been checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: f64,
    pub category: Option<String>,
    pub seller_id: UserId,
}

/// Looks up products by id.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Fetches one product, or a typed failure.
    async fn fetch_product(&self, id: ProductId) -> Result<Product>;
}

#[async_trait]
impl<T: CatalogClient + ?Sized> CatalogClient for Arc<T> {
    async fn fetch_product(&self, id: ProductId) -> Result<Product> {
        (**self).fetch_product(id).await
    }
}

/// Catalog client speaking `GET /products?product_id={id}`.
#[derive(Debug, Clone)]
pub struct HttpCatalogClient {
    http: PeerHttp,
}

impl HttpCatalogClient {
    pub fn new(config: PeerConfig, identity: Arc<ServiceIdentityCache>) -> Result<Self> {
        Ok(Self {
            http: PeerHttp::new("catalog", config, identity)?,
        })
    }
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    #[tracing::instrument(skip(self), fields(product_id = %id))]
    async fn fetch_product(&self, id: ProductId) -> Result<Product> {
        let body = self
            .http
            .get_json(&format!("/products?product_id={id}"))
            .await?;
        parse_product_lookup(id, body)
    }
}

/// Validates a catalog lookup body: an array with zero or one product objects.
fn parse_product_lookup(requested: ProductId, body: Value) -> Result<Product> {
    let Value::Array(mut entries) = body else {
        return Err(PeerError::InvalidResponse(
            "expected a JSON array of products".into(),
        ));
    };

    let entry = match entries.len() {
        0 => return Err(PeerError::NotFound),
        1 => entries.remove(0),
        n => {
            return Err(PeerError::InvalidResponse(format!(
                "expected at most one product, got {n}"
            )));
        }
    };

    let Some(object) = entry.as_object() else {
        return Err(PeerError::InvalidResponse(
            "product entry is not an object".into(),
        ));
    };
    // category may be null but the key must be there
    if let Some(missing) = REQUIRED_FIELDS.iter().find(|f| !object.contains_key(**f)) {
        return Err(PeerError::InvalidResponse(format!(
            "product is missing field `{missing}`"
        )));
    }

    let product: Product = serde_json::from_value(entry)
        .map_err(|e| PeerError::InvalidResponse(format!("malformed product: {e}")))?;

    if product.id != requested {
        return Err(PeerError::InvalidResponse(format!(
            "asked for product {requested}, catalog returned {}",
            product.id
        )));
    }
    if !product.price.is_finite() || product.price < 0.0 {
        return Err(PeerError::InvalidResponse(format!(
            "product {} has invalid price {}",
            product.id, product.price
        )));
    }

    Ok(product)
}

#[derive(Default)]
struct CatalogState {
    products: HashMap<ProductId, Product>,
    failure: Option<PeerError>,
}

/// In-memory catalog for testing.
#[derive(Clone, Default)]
pub struct InMemoryCatalogClient {
    state: Arc<RwLock<CatalogState>>,
    calls: Arc<AtomicUsize>,
}

impl InMemoryCatalogClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a product.
    pub async fn insert(&self, product: Product) {
        self.state
            .write()
            .await
            .products
            .insert(product.id, product);
    }

    /// Makes every lookup fail with `failure` until cleared with `None`.
    pub async fn set_failure(&self, failure: Option<PeerError>) {
        self.state.write().await.failure = failure;
    }

    /// Number of lookups made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogClient for InMemoryCatalogClient {
    async fn fetch_product(&self, id: ProductId) -> Result<Product> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state.read().await;
        if let Some(failure) = &state.failure {
            return Err(failure.clone());
        }
        state.products.get(&id).cloned().ok_or(PeerError::NotFound)
    }
}
