//! Product catalog reads.
//!
//! Listings and product detail are cached with `moka` for the configured
//! TTL. Search results are never cached. Admin writes call
//! [`Catalog::invalidate`].

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use thiserror::Error;
use tracing::{debug, error, instrument};

use shopfront_core::ProductId;

use crate::gateway::{CatalogGateway, GatewayError};
use crate::models::{Product, ProductQuery};

const CACHE_CAPACITY: u64 = 1000;

/// Errors from catalog reads.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Product not found: {0}")]
    NotFound(ProductId),

    #[error("Catalog error: {0}")]
    Gateway(#[from] GatewayError),
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum CacheKey {
    Listing(ProductQuery),
    Product(ProductId),
    Categories,
}

#[derive(Debug, Clone)]
enum CacheValue {
    Products(Arc<Vec<Product>>),
    Product(Box<Product>),
    Categories(Arc<Vec<String>>),
}

/// Shopper-facing product reads. Cheap to clone.
#[derive(Clone)]
pub struct Catalog {
    inner: Arc<CatalogInner>,
}

struct CatalogInner {
    gateway: Arc<dyn CatalogGateway>,
    cache: Cache<CacheKey, CacheValue>,
}

impl Catalog {
    #[must_use]
    pub fn new(gateway: Arc<dyn CatalogGateway>, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(ttl)
            .build();
        Self {
            inner: Arc::new(CatalogInner { gateway, cache }),
        }
    }

    /// Every product, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    pub async fn home(&self) -> Result<Arc<Vec<Product>>, CatalogError> {
        self.listing(ProductQuery::all()).await
    }

    /// Products whose category is exactly `category`, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    pub async fn category(&self, category: &str) -> Result<Arc<Vec<Product>>, CatalogError> {
        self.listing(ProductQuery::in_category(category)).await
    }

    /// Case-insensitive search over name, description and category.
    ///
    /// A blank term returns nothing without asking the backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    #[instrument(skip(self))]
    pub async fn search(&self, term: &str) -> Result<Vec<Product>, CatalogError> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(Vec::new());
        }
        self.inner
            .gateway
            .list_products(&ProductQuery::search(term))
            .await
            .map_err(|e| {
                error!(error = %e, "Error searching products");
                e.into()
            })
    }

    /// One product by ID.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when no product has this ID, or a gateway error.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn product(&self, id: ProductId) -> Result<Product, CatalogError> {
        let key = CacheKey::Product(id);
        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let product = self.inner.gateway.get_product(id).await.map_err(|e| match e {
            GatewayError::NotFound(_) => CatalogError::NotFound(id),
            other => {
                error!(error = %other, "Error fetching product");
                other.into()
            }
        })?;

        self.inner
            .cache
            .insert(key, CacheValue::Product(Box::new(product.clone())))
            .await;
        Ok(product)
    }

    /// Distinct category labels in alphabetical order.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    pub async fn categories(&self) -> Result<Arc<Vec<String>>, CatalogError> {
        if let Some(CacheValue::Categories(categories)) =
            self.inner.cache.get(&CacheKey::Categories).await
        {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let products = self.home().await?;
        let categories: Arc<Vec<String>> = Arc::new(
            products
                .iter()
                .map(|product| product.category.trim())
                .filter(|category| !category.is_empty())
                .map(str::to_owned)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
        );

        self.inner
            .cache
            .insert(
                CacheKey::Categories,
                CacheValue::Categories(Arc::clone(&categories)),
            )
            .await;
        Ok(categories)
    }

    /// Drop every cached listing and product.
    pub fn invalidate(&self) {
        self.inner.cache.invalidate_all();
        debug!("Catalog cache invalidated");
    }

    #[instrument(skip(self))]
    async fn listing(&self, query: ProductQuery) -> Result<Arc<Vec<Product>>, CatalogError> {
        let key = CacheKey::Listing(query.clone());
        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let products = Arc::new(self.inner.gateway.list_products(&query).await.map_err(|e| {
            error!(error = %e, "Error fetching products");
            CatalogError::from(e)
        })?);

        self.inner
            .cache
            .insert(key, CacheValue::Products(Arc::clone(&products)))
            .await;
        Ok(products)
    }
}
