//! Lookup of products owned by the product catalog service.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::ProductId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A product as reported by the catalog. Everything but the id is optional
/// because the catalog's payload is not under this service's control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// The catalog could not be reached.
    #[error("Product service unavailable: {0}")]
    Unavailable(String),

    #[error("Product service did not answer in time")]
    Timeout,

    /// The catalog answered with a status other than 200 or 404.
    #[error("Product service answered with status {0}")]
    BadStatus(u16),
}

/// Trait for reading products from the catalog service.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Returns the product, or `None` if the catalog does not know it.
    async fn product(&self, id: ProductId) -> Result<Option<Product>, CatalogError>;

    /// Lists catalog products, optionally narrowed to one category.
    async fn products(&self, category: Option<&str>) -> Result<Vec<Product>, CatalogError>;
}

#[derive(Debug, Default)]
struct InMemoryCatalogState {
    products: BTreeMap<ProductId, Product>,
    unavailable: bool,
}

/// In-memory catalog for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProductCatalog {
    state: Arc<RwLock<InMemoryCatalogState>>,
}

impl InMemoryProductCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_product(&self, product: Product) {
        if let Ok(mut state) = self.state.write() {
            state.products.insert(product.id, product);
        }
    }

    /// Adds a product with just a name and category.
    pub fn add(&self, id: i64, name: &str, category: &str) {
        self.add_product(Product {
            id: ProductId::new(id),
            name: Some(name.to_string()),
            description: None,
            category: Some(category.to_string()),
            brand: None,
        });
    }

    /// Makes every lookup fail as if the catalog were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        if let Ok(mut state) = self.state.write() {
            state.unavailable = unavailable;
        }
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, InMemoryCatalogState>, CatalogError> {
        let state = self
            .state
            .read()
            .map_err(|_| CatalogError::Unavailable("product catalog lock poisoned".to_string()))?;
        if state.unavailable {
            return Err(CatalogError::Unavailable("connection refused".to_string()));
        }
        Ok(state)
    }
}

#[async_trait]
impl ProductCatalog for InMemoryProductCatalog {
    async fn product(&self, id: ProductId) -> Result<Option<Product>, CatalogError> {
        Ok(self.read()?.products.get(&id).cloned())
    }

    async fn products(&self, category: Option<&str>) -> Result<Vec<Product>, CatalogError> {
        Ok(self
            .read()?
            .products
            .values()
            .filter(|p| category.is_none_or(|c| p.category.as_deref() == Some(c)))
            .cloned()
            .collect())
    }
}
