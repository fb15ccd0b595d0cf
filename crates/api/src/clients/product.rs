//! HTTP client for the product service.

use std::time::Duration;

use async_trait::async_trait;
use common::ProductId;
use domain::{CatalogError, Product, ProductCatalog};
use reqwest::StatusCode;

/// Timeout applied to every product service call.
pub const PRODUCT_TIMEOUT: Duration = Duration::from_secs(30);

/// [`ProductCatalog`] backed by `GET {base}/api/v1/products/products`.
#[derive(Clone)]
pub struct HttpProductCatalog {
    client: reqwest::Client,
    base_url: String,
}

impl HttpProductCatalog {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn products_url(&self) -> String {
        format!("{}/api/v1/products/products", self.base_url)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, CatalogError> {
        request.send().await.map_err(request_error)
    }
}

fn request_error(e: reqwest::Error) -> CatalogError {
    if e.is_timeout() {
        tracing::warn!("product service timed out");
        CatalogError::Timeout
    } else {
        tracing::warn!(error = %e, "product service request failed");
        CatalogError::Unavailable(e.to_string())
    }
}

fn unexpected(status: StatusCode) -> CatalogError {
    tracing::warn!(%status, "product service answered with an unexpected status");
    CatalogError::BadStatus(status.as_u16())
}

#[async_trait]
impl ProductCatalog for HttpProductCatalog {
    #[tracing::instrument(skip(self))]
    async fn product(&self, id: ProductId) -> Result<Option<Product>, CatalogError> {
        let url = format!("{}/{}", self.products_url(), id);
        let response = self.send(self.client.get(url)).await?;

        match response.status() {
            StatusCode::OK => response.json().await.map(Some).map_err(request_error),
            StatusCode::NOT_FOUND => Ok(None),
            status => Err(unexpected(status)),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn products(&self, category: Option<&str>) -> Result<Vec<Product>, CatalogError> {
        let mut request = self.client.get(self.products_url());
        if let Some(category) = category {
            request = request.query(&[("category", category)]);
        }
        let response = self.send(request).await?;

        match response.status() {
            StatusCode::OK => response.json().await.map_err(request_error),
            status => Err(unexpected(status)),
        }
    }
}
