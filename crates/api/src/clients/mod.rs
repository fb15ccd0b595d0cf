//! Clients for the services this one depends on.

pub mod geo;
pub mod product;

pub use geo::{GEO_TIMEOUT, HttpZoneDirectory};
pub use product::{HttpProductCatalog, PRODUCT_TIMEOUT};
