//! HTTP handlers, one module per resource.

pub mod assignments;
pub mod health;
pub mod incidents;
pub mod inventory;
pub mod metrics;
pub mod planning;
pub mod sellers;
pub mod shopkeepers;
pub mod visits;

use store::Page;

use crate::error::ApiError;

pub(crate) fn default_limit() -> i64 {
    Page::MAX_LIMIT
}

pub(crate) fn default_true() -> bool {
    true
}

/// Validates the `skip`/`limit` query pair.
pub(crate) fn page(skip: i64, limit: i64) -> Result<Page, ApiError> {
    if skip < 0 {
        return Err(ApiError::Unprocessable(
            "skip must be greater than or equal to 0".to_string(),
        ));
    }
    if !(1..=Page::MAX_LIMIT).contains(&limit) {
        return Err(ApiError::Unprocessable(format!(
            "limit must be between 1 and {}",
            Page::MAX_LIMIT
        )));
    }
    Ok(Page::new(skip, limit))
}
