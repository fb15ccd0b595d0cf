//! Shopkeeper inventory endpoints. Product details come from the product
//! service; stock levels live here.
//!
//! `/inventory/{id}` names a shopkeeper on reads and stock adjustments and an
//! inventory row on updates and deletes.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use common::{InventoryId, ShopkeeperId};
use domain::{
    AddInventoryItem, InventoryDetail, InventorySummary, Product, StockAdjustment,
    StockAdjustmentResult, UpdateInventoryItem,
};
use serde::{Deserialize, Serialize};
use store::{InventoryItem, UserStore};

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct InventoryParams {
    #[serde(default)]
    pub low_stock_only: bool,
}

#[derive(Debug, Deserialize)]
pub struct ProductParams {
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AvailableProducts {
    pub products: Vec<Product>,
    pub total: usize,
}

/// GET /inventory/{id}
#[tracing::instrument(skip(state, _user))]
pub async fn list<S: UserStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _user: CurrentUser,
    ApiPath(shopkeeper_id): ApiPath<ShopkeeperId>,
    ApiQuery(params): ApiQuery<InventoryParams>,
) -> Result<Json<Vec<InventoryDetail>>, ApiError> {
    Ok(Json(
        state
            .inventory
            .list(shopkeeper_id, params.low_stock_only)
            .await?,
    ))
}

/// GET /inventory/{id}/summary
#[tracing::instrument(skip(state, _user))]
pub async fn summary<S: UserStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _user: CurrentUser,
    ApiPath(shopkeeper_id): ApiPath<ShopkeeperId>,
) -> Result<Json<InventorySummary>, ApiError> {
    Ok(Json(state.inventory.summary(shopkeeper_id).await?))
}

/// POST /inventory
#[tracing::instrument(skip(state, actor, cmd))]
pub async fn add<S: UserStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(actor): CurrentUser,
    ApiJson(cmd): ApiJson<AddInventoryItem>,
) -> Result<(StatusCode, Json<InventoryItem>), ApiError> {
    let item = state.inventory.add(&actor, cmd).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// PUT /inventory/{id}
#[tracing::instrument(skip(state, _user, cmd))]
pub async fn update<S: UserStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _user: CurrentUser,
    ApiPath(id): ApiPath<InventoryId>,
    ApiJson(cmd): ApiJson<UpdateInventoryItem>,
) -> Result<Json<InventoryItem>, ApiError> {
    Ok(Json(state.inventory.update(id, cmd).await?))
}

/// DELETE /inventory/{id}
#[tracing::instrument(skip(state, _user))]
pub async fn delete<S: UserStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _user: CurrentUser,
    ApiPath(id): ApiPath<InventoryId>,
) -> Result<StatusCode, ApiError> {
    state.inventory.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /inventory/{id}/adjust-stock
#[tracing::instrument(skip(state, _user, cmd))]
pub async fn adjust_stock<S: UserStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _user: CurrentUser,
    ApiPath(shopkeeper_id): ApiPath<ShopkeeperId>,
    ApiJson(cmd): ApiJson<StockAdjustment>,
) -> Result<Json<StockAdjustmentResult>, ApiError> {
    Ok(Json(state.inventory.adjust_stock(shopkeeper_id, cmd).await?))
}

/// GET /inventory/low-stock/all
#[tracing::instrument(skip(state, _user))]
pub async fn low_stock_all<S: UserStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _user: CurrentUser,
) -> Result<Json<Vec<InventoryDetail>>, ApiError> {
    Ok(Json(state.inventory.low_stock_all().await?))
}

/// GET /inventory/products/available
#[tracing::instrument(skip(state, _user))]
pub async fn available_products<S: UserStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _user: CurrentUser,
    ApiQuery(params): ApiQuery<ProductParams>,
) -> Result<Json<AvailableProducts>, ApiError> {
    let products = state
        .inventory
        .available_products(params.category.as_deref())
        .await?;
    Ok(Json(AvailableProducts {
        total: products.len(),
        products,
    }))
}
