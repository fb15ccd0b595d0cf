//! Shopkeeper endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use common::{SellerId, ShopkeeperId};
use domain::{CreateShopkeeper, ShopkeeperView, UpdateShopkeeper};
use serde::Deserialize;
use store::{Shopkeeper, ShopkeeperQuery, UserStore};

use super::{default_limit, default_true, page};
use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListShopkeepersParams {
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub seller_id: Option<SellerId>,
    /// Only shopkeepers without an active assignment.
    #[serde(default)]
    pub unassigned: bool,
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

/// POST /shopkeepers
#[tracing::instrument(skip(state, _user, cmd))]
pub async fn create<S: UserStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _user: CurrentUser,
    ApiJson(cmd): ApiJson<CreateShopkeeper>,
) -> Result<(StatusCode, Json<Shopkeeper>), ApiError> {
    let shopkeeper = state.shopkeepers.create(cmd).await?;
    Ok((StatusCode::CREATED, Json(shopkeeper)))
}

/// GET /shopkeepers
#[tracing::instrument(skip(state, _user))]
pub async fn list<S: UserStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _user: CurrentUser,
    ApiQuery(params): ApiQuery<ListShopkeepersParams>,
) -> Result<Json<Vec<ShopkeeperView>>, ApiError> {
    let mut query = ShopkeeperQuery::new()
        .active(params.is_active)
        .page(page(params.skip, params.limit)?);
    if let Some(seller_id) = params.seller_id {
        query = query.assigned_to(seller_id);
    }
    if params.unassigned {
        query = query.unassigned_only();
    }
    Ok(Json(state.shopkeepers.list(&query).await?))
}

/// GET /shopkeepers/unassigned: active shopkeepers nobody covers.
#[tracing::instrument(skip(state, _user))]
pub async fn unassigned<S: UserStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _user: CurrentUser,
) -> Result<Json<Vec<Shopkeeper>>, ApiError> {
    Ok(Json(state.shopkeepers.unassigned().await?))
}

/// GET /shopkeepers/{id}
#[tracing::instrument(skip(state, _user))]
pub async fn get<S: UserStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _user: CurrentUser,
    ApiPath(id): ApiPath<ShopkeeperId>,
) -> Result<Json<ShopkeeperView>, ApiError> {
    Ok(Json(state.shopkeepers.get(id).await?))
}

/// PUT /shopkeepers/{id}
#[tracing::instrument(skip(state, _user, cmd))]
pub async fn update<S: UserStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _user: CurrentUser,
    ApiPath(id): ApiPath<ShopkeeperId>,
    ApiJson(cmd): ApiJson<UpdateShopkeeper>,
) -> Result<Json<Shopkeeper>, ApiError> {
    Ok(Json(state.shopkeepers.update(id, cmd).await?))
}

/// DELETE /shopkeepers/{id}: soft delete.
#[tracing::instrument(skip(state, _user))]
pub async fn deactivate<S: UserStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _user: CurrentUser,
    ApiPath(id): ApiPath<ShopkeeperId>,
) -> Result<StatusCode, ApiError> {
    state.shopkeepers.deactivate(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
