//! Seller endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use common::{SellerId, ZoneId};
use domain::{ChangeZone, CreateSeller, SellerSummary, UpdateSeller};
use serde::Deserialize;
use store::{Seller, SellerQuery, UserStore};

use super::{default_limit, default_true, page};
use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListSellersParams {
    pub zone_id: Option<ZoneId>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

/// POST /sellers
#[tracing::instrument(skip(state, _user, cmd))]
pub async fn create<S: UserStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _user: CurrentUser,
    ApiJson(cmd): ApiJson<CreateSeller>,
) -> Result<(StatusCode, Json<Seller>), ApiError> {
    let seller = state.sellers.create(cmd).await?;
    Ok((StatusCode::CREATED, Json(seller)))
}

/// GET /sellers
#[tracing::instrument(skip(state, _user))]
pub async fn list<S: UserStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _user: CurrentUser,
    ApiQuery(params): ApiQuery<ListSellersParams>,
) -> Result<Json<Vec<SellerSummary>>, ApiError> {
    let mut query = SellerQuery::new()
        .active(params.is_active)
        .page(page(params.skip, params.limit)?);
    if let Some(zone_id) = params.zone_id {
        query = query.zone(zone_id);
    }
    Ok(Json(state.sellers.list(&query).await?))
}

/// GET /sellers/{id}
#[tracing::instrument(skip(state, _user))]
pub async fn get<S: UserStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _user: CurrentUser,
    ApiPath(id): ApiPath<SellerId>,
) -> Result<Json<Seller>, ApiError> {
    Ok(Json(state.sellers.get(id).await?))
}

/// PUT /sellers/{id}
#[tracing::instrument(skip(state, _user, cmd))]
pub async fn update<S: UserStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _user: CurrentUser,
    ApiPath(id): ApiPath<SellerId>,
    ApiJson(cmd): ApiJson<UpdateSeller>,
) -> Result<Json<Seller>, ApiError> {
    Ok(Json(state.sellers.update(id, cmd).await?))
}

/// DELETE /sellers/{id}: soft delete.
#[tracing::instrument(skip(state, _user))]
pub async fn deactivate<S: UserStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _user: CurrentUser,
    ApiPath(id): ApiPath<SellerId>,
) -> Result<StatusCode, ApiError> {
    state.sellers.deactivate(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /sellers/{id}/change-zone
#[tracing::instrument(skip(state, _user, cmd))]
pub async fn change_zone<S: UserStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _user: CurrentUser,
    ApiPath(id): ApiPath<SellerId>,
    ApiJson(cmd): ApiJson<ChangeZone>,
) -> Result<Json<Seller>, ApiError> {
    Ok(Json(state.sellers.change_zone(id, cmd).await?))
}
