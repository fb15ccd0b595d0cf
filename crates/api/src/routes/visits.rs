//! Visit endpoints. Sellers plan, edit and close their own visits;
//! administrators read all of them.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{SellerId, ShopkeeperId, VisitId, VisitStatus};
use domain::{
    CancelVisit, RestockSummary, ScheduleVisit, ShopkeeperLowStock, UpdateVisit, VisitFilter,
    VisitList, VisitView,
};
use serde::Deserialize;
use store::{SellerIncident, UserStore, Visit};

use super::{default_limit, page};
use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListVisitsParams {
    pub status: Option<VisitStatus>,
    pub shopkeeper_id: Option<ShopkeeperId>,
    /// Ignored unless the caller is an administrator.
    pub seller_id: Option<SellerId>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

/// GET /visits
#[tracing::instrument(skip(state, actor), fields(role = %actor.role.as_str()))]
pub async fn list<S: UserStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(actor): CurrentUser,
    ApiQuery(params): ApiQuery<ListVisitsParams>,
) -> Result<Json<VisitList>, ApiError> {
    let filter = VisitFilter {
        status: params.status,
        shopkeeper_id: params.shopkeeper_id,
        seller_id: params.seller_id,
        from: params.start_date,
        to: params.end_date,
        page: page(params.skip, params.limit)?,
    };
    Ok(Json(state.visits.list(&actor, filter).await?))
}

/// GET /visits/{id}
#[tracing::instrument(skip(state, actor))]
pub async fn get<S: UserStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(actor): CurrentUser,
    ApiPath(id): ApiPath<VisitId>,
) -> Result<Json<VisitView>, ApiError> {
    Ok(Json(state.visits.get(&actor, id).await?))
}

/// POST /visits
#[tracing::instrument(skip(state, actor, cmd))]
pub async fn schedule<S: UserStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(actor): CurrentUser,
    ApiJson(cmd): ApiJson<ScheduleVisit>,
) -> Result<(StatusCode, Json<Visit>), ApiError> {
    let visit = state.visits.schedule(&actor, cmd).await?;
    Ok((StatusCode::CREATED, Json(visit)))
}

/// PUT /visits/{id}
#[tracing::instrument(skip(state, actor, cmd))]
pub async fn update<S: UserStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(actor): CurrentUser,
    ApiPath(id): ApiPath<VisitId>,
    ApiJson(cmd): ApiJson<UpdateVisit>,
) -> Result<Json<Visit>, ApiError> {
    Ok(Json(state.visits.update(&actor, id, cmd).await?))
}

/// PATCH /visits/{id}/cancel. The body is optional.
#[tracing::instrument(skip(state, actor, body))]
pub async fn cancel<S: UserStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(actor): CurrentUser,
    ApiPath(id): ApiPath<VisitId>,
    body: Bytes,
) -> Result<Json<Visit>, ApiError> {
    let cmd = if body.iter().all(u8::is_ascii_whitespace) {
        CancelVisit::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::Unprocessable(e.to_string()))?
    };
    Ok(Json(state.visits.cancel(&actor, id, cmd).await?))
}

/// PATCH /visits/{id}/complete
#[tracing::instrument(skip(state, actor))]
pub async fn complete<S: UserStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(actor): CurrentUser,
    ApiPath(id): ApiPath<VisitId>,
) -> Result<Json<Visit>, ApiError> {
    Ok(Json(state.visits.complete(&actor, id).await?))
}

/// GET /visits/{id}/incidents
#[tracing::instrument(skip(state, _user))]
pub async fn incidents<S: UserStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _user: CurrentUser,
    ApiPath(id): ApiPath<VisitId>,
) -> Result<Json<Vec<SellerIncident>>, ApiError> {
    Ok(Json(state.incidents.for_visit(id).await?))
}

#[derive(Debug, Deserialize)]
pub struct LowStockParams {
    /// Ignored unless the caller is an administrator.
    pub seller_id: Option<SellerId>,
}

/// GET /visits/shopkeepers/low-stock
#[tracing::instrument(skip(state, actor))]
pub async fn low_stock_shopkeepers<S: UserStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(actor): CurrentUser,
    ApiQuery(params): ApiQuery<LowStockParams>,
) -> Result<Json<Vec<ShopkeeperLowStock>>, ApiError> {
    Ok(Json(
        state
            .visits
            .low_stock_shopkeepers(&actor, params.seller_id)
            .await?,
    ))
}

/// GET /visits/shopkeepers/{id}/inventory-summary
#[tracing::instrument(skip(state, actor))]
pub async fn restock_summary<S: UserStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(actor): CurrentUser,
    ApiPath(shopkeeper_id): ApiPath<ShopkeeperId>,
) -> Result<Json<RestockSummary>, ApiError> {
    Ok(Json(state.visits.restock_summary(&actor, shopkeeper_id).await?))
}
