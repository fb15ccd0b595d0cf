//! Assignment endpoints: who covers which shopkeeper, and since when.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use common::{AssignmentId, SellerId, ShopkeeperId};
use domain::{AssignShopkeeper, AssignmentHistory, AssignmentView, Reassign};
use serde::Deserialize;
use store::{AssignmentQuery, UserStore};

use super::{default_limit, default_true, page};
use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListAssignmentsParams {
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub seller_id: Option<SellerId>,
    pub shopkeeper_id: Option<ShopkeeperId>,
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

/// POST /assign
#[tracing::instrument(skip(state, actor, cmd))]
pub async fn assign<S: UserStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(actor): CurrentUser,
    ApiJson(cmd): ApiJson<AssignShopkeeper>,
) -> Result<(StatusCode, Json<AssignmentView>), ApiError> {
    let view = state.assignments.assign(&actor, cmd).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// POST /reassign
#[tracing::instrument(skip(state, actor, cmd))]
pub async fn reassign<S: UserStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(actor): CurrentUser,
    ApiJson(cmd): ApiJson<Reassign>,
) -> Result<Json<AssignmentView>, ApiError> {
    Ok(Json(state.assignments.reassign(&actor, cmd).await?))
}

/// GET /assignments
#[tracing::instrument(skip(state, _user))]
pub async fn list<S: UserStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _user: CurrentUser,
    ApiQuery(params): ApiQuery<ListAssignmentsParams>,
) -> Result<Json<Vec<AssignmentView>>, ApiError> {
    let mut query = AssignmentQuery::new()
        .active(params.is_active)
        .page(page(params.skip, params.limit)?);
    if let Some(seller_id) = params.seller_id {
        query = query.seller(seller_id);
    }
    if let Some(shopkeeper_id) = params.shopkeeper_id {
        query = query.shopkeeper(shopkeeper_id);
    }
    Ok(Json(state.assignments.list(&query).await?))
}

/// GET /assignments/history/{shopkeeper_id}
#[tracing::instrument(skip(state, _user))]
pub async fn history<S: UserStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _user: CurrentUser,
    ApiPath(shopkeeper_id): ApiPath<ShopkeeperId>,
) -> Result<Json<AssignmentHistory>, ApiError> {
    Ok(Json(state.assignments.history(shopkeeper_id).await?))
}

/// DELETE /assignments/{id}
#[tracing::instrument(skip(state, actor))]
pub async fn unassign<S: UserStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(actor): CurrentUser,
    ApiPath(id): ApiPath<AssignmentId>,
) -> Result<StatusCode, ApiError> {
    state.assignments.unassign(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
