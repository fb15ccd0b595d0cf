//! Route planning endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use common::SellerId;
use domain::{AlgorithmComparison, Coordinates, OptimizedRoute};
use serde::Deserialize;
use store::UserStore;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::extract::{ApiPath, ApiQuery};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StartPointParams {
    pub start_latitude: Option<f64>,
    pub start_longitude: Option<f64>,
}

impl StartPointParams {
    /// The start point counts only when both coordinates are given.
    fn start(&self) -> Option<Coordinates> {
        Some(Coordinates::new(self.start_latitude?, self.start_longitude?))
    }
}

#[derive(Debug, Deserialize)]
pub struct CompareParams {
    pub seller_id: SellerId,
}

/// GET /sellers/{id}/optimized-route
#[tracing::instrument(skip(state, _user))]
pub async fn optimized_route<S: UserStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _user: CurrentUser,
    ApiPath(seller_id): ApiPath<SellerId>,
    ApiQuery(params): ApiQuery<StartPointParams>,
) -> Result<Json<OptimizedRoute>, ApiError> {
    Ok(Json(
        state
            .routes
            .optimized_route(seller_id, params.start())
            .await?,
    ))
}

/// GET /routes/compare-algorithms
#[tracing::instrument(skip(state, _user))]
pub async fn compare_algorithms<S: UserStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _user: CurrentUser,
    ApiQuery(params): ApiQuery<CompareParams>,
) -> Result<Json<AlgorithmComparison>, ApiError> {
    Ok(Json(state.routes.compare(params.seller_id).await?))
}
