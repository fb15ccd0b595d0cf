//! Seller incident endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use common::{IncidentId, IncidentKind, SellerId, ShopkeeperId, VisitId};
use domain::{IncidentView, RecordIncident, UpdateIncident};
use serde::Deserialize;
use store::{IncidentQuery, SellerIncident, UserStore};

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListIncidentsParams {
    pub seller_id: Option<SellerId>,
    pub shopkeeper_id: Option<ShopkeeperId>,
    pub visit_id: Option<VisitId>,
    /// Parsed by hand so an unknown type is a `400`.
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl ListIncidentsParams {
    fn into_query(self) -> Result<IncidentQuery, ApiError> {
        let kind = self
            .kind
            .filter(|kind| !kind.is_empty())
            .map(|kind| kind.parse::<IncidentKind>())
            .transpose()
            .map_err(|err| ApiError::BadRequest(format!("Invalid incident type: {}", err.value)))?;

        Ok(IncidentQuery {
            seller_id: self.seller_id,
            shopkeeper_id: self.shopkeeper_id,
            visit_id: self.visit_id,
            kind,
        })
    }
}

/// GET /seller-incidents
#[tracing::instrument(skip(state, _user))]
pub async fn list<S: UserStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _user: CurrentUser,
    ApiQuery(params): ApiQuery<ListIncidentsParams>,
) -> Result<Json<Vec<IncidentView>>, ApiError> {
    let query = params.into_query()?;
    Ok(Json(state.incidents.list(&query).await?))
}

/// POST /seller-incidents
#[tracing::instrument(skip(state, _user, cmd))]
pub async fn record<S: UserStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _user: CurrentUser,
    ApiJson(cmd): ApiJson<RecordIncident>,
) -> Result<(StatusCode, Json<SellerIncident>), ApiError> {
    let incident = state.incidents.record(cmd).await?;
    Ok((StatusCode::CREATED, Json(incident)))
}

/// GET /seller-incidents/{id}
#[tracing::instrument(skip(state, _user))]
pub async fn get<S: UserStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _user: CurrentUser,
    ApiPath(id): ApiPath<IncidentId>,
) -> Result<Json<IncidentView>, ApiError> {
    Ok(Json(state.incidents.get(id).await?))
}

/// PUT /seller-incidents/{id}
#[tracing::instrument(skip(state, _user, cmd))]
pub async fn update<S: UserStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _user: CurrentUser,
    ApiPath(id): ApiPath<IncidentId>,
    ApiJson(cmd): ApiJson<UpdateIncident>,
) -> Result<Json<SellerIncident>, ApiError> {
    Ok(Json(state.incidents.update(id, cmd).await?))
}

/// DELETE /seller-incidents/{id}
#[tracing::instrument(skip(state, _user))]
pub async fn delete<S: UserStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _user: CurrentUser,
    ApiPath(id): ApiPath<IncidentId>,
) -> Result<StatusCode, ApiError> {
    state.incidents.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(kind: Option<&str>) -> ListIncidentsParams {
        ListIncidentsParams {
            seller_id: Some(SellerId::new(3)),
            shopkeeper_id: None,
            visit_id: None,
            kind: kind.map(str::to_string),
        }
    }

    #[test]
    fn known_type_filters() {
        let query = params(Some("delay")).into_query().unwrap();
        assert_eq!(query.kind, Some(IncidentKind::Delay));
        assert_eq!(query.seller_id, Some(SellerId::new(3)));
    }

    #[test]
    fn unknown_type_is_bad_request() {
        assert!(matches!(
            params(Some("late")).into_query(),
            Err(ApiError::BadRequest(_))
        ));
        assert_eq!(params(None).into_query().unwrap().kind, None);
    }
}
