//! Liveness and readiness endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Serialize;
use store::UserStore;

use crate::state::AppState;

#[derive(Serialize)]
pub struct LivenessResponse {
    pub status: &'static str,
    pub service: String,
    pub version: String,
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: String,
    pub database: &'static str,
}

/// GET /health: the process is up. Never touches the database.
pub async fn live<S: UserStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "healthy",
        service: state.app_name.clone(),
        version: state.app_version.clone(),
    })
}

/// GET {prefix}/health: reports whether the store answers.
pub async fn ready<S: UserStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Json<ReadinessResponse> {
    let (status, database) = match state.store.ping().await {
        Ok(()) => ("healthy", "connected"),
        Err(err) => {
            tracing::warn!(error = %err, "database ping failed");
            ("unhealthy", "disconnected")
        }
    };

    Json(ReadinessResponse {
        status,
        service: "MS-USER",
        version: state.app_version.clone(),
        database,
    })
}
