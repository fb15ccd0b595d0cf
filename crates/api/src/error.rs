//! API error types with HTTP response mapping.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use domain::{CatalogError, DomainError, ZoneError};

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// The request body, query or path could not be decoded.
    Unprocessable(String),
    /// Missing or invalid bearer token.
    Unauthorized(String),
    /// Authenticated, but not allowed.
    Forbidden(String),
    /// Domain logic error.
    Domain(DomainError),
}

impl ApiError {
    fn status_and_message(self) -> (StatusCode, String) {
        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::Domain(err) => domain_error_to_response(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        let body = serde_json::json!({ "error": message });
        let mut response = (status, axum::Json(body)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, String) {
    match &err {
        DomainError::NotFound { .. } => (StatusCode::NOT_FOUND, err.to_string()),
        DomainError::Conflict(_) | DomainError::Rejected(_) => {
            (StatusCode::BAD_REQUEST, err.to_string())
        }
        DomainError::InvalidTransition { .. } => (StatusCode::BAD_REQUEST, err.to_string()),
        DomainError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, err.to_string()),
        DomainError::Forbidden(_) => (StatusCode::FORBIDDEN, err.to_string()),
        DomainError::Zone(ZoneError::NotFound(_)) => (StatusCode::NOT_FOUND, err.to_string()),
        DomainError::Zone(ZoneError::Unavailable(_)) => {
            tracing::warn!(error = %err, "geo service unavailable");
            (StatusCode::SERVICE_UNAVAILABLE, err.to_string())
        }
        DomainError::Catalog(catalog) => {
            tracing::warn!(error = %err, "product service call failed");
            let status = match catalog {
                CatalogError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                CatalogError::Timeout => StatusCode::GATEWAY_TIMEOUT,
                CatalogError::BadStatus(_) => StatusCode::BAD_GATEWAY,
            };
            (status, err.to_string())
        }
        DomainError::Store(_) => {
            tracing::error!(error = %err, "store failure");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Unprocessable(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Unprocessable(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Unprocessable(rejection.body_text())
    }
}
