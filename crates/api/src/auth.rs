//! Bearer token authentication.
//!
//! Tokens are issued by the auth service and verified here with the shared
//! secret. The `sub` claim carries the caller's email, `role` one of
//! `ADMIN`, `VENDEDOR` or `TENDERO`, and `user_id` the auth service's id.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use common::UserId;
use domain::{Actor, Role};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use store::UserStore;

use crate::error::ApiError;
use crate::state::AppState;

const INVALID_CREDENTIALS: &str = "Could not validate credentials";

/// Claims read from the token. Only `sub` is mandatory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub user_id: Option<i64>,
    /// Checked when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
}

/// Verifies HMAC-signed tokens and turns them into an [`Actor`].
#[derive(Clone)]
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str, algorithm: Algorithm) -> Self {
        let mut validation = Validation::new(algorithm);
        validation.required_spec_claims.clear();
        validation.validate_aud = false;
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<Actor, ApiError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.key, &self.validation).map_err(
            |err| {
                tracing::debug!(error = %err, "rejected bearer token");
                ApiError::Unauthorized(INVALID_CREDENTIALS.to_string())
            },
        )?;

        let claims = data.claims;
        let email = claims
            .sub
            .filter(|sub| !sub.trim().is_empty())
            .ok_or_else(|| ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;
        let role = Role::parse(claims.role.as_deref().unwrap_or_default());

        Ok(Actor::new(email, role, claims.user_id.map(UserId::new)))
    }
}

/// Pulls the token out of an `Authorization: Bearer <token>` header.
fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let value = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Not authenticated".to_string()))?;

    match value.split_once(' ') {
        Some((scheme, token))
            if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() =>
        {
            Ok(token.trim())
        }
        _ => Err(ApiError::Unauthorized("Not authenticated".to_string())),
    }
}

/// Any authenticated caller.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Actor);

impl<S: UserStore + 'static> FromRequestParts<Arc<AppState<S>>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;
        let actor = state.jwt.verify(token)?;
        Ok(CurrentUser(actor))
    }
}
