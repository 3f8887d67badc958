use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::auth::SessionClaims;
use crate::controllers::AppState;
use crate::error::ApiError;

/// Extractor that requires a valid bearer access token.
///
/// Handlers that take `AuthUser` reject unauthenticated requests before the
/// handler body runs; the development header fallback accepted by the
/// identity middleware is deliberately not honored here.
#[derive(Debug, Clone)]
pub struct AuthUser(pub SessionClaims);

impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);

        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;

        let claims = state.codec.verify(token)?;
        Ok(AuthUser(claims))
    }
}
