//! Identity middleware.
//!
//! Resolves the caller's identity once per request and attaches it as a
//! request extension. Extensions live exactly as long as the request, so
//! teardown is unconditional on every exit path, including panics unwound
//! by the runtime.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::context::Identity;
use crate::controllers::AppState;

/// Resolve the request identity and stash it as an extension.
///
/// Resolution order: valid bearer token, then the `X-User-Id` /
/// `X-Username` development headers, then the `system` sentinel. An invalid
/// token does not fail the request here; handlers that require
/// authentication enforce it via the `AuthUser` extractor.
pub async fn identity_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let identity = resolve_identity(&state, &req);
    req.extensions_mut().insert(identity);
    next.run(req).await
}

fn resolve_identity(state: &AppState, req: &Request) -> Identity {
    let bearer = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    if let Some(token) = bearer {
        if let Ok(claims) = state.codec.verify(token) {
            return Identity::new(claims.user_id, claims.username);
        }
    }

    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(|v| v.to_string())
    };
    if let Some(user_id) = header("x-user-id") {
        let username = header("x-username").unwrap_or_else(|| user_id.clone());
        return Identity::new(user_id, username);
    }

    Identity::system()
}
