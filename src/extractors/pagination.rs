use axum::{extract::FromRequestParts, http::request::Parts};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::error::ApiError;

const DEFAULT_LIMIT: u64 = 20;
const MAX_LIMIT: u64 = 100;

/// Limit/offset pagination parsed from the query string.
///
/// The limit is clamped to 100 so a single request can never drag an
/// unbounded slice of an audit table into memory.
#[derive(Debug, Clone, Copy, Deserialize, IntoParams)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
}

fn default_limit() -> u64 {
    DEFAULT_LIMIT
}

impl Default for Pagination {
    fn default() -> Self {
        Pagination {
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl Pagination {
    pub fn clamped(self) -> Self {
        Pagination {
            limit: self.limit.min(MAX_LIMIT).max(1),
            offset: self.offset,
        }
    }
}

impl<S> FromRequestParts<S> for Pagination
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let query = parts.uri.query().unwrap_or("");
        let page: Pagination = serde_urlencoded::from_str(query)
            .map_err(|e| ApiError::BadRequest(format!("Invalid pagination parameters: {}", e)))?;
        Ok(page.clamped())
    }
}
