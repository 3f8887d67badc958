use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, HeaderMap},
};

use crate::util::ip::{client_ip, location_label, peer_ip};

/// Network-level facts about the caller, captured once per request.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub location: Option<String>,
}

impl ClientInfo {
    /// Resolve from proxy headers, falling back to the socket peer address
    /// for direct connections.
    pub fn resolve(headers: &HeaderMap, peer: Option<SocketAddr>) -> Self {
        let ip = client_ip(headers).or_else(|| peer.map(|addr| peer_ip(addr.ip())));
        let location = ip.as_deref().map(location_label);
        let user_agent = headers
            .get(axum::http::header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());
        ClientInfo {
            ip,
            user_agent,
            location,
        }
    }

    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self::resolve(headers, None)
    }
}

impl<S> FromRequestParts<S> for ClientInfo
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|info| info.0);
        Ok(ClientInfo::resolve(&parts.headers, peer))
    }
}
