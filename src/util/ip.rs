//! Client IP extraction and coarse location labelling.

use std::net::IpAddr;

use axum::http::HeaderMap;

/// Proxy headers consulted in order. Callers fall back to the socket peer
/// address when none is present.
const FORWARD_HEADERS: [&str; 5] = [
    "x-forwarded-for",
    "proxy-client-ip",
    "wl-proxy-client-ip",
    "http_client_ip",
    "http_x_forwarded_for",
];

/// Best-effort client IP from proxy headers.
///
/// `X-Forwarded-For` may hold a comma-separated chain; the first entry is the
/// originating client. The IPv6 loopback is normalized to `127.0.0.1`.
pub fn client_ip(headers: &HeaderMap) -> Option<String> {
    for name in FORWARD_HEADERS {
        let Some(value) = headers.get(name).and_then(|v| v.to_str().ok()) else {
            continue;
        };
        let candidate = value.split(',').next().unwrap_or(value).trim();
        if candidate.is_empty() || candidate.eq_ignore_ascii_case("unknown") {
            continue;
        }
        return Some(normalize_ip(candidate));
    }
    None
}

/// Printable form of the socket peer address, for direct (unproxied)
/// connections.
pub fn peer_ip(addr: IpAddr) -> String {
    normalize_ip(&addr.to_string())
}

fn normalize_ip(ip: &str) -> String {
    if ip == "::1" || ip == "0:0:0:0:0:0:0:1" {
        "127.0.0.1".to_string()
    } else {
        ip.to_string()
    }
}

/// Whether the address falls inside a private or loopback range.
pub fn is_internal_ip(ip: &str) -> bool {
    if ip == "127.0.0.1" || ip == "localhost" {
        return true;
    }
    if ip.starts_with("10.") || ip.starts_with("192.168.") {
        return true;
    }
    if let Some(rest) = ip.strip_prefix("172.") {
        if let Some(second) = rest.split('.').next() {
            if let Ok(octet) = second.parse::<u8>() {
                return (16..=31).contains(&octet);
            }
        }
    }
    false
}

/// Coarse location label stored alongside audit and login records.
pub fn location_label(ip: &str) -> String {
    if is_internal_ip(ip) {
        "intranet".to_string()
    } else {
        "extranet".to_string()
    }
}
