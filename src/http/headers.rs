//! Hop-by-hop header handling.
//!
//! Forwarding is verbatim unless `forwarding.strip_hop_by_hop` is set, in
//! which case both directions drop the RFC 7230 §6.1 connection-scoped
//! headers. `Host` is never touched.

use axum::http::header::{CONNECTION, HOST};
use axum::http::HeaderMap;

/// Headers that only describe the current transport connection.
pub const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Remove hop-by-hop headers, including any named by `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<String> = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(|name| name.trim().to_ascii_lowercase())
        .filter(|name| !name.is_empty() && name != HOST.as_str())
        .collect();

    for name in &listed {
        headers.remove(name.as_str());
    }
    for name in HOP_BY_HOP {
        headers.remove(*name);
    }
}
