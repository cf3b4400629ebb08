//! Pure request/response header and path transforms.

use axum::http::{header, HeaderMap, HeaderName};
use url::Url;

use crate::error::ProxyError;

/// Headers that describe a single connection and must not be forwarded.
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Strip the mount prefix from a path-and-query: `/search?q=x` → `/?q=x`.
///
/// Inputs not under the mount are returned unchanged.
pub fn strip_mount(path_and_query: &str, mount: &str) -> String {
    match path_and_query.strip_prefix(mount) {
        Some("") => "/".to_string(),
        Some(rest) if rest.starts_with('/') => rest.to_string(),
        Some(rest) if rest.starts_with('?') => format!("/{rest}"),
        _ => path_and_query.to_string(),
    }
}

/// Join a rewritten path-and-query onto the upstream base URL.
pub fn upstream_url(target: &Url, path_and_query: &str) -> Result<Url, ProxyError> {
    let joined = format!("{}{}", target.as_str().trim_end_matches('/'), path_and_query);
    Url::parse(&joined).map_err(|e| ProxyError::InvalidUpstreamUri(format!("{joined}: {e}")))
}

/// Remove hop-by-hop headers, including any listed in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
}
