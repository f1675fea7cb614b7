//! Request handling and transformation.
//!
//! # Responsibilities
//! - Extract routing-relevant information (host, path, raw query)
//! - Seed the `RequestState` that request transforms operate on
//! - Build the upstream request from the transformed state
//!
//! # Design Decisions
//! - Hop-by-hop headers never reach the transforms or the upstream
//! - `Host` is dropped unless the route keeps the original host; the
//!   client then derives it from the upstream URI

use axum::body::Body;
use axum::http::header::{self, HeaderMap, HeaderName};
use axum::http::request::Parts;
use axum::http::{Request, Uri};
use url::{Position, Url};

use crate::transforms::pipeline::PipelineOptions;
use crate::transforms::state::{RequestState, RouteValues};

/// Header name for request correlation.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Connection-scoped headers that a proxy must not forward.
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

/// Remove hop-by-hop headers, including any named by `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in named.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
    headers.remove("proxy-connection");
}

/// The host the client addressed, from `Host` or the URI authority.
pub fn request_host(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| parts.uri.authority().map(|a| a.as_str()))
}

/// Seed the state request transforms run against.
pub fn request_state(parts: &Parts, route_values: RouteValues, options: PipelineOptions) -> RequestState {
    let mut headers = if options.copy_request_headers {
        parts.headers.clone()
    } else {
        HeaderMap::new()
    };
    strip_hop_by_hop(&mut headers);
    if options.use_original_host {
        if let Some(host) = parts.headers.get(header::HOST) {
            headers.insert(header::HOST, host.clone());
        }
    } else {
        headers.remove(header::HOST);
    }

    RequestState::new(parts.uri.path())
        .with_method(parts.method.clone())
        .with_query(parts.uri.query())
        .with_headers(headers)
        .with_route_values(route_values)
}

/// `destination` joined with the transformed path and query.
///
/// The path is percent-encoded for the wire: characters such as `#`, `?` and
/// space are escaped, while existing `%XX` escapes pass through unchanged.
pub fn upstream_uri(destination: &Url, state: &RequestState) -> Result<Uri, axum::http::Error> {
    let mut target = destination.clone();
    let base = destination.path().trim_end_matches('/');
    target.set_path(&format!("{}{}", base, state.path));

    let mut uri = target[..Position::AfterPath].to_string();
    if let Some(query) = state.query.to_query_string() {
        uri.push('?');
        uri.push_str(&query);
    }
    Ok(uri.parse::<Uri>()?)
}

/// Assemble the request sent to the destination.
pub fn upstream_request(
    destination: &Url,
    state: RequestState,
    body: Body,
) -> Result<Request<Body>, axum::http::Error> {
    let uri = upstream_uri(destination, &state)?;
    let mut request = Request::builder()
        .method(state.method)
        .uri(uri)
        .body(body)?;
    *request.headers_mut() = state.headers;
    Ok(request)
}
