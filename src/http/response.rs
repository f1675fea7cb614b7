//! Response handling and transformation.
//!
//! # Responsibilities
//! - Run the route's response transforms on the upstream status and headers
//! - Relay the upstream body without buffering
//! - Map proxy failures to status codes
//!
//! # Design Decisions
//! - Streaming responses avoid buffering entire body
//! - Hop-by-hop headers stripped automatically
//! - A proxy-generated 502 still passes through `Always` response transforms

use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::http::request::strip_hop_by_hop;
use crate::transforms::executor::apply_response_transforms;
use crate::transforms::pipeline::CompiledTransformPipeline;
use crate::transforms::state::ResponseState;

/// Relay an upstream response to the client after transforming its headers.
pub fn relay(response: Response, pipeline: &CompiledTransformPipeline) -> Response {
    let (mut parts, body) = response.into_parts();
    let mut headers = std::mem::take(&mut parts.headers);
    strip_hop_by_hop(&mut headers);

    let state = transform(parts.status, headers, pipeline);
    parts.status = state.status;
    parts.headers = state.headers;
    Response::from_parts(parts, body)
}

/// A response generated by the proxy itself.
pub fn proxy_error(status: StatusCode, message: &'static str, pipeline: Option<&CompiledTransformPipeline>) -> Response {
    let mut response = (status, message).into_response();
    if let Some(pipeline) = pipeline {
        let headers = std::mem::take(response.headers_mut());
        let state = transform(status, headers, pipeline);
        *response.headers_mut() = state.headers;
    }
    response
}

fn transform(status: StatusCode, headers: HeaderMap, pipeline: &CompiledTransformPipeline) -> ResponseState {
    let mut state = ResponseState::new(status);
    state.headers = headers;
    apply_response_transforms(pipeline, &mut state);
    state
}
