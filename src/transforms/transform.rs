//! The closed set of transform steps.

use crate::transforms::header::{
    RequestHeaderRemoveTransform, RequestHeaderTransform, ResponseHeaderRemoveTransform,
    ResponseHeaderTransform,
};
use crate::transforms::path::{PathRouteValuesTransform, PathStringTransform};
use crate::transforms::pipeline::PipelineOption;
use crate::transforms::query::{QueryParameterTransform, QueryRemoveParameterTransform};
use crate::transforms::state::{RequestState, ResponseState};

/// Whether a value replaces existing ones or is added next to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueMode {
    Set,
    Append,
}

/// A step applied to the outgoing request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestTransform {
    PathString(PathStringTransform),
    PathRouteValues(PathRouteValuesTransform),
    Header(RequestHeaderTransform),
    HeaderRemove(RequestHeaderRemoveTransform),
    QueryParameter(QueryParameterTransform),
    QueryRemoveParameter(QueryRemoveParameterTransform),
}

impl RequestTransform {
    pub fn apply(&self, state: &mut RequestState) {
        match self {
            RequestTransform::PathString(t) => t.apply(state),
            RequestTransform::PathRouteValues(t) => t.apply(state),
            RequestTransform::Header(t) => t.apply(state),
            RequestTransform::HeaderRemove(t) => t.apply(state),
            RequestTransform::QueryParameter(t) => t.apply(state),
            RequestTransform::QueryRemoveParameter(t) => t.apply(state),
        }
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            RequestTransform::PathString(t) => t.mode().key(),
            RequestTransform::PathRouteValues(_) => "PathRouteValues",
            RequestTransform::Header(_) => "RequestHeader",
            RequestTransform::HeaderRemove(_) => "RequestHeaderRemove",
            RequestTransform::QueryParameter(t) => t.kind(),
            RequestTransform::QueryRemoveParameter(_) => "QueryRemoveParameter",
        }
    }
}

/// A step applied to the upstream response.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseTransform {
    Header(ResponseHeaderTransform),
    HeaderRemove(ResponseHeaderRemoveTransform),
}

impl ResponseTransform {
    pub fn apply(&self, state: &mut ResponseState) {
        match self {
            ResponseTransform::Header(t) => t.apply(state),
            ResponseTransform::HeaderRemove(t) => t.apply(state),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ResponseTransform::Header(_) => "ResponseHeader",
            ResponseTransform::HeaderRemove(_) => "ResponseHeaderRemove",
        }
    }
}

/// Everything a validated transform entry can contribute to a route.
#[derive(Debug, Clone, PartialEq)]
pub enum Transform {
    Request(RequestTransform),
    Response(ResponseTransform),
    /// A pipeline-wide switch rather than an ordered step.
    Option(PipelineOption),
}

impl From<RequestTransform> for Transform {
    fn from(t: RequestTransform) -> Self {
        Transform::Request(t)
    }
}

impl From<ResponseTransform> for Transform {
    fn from(t: ResponseTransform) -> Self {
        Transform::Response(t)
    }
}

impl From<PipelineOption> for Transform {
    fn from(option: PipelineOption) -> Self {
        Transform::Option(option)
    }
}
