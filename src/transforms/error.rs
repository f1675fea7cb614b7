//! Transform build errors.

use thiserror::Error;

use crate::transforms::template::TemplateError;

/// Why a single transform entry was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    #[error("no transform recognizes the keys [{keys}]")]
    Unrecognized { keys: String },

    #[error("{kind} expects {expected} parameter(s), found [{keys}]")]
    UnexpectedParameters {
        kind: &'static str,
        expected: &'static str,
        keys: String,
    },

    #[error("{kind} requires one of: {expected}")]
    MissingParameter {
        kind: &'static str,
        expected: &'static str,
    },

    #[error("{kind}: invalid value '{value}' for '{parameter}': {reason}")]
    InvalidValue {
        kind: &'static str,
        parameter: &'static str,
        value: String,
        reason: String,
    },

    #[error("{kind}: {source}")]
    Template {
        kind: &'static str,
        #[source]
        source: TemplateError,
    },

    #[error("{kind}: route value '{name}' is required but the route path does not capture it")]
    UnboundRouteValue { kind: &'static str, name: String },
}

/// A `TransformError` attributed to its route and entry position.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("route '{route}', transform #{index}: {error}")]
pub struct TransformBuildError {
    pub route: String,
    pub index: usize,
    #[source]
    pub error: TransformError,
}
