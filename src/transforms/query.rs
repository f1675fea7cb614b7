//! Query string transforms.
//!
//! The inbound query is only parsed once a transform touches it. Names match
//! case-insensitively; an empty resolved value leaves the query untouched.

use crate::config::schema::TransformEntry;
use crate::transforms::context::TransformBuilderContext;
use crate::transforms::error::TransformError;
use crate::transforms::factory::{expect_parameters, TransformFactory};
use crate::transforms::header::value_parameter;
use crate::transforms::state::RequestState;
use crate::transforms::template::BindPolicy;
use crate::transforms::transform::{RequestTransform, Transform, ValueMode};

const QUERY_VALUE_PARAMETER: &str = "QueryValueParameter";
const QUERY_ROUTE_PARAMETER: &str = "QueryRouteParameter";
const QUERY_REMOVE_PARAMETER: &str = "QueryRemoveParameter";

/// Where a query parameter's value comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValueSource {
    Static(String),
    /// Name of a route value captured by the route pattern.
    RouteValue(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParameterTransform {
    name: String,
    source: QueryValueSource,
    mode: ValueMode,
}

impl QueryParameterTransform {
    pub fn new(name: impl Into<String>, source: QueryValueSource, mode: ValueMode) -> Self {
        Self {
            name: name.into(),
            source,
            mode,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &QueryValueSource {
        &self.source
    }

    pub fn kind(&self) -> &'static str {
        match self.source {
            QueryValueSource::Static(_) => QUERY_VALUE_PARAMETER,
            QueryValueSource::RouteValue(_) => QUERY_ROUTE_PARAMETER,
        }
    }

    pub fn apply(&self, state: &mut RequestState) {
        let value = match &self.source {
            QueryValueSource::Static(value) => value.as_str(),
            QueryValueSource::RouteValue(key) => state.route_values.get(key).unwrap_or_default(),
        };
        if value.is_empty() {
            return;
        }
        let value = value.to_string();
        match self.mode {
            ValueMode::Set => state.query.set(&self.name, &value),
            ValueMode::Append => state.query.append(&self.name, &value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRemoveParameterTransform {
    name: String,
}

impl QueryRemoveParameterTransform {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn apply(&self, state: &mut RequestState) {
        state.query.remove(&self.name);
    }
}

fn parameter_name(kind: &'static str, name: &str) -> Result<String, TransformError> {
    if name.is_empty() {
        return Err(TransformError::InvalidValue {
            kind,
            parameter: kind,
            value: String::new(),
            reason: "query parameter name is empty".to_string(),
        });
    }
    Ok(name.to_string())
}

/// Builds `QueryValueParameter`, `QueryRouteParameter` and
/// `QueryRemoveParameter` entries.
pub struct QueryTransformFactory;

impl QueryTransformFactory {
    fn check_route_value(
        ctx: &TransformBuilderContext,
        transform: &QueryParameterTransform,
    ) -> Result<(), TransformError> {
        let QueryValueSource::RouteValue(key) = transform.source() else {
            return Ok(());
        };
        if ctx.binder().policy() == BindPolicy::RequireAll
            && !ctx.shape().parameters().iter().any(|p| p.eq_ignore_ascii_case(key))
        {
            return Err(TransformError::UnboundRouteValue {
                kind: QUERY_ROUTE_PARAMETER,
                name: key.clone(),
            });
        }
        Ok(())
    }
}

impl TransformFactory for QueryTransformFactory {
    fn can_handle(&self, entry: &TransformEntry) -> bool {
        [QUERY_VALUE_PARAMETER, QUERY_ROUTE_PARAMETER, QUERY_REMOVE_PARAMETER]
            .iter()
            .any(|key| entry.contains_key(key))
    }

    fn validate(&self, entry: &TransformEntry) -> Result<Transform, TransformError> {
        if let Some(name) = entry.get(QUERY_VALUE_PARAMETER) {
            let kind = QUERY_VALUE_PARAMETER;
            expect_parameters(kind, entry, 2, "2 (name and Set or Append)")?;
            let (mode, _, value) = value_parameter(kind, entry)?;
            let source = QueryValueSource::Static(value.to_string());
            let transform = QueryParameterTransform::new(parameter_name(kind, name)?, source, mode);
            return Ok(RequestTransform::QueryParameter(transform).into());
        }

        if let Some(name) = entry.get(QUERY_ROUTE_PARAMETER) {
            let kind = QUERY_ROUTE_PARAMETER;
            expect_parameters(kind, entry, 2, "2 (name and Set or Append)")?;
            let (mode, parameter, key) = value_parameter(kind, entry)?;
            if key.is_empty() {
                return Err(TransformError::InvalidValue {
                    kind,
                    parameter,
                    value: String::new(),
                    reason: "route value name is empty".to_string(),
                });
            }
            let source = QueryValueSource::RouteValue(key.to_string());
            let transform = QueryParameterTransform::new(parameter_name(kind, name)?, source, mode);
            return Ok(RequestTransform::QueryParameter(transform).into());
        }

        let name = entry.get(QUERY_REMOVE_PARAMETER).ok_or(TransformError::MissingParameter {
            kind: "Query",
            expected: "QueryValueParameter, QueryRouteParameter, QueryRemoveParameter",
        })?;
        expect_parameters(QUERY_REMOVE_PARAMETER, entry, 1, "1")?;
        let transform =
            QueryRemoveParameterTransform::new(parameter_name(QUERY_REMOVE_PARAMETER, name)?);
        Ok(RequestTransform::QueryRemoveParameter(transform).into())
    }

    fn build(&self, ctx: &mut TransformBuilderContext, entry: &TransformEntry) -> bool {
        if !self.can_handle(entry) {
            return false;
        }
        let checked = self.validate(entry).and_then(|transform| {
            if let Transform::Request(RequestTransform::QueryParameter(t)) = &transform {
                Self::check_route_value(ctx, t)?;
            }
            Ok(transform)
        });
        match checked {
            Ok(transform) => {
                ctx.push(transform);
            }
            Err(error) => ctx.report(error),
        }
        true
    }
}

impl TransformBuilderContext {
    /// Set or append a query parameter with a fixed value.
    pub fn add_query_value(&mut self, name: impl Into<String>, value: impl Into<String>, mode: ValueMode) -> &mut Self {
        self.add_request_transform(RequestTransform::QueryParameter(QueryParameterTransform::new(
            name,
            QueryValueSource::Static(value.into()),
            mode,
        )))
    }

    /// Set or append a query parameter from a captured route value.
    pub fn add_query_route_value(
        &mut self,
        name: impl Into<String>,
        route_value: impl Into<String>,
        mode: ValueMode,
    ) -> &mut Self {
        self.add_request_transform(RequestTransform::QueryParameter(QueryParameterTransform::new(
            name,
            QueryValueSource::RouteValue(route_value.into()),
            mode,
        )))
    }

    pub fn add_query_remove(&mut self, name: impl Into<String>) -> &mut Self {
        self.add_request_transform(RequestTransform::QueryRemoveParameter(
            QueryRemoveParameterTransform::new(name),
        ))
    }
}
