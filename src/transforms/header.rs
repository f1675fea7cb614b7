//! Header transforms for both directions, plus the request forwarding
//! switches (`RequestHeadersCopy`, `RequestHeaderOriginalHost`).

use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};

use crate::config::schema::TransformEntry;
use crate::transforms::context::TransformBuilderContext;
use crate::transforms::error::TransformError;
use crate::transforms::factory::{expect_parameters, parse_flag, TransformFactory};
use crate::transforms::pipeline::PipelineOption;
use crate::transforms::state::{RequestState, ResponseState};
use crate::transforms::transform::{RequestTransform, ResponseTransform, Transform, ValueMode};

const REQUEST_HEADER: &str = "RequestHeader";
const REQUEST_HEADER_REMOVE: &str = "RequestHeaderRemove";
const REQUEST_HEADERS_COPY: &str = "RequestHeadersCopy";
const REQUEST_HEADER_ORIGINAL_HOST: &str = "RequestHeaderOriginalHost";
const RESPONSE_HEADER: &str = "ResponseHeader";
const RESPONSE_HEADER_REMOVE: &str = "ResponseHeaderRemove";
const SET: &str = "Set";
const APPEND: &str = "Append";
const WHEN: &str = "When";

/// When a response transform runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseCondition {
    /// Only for status codes below 400.
    #[default]
    Success,
    Always,
}

impl ResponseCondition {
    pub fn applies(self, status: StatusCode) -> bool {
        match self {
            ResponseCondition::Success => status.as_u16() < 400,
            ResponseCondition::Always => true,
        }
    }

    fn parse(kind: &'static str, value: &str) -> Result<Self, TransformError> {
        if value.eq_ignore_ascii_case("Success") {
            Ok(ResponseCondition::Success)
        } else if value.eq_ignore_ascii_case("Always") {
            Ok(ResponseCondition::Always)
        } else {
            Err(TransformError::InvalidValue {
                kind,
                parameter: WHEN,
                value: value.to_string(),
                reason: "expected 'Success' or 'Always'".to_string(),
            })
        }
    }
}

fn write(headers: &mut HeaderMap, name: &HeaderName, value: &HeaderValue, mode: ValueMode) {
    match mode {
        ValueMode::Set => {
            headers.insert(name.clone(), value.clone());
        }
        ValueMode::Append => {
            headers.append(name.clone(), value.clone());
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHeaderTransform {
    name: HeaderName,
    value: HeaderValue,
    mode: ValueMode,
}

impl RequestHeaderTransform {
    pub fn new(name: HeaderName, value: HeaderValue, mode: ValueMode) -> Self {
        Self { name, value, mode }
    }

    pub fn name(&self) -> &HeaderName {
        &self.name
    }

    pub fn apply(&self, state: &mut RequestState) {
        write(&mut state.headers, &self.name, &self.value, self.mode);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHeaderRemoveTransform {
    name: HeaderName,
}

impl RequestHeaderRemoveTransform {
    pub fn new(name: HeaderName) -> Self {
        Self { name }
    }

    pub fn apply(&self, state: &mut RequestState) {
        state.headers.remove(&self.name);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHeaderTransform {
    name: HeaderName,
    value: HeaderValue,
    mode: ValueMode,
    when: ResponseCondition,
}

impl ResponseHeaderTransform {
    pub fn new(name: HeaderName, value: HeaderValue, mode: ValueMode, when: ResponseCondition) -> Self {
        Self {
            name,
            value,
            mode,
            when,
        }
    }

    pub fn apply(&self, state: &mut ResponseState) {
        if !self.when.applies(state.status) {
            return;
        }
        write(&mut state.headers, &self.name, &self.value, self.mode);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHeaderRemoveTransform {
    name: HeaderName,
    when: ResponseCondition,
}

impl ResponseHeaderRemoveTransform {
    pub fn new(name: HeaderName, when: ResponseCondition) -> Self {
        Self { name, when }
    }

    pub fn apply(&self, state: &mut ResponseState) {
        if self.when.applies(state.status) {
            state.headers.remove(&self.name);
        }
    }
}

fn header_name(kind: &'static str, value: &str) -> Result<HeaderName, TransformError> {
    HeaderName::from_bytes(value.as_bytes()).map_err(|e| TransformError::InvalidValue {
        kind,
        parameter: kind,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn header_value(
    kind: &'static str,
    parameter: &'static str,
    value: &str,
) -> Result<HeaderValue, TransformError> {
    HeaderValue::from_str(value).map_err(|e| TransformError::InvalidValue {
        kind,
        parameter,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// The `Set`/`Append` parameter of a header or query entry.
pub(crate) fn value_parameter<'e>(
    kind: &'static str,
    entry: &'e TransformEntry,
) -> Result<(ValueMode, &'static str, &'e str), TransformError> {
    match (entry.get(SET), entry.get(APPEND)) {
        (Some(value), None) => Ok((ValueMode::Set, SET, value)),
        (None, Some(value)) => Ok((ValueMode::Append, APPEND, value)),
        (Some(_), Some(_)) => Err(TransformError::UnexpectedParameters {
            kind,
            expected: "either Set or Append",
            keys: entry.describe_keys(),
        }),
        (None, None) => Err(TransformError::MissingParameter {
            kind,
            expected: "Set, Append",
        }),
    }
}

/// Optional `When` for response entries; returns the expected key count.
fn response_condition(
    kind: &'static str,
    entry: &TransformEntry,
    base: usize,
) -> Result<(ResponseCondition, usize), TransformError> {
    match entry.get(WHEN) {
        Some(value) => Ok((ResponseCondition::parse(kind, value)?, base + 1)),
        None => Ok((ResponseCondition::default(), base)),
    }
}

/// Builds request and response header entries.
pub struct HeaderTransformFactory;

impl TransformFactory for HeaderTransformFactory {
    fn can_handle(&self, entry: &TransformEntry) -> bool {
        [
            REQUEST_HEADER,
            REQUEST_HEADER_REMOVE,
            REQUEST_HEADERS_COPY,
            REQUEST_HEADER_ORIGINAL_HOST,
            RESPONSE_HEADER,
            RESPONSE_HEADER_REMOVE,
        ]
        .iter()
        .any(|key| entry.contains_key(key))
    }

    fn validate(&self, entry: &TransformEntry) -> Result<Transform, TransformError> {
        if let Some(name) = entry.get(REQUEST_HEADER) {
            let kind = REQUEST_HEADER;
            expect_parameters(kind, entry, 2, "2 (name and Set or Append)")?;
            let (mode, parameter, value) = value_parameter(kind, entry)?;
            let transform = RequestHeaderTransform::new(
                header_name(kind, name)?,
                header_value(kind, parameter, value)?,
                mode,
            );
            return Ok(RequestTransform::Header(transform).into());
        }

        if let Some(name) = entry.get(REQUEST_HEADER_REMOVE) {
            expect_parameters(REQUEST_HEADER_REMOVE, entry, 1, "1")?;
            let transform = RequestHeaderRemoveTransform::new(header_name(REQUEST_HEADER_REMOVE, name)?);
            return Ok(RequestTransform::HeaderRemove(transform).into());
        }

        if let Some(flag) = entry.get(REQUEST_HEADERS_COPY) {
            expect_parameters(REQUEST_HEADERS_COPY, entry, 1, "1")?;
            let copy = parse_flag(REQUEST_HEADERS_COPY, flag)?;
            return Ok(PipelineOption::CopyRequestHeaders(copy).into());
        }

        if let Some(flag) = entry.get(REQUEST_HEADER_ORIGINAL_HOST) {
            expect_parameters(REQUEST_HEADER_ORIGINAL_HOST, entry, 1, "1")?;
            let original = parse_flag(REQUEST_HEADER_ORIGINAL_HOST, flag)?;
            return Ok(PipelineOption::UseOriginalHost(original).into());
        }

        if let Some(name) = entry.get(RESPONSE_HEADER) {
            let kind = RESPONSE_HEADER;
            let (when, count) = response_condition(kind, entry, 2)?;
            expect_parameters(kind, entry, count, "2 or 3 (name, Set or Append, optional When)")?;
            let (mode, parameter, value) = value_parameter(kind, entry)?;
            let transform = ResponseHeaderTransform::new(
                header_name(kind, name)?,
                header_value(kind, parameter, value)?,
                mode,
                when,
            );
            return Ok(ResponseTransform::Header(transform).into());
        }

        let name = entry.get(RESPONSE_HEADER_REMOVE).ok_or(TransformError::MissingParameter {
            kind: "Header",
            expected: "RequestHeader, RequestHeaderRemove, RequestHeadersCopy, \
                       RequestHeaderOriginalHost, ResponseHeader, ResponseHeaderRemove",
        })?;
        let kind = RESPONSE_HEADER_REMOVE;
        let (when, count) = response_condition(kind, entry, 1)?;
        expect_parameters(kind, entry, count, "1 or 2 (name, optional When)")?;
        let transform = ResponseHeaderRemoveTransform::new(header_name(kind, name)?, when);
        Ok(ResponseTransform::HeaderRemove(transform).into())
    }
}

impl TransformBuilderContext {
    /// Set or append a request header.
    pub fn add_request_header(&mut self, name: HeaderName, value: HeaderValue, mode: ValueMode) -> &mut Self {
        self.add_request_transform(RequestTransform::Header(RequestHeaderTransform::new(
            name, value, mode,
        )))
    }

    pub fn add_request_header_remove(&mut self, name: HeaderName) -> &mut Self {
        self.add_request_transform(RequestTransform::HeaderRemove(
            RequestHeaderRemoveTransform::new(name),
        ))
    }

    /// Set or append a response header when `when` holds.
    pub fn add_response_header(
        &mut self,
        name: HeaderName,
        value: HeaderValue,
        mode: ValueMode,
        when: ResponseCondition,
    ) -> &mut Self {
        self.add_response_transform(ResponseTransform::Header(ResponseHeaderTransform::new(
            name, value, mode, when,
        )))
    }

    pub fn add_response_header_remove(&mut self, name: HeaderName, when: ResponseCondition) -> &mut Self {
        self.add_response_transform(ResponseTransform::HeaderRemove(
            ResponseHeaderRemoveTransform::new(name, when),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::HOST;

    fn validate(pairs: &[(&str, &str)]) -> Result<Transform, TransformError> {
        HeaderTransformFactory.validate(&pairs.iter().copied().collect())
    }

    fn request(transform: Transform) -> RequestTransform {
        match transform {
            Transform::Request(t) => t,
            other => panic!("expected a request transform, got {:?}", other),
        }
    }

    fn response(transform: Transform) -> ResponseTransform {
        match transform {
            Transform::Response(t) => t,
            other => panic!("expected a response transform, got {:?}", other),
        }
    }

    #[test]
    fn test_request_header_set_and_append() {
        let set = request(validate(&[("RequestHeader", "X-Tenant"), ("Set", "blue")]).unwrap());
        let append = request(validate(&[("RequestHeader", "x-tenant"), ("Append", "green")]).unwrap());

        let mut state = RequestState::new("/");
        state.headers.insert("x-tenant", HeaderValue::from_static("red"));
        set.apply(&mut state);
        assert_eq!(state.headers.get_all("x-tenant").iter().count(), 1);
        assert_eq!(state.headers["x-tenant"], "blue");

        append.apply(&mut state);
        let values: Vec<_> = state.headers.get_all("x-tenant").iter().collect();
        assert_eq!(values, vec!["blue", "green"]);
    }

    #[test]
    fn test_request_header_remove() {
        let remove = request(validate(&[("RequestHeaderRemove", "Cookie")]).unwrap());
        let mut state = RequestState::new("/");
        state.headers.insert("cookie", HeaderValue::from_static("a=b"));
        state.headers.insert(HOST, HeaderValue::from_static("example.com"));
        remove.apply(&mut state);
        assert!(state.headers.get("cookie").is_none());
        assert!(state.headers.get(HOST).is_some());

        // Removing an absent header is a no-op.
        remove.apply(&mut state);
    }

    #[test]
    fn test_response_header_conditions() {
        let success = response(validate(&[("ResponseHeader", "X-A"), ("Set", "1")]).unwrap());
        let always = response(
            validate(&[("ResponseHeader", "X-B"), ("Append", "2"), ("When", "always")]).unwrap(),
        );

        let mut ok = ResponseState::new(StatusCode::OK);
        success.apply(&mut ok);
        always.apply(&mut ok);
        assert_eq!(ok.headers["x-a"], "1");
        assert_eq!(ok.headers["x-b"], "2");

        let mut failed = ResponseState::new(StatusCode::BAD_GATEWAY);
        success.apply(&mut failed);
        always.apply(&mut failed);
        assert!(failed.headers.get("x-a").is_none());
        assert_eq!(failed.headers["x-b"], "2");
    }

    #[test]
    fn test_response_header_set_and_append() {
        let set = response(validate(&[("ResponseHeader", "Vary"), ("Set", "Accept")]).unwrap());
        let append = response(validate(&[("ResponseHeader", "Vary"), ("Append", "Origin")]).unwrap());

        let mut state = ResponseState::new(StatusCode::OK);
        state.headers.insert("vary", HeaderValue::from_static("Cookie"));
        set.apply(&mut state);
        append.apply(&mut state);

        let values: Vec<_> = state.headers.get_all("vary").iter().collect();
        assert_eq!(values, vec!["Accept", "Origin"]);
    }

    #[test]
    fn test_response_header_remove() {
        let remove = response(validate(&[("ResponseHeaderRemove", "Server")]).unwrap());
        let mut state = ResponseState::new(StatusCode::NOT_FOUND);
        state.headers.insert("server", HeaderValue::from_static("upstream"));
        remove.apply(&mut state);
        assert!(state.headers.get("server").is_some());

        let remove = response(
            validate(&[("ResponseHeaderRemove", "Server"), ("When", "Always")]).unwrap(),
        );
        remove.apply(&mut state);
        assert!(state.headers.get("server").is_none());
    }

    #[test]
    fn test_forwarding_switches() {
        assert_eq!(
            validate(&[("RequestHeadersCopy", "false")]).unwrap(),
            Transform::Option(PipelineOption::CopyRequestHeaders(false))
        );
        assert_eq!(
            validate(&[("RequestHeaderOriginalHost", "True")]).unwrap(),
            Transform::Option(PipelineOption::UseOriginalHost(true))
        );
    }

    #[test]
    fn test_invalid_entries() {
        assert!(matches!(
            validate(&[("RequestHeader", "X-A")]),
            Err(TransformError::UnexpectedParameters { .. })
        ));
        assert!(matches!(
            validate(&[("RequestHeader", "X-A"), ("Other", "1")]),
            Err(TransformError::MissingParameter { .. })
        ));
        assert!(matches!(
            validate(&[("RequestHeader", "bad header"), ("Set", "1")]),
            Err(TransformError::InvalidValue { .. })
        ));
        assert!(matches!(
            validate(&[("RequestHeader", "X-A"), ("Set", "line\nbreak")]),
            Err(TransformError::InvalidValue { parameter: "Set", .. })
        ));
        assert!(matches!(
            validate(&[("ResponseHeader", "X-A"), ("Set", "1"), ("When", "Sometimes")]),
            Err(TransformError::InvalidValue { parameter: "When", .. })
        ));
        assert!(matches!(
            validate(&[("RequestHeadersCopy", "maybe")]),
            Err(TransformError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_programmatic_matches_declarative() {
        let declarative = validate(&[("ResponseHeader", "X-A"), ("Set", "1")]).unwrap();

        let mut ctx = TransformBuilderContext::new("r", Default::default(), Default::default());
        ctx.add_response_header(
            HeaderName::from_static("x-a"),
            HeaderValue::from_static("1"),
            ValueMode::Set,
            ResponseCondition::Success,
        );
        assert_eq!(Transform::Response(ctx.response_transforms()[0].clone()), declarative);
    }
}
