//! Path transforms: `PathSet`, `PathPrefix`, `PathRemovePrefix`,
//! `PathRouteValues`.
//!
//! # Design Decisions
//! - Path values are normalized to start with `/` on both the declarative and
//!   the programmatic entry points, so both build identical transforms
//! - `PathStringTransform` values are fixed at build time;
//!   `PathRouteValuesTransform` binds its template on every request
//! - `RemovePrefix` only strips whole segments and is a no-op otherwise

use std::fmt;
use std::sync::Arc;

use crate::config::schema::{RouteConfig, TransformEntry};
use crate::transforms::context::TransformBuilderContext;
use crate::transforms::error::TransformError;
use crate::transforms::factory::{expect_parameters, TransformFactory};
use crate::transforms::state::RequestState;
use crate::transforms::template::{RouteTemplate, TemplateBinder};
use crate::transforms::transform::{RequestTransform, Transform};

const PATH_SET: &str = "PathSet";
const PATH_PREFIX: &str = "PathPrefix";
const PATH_REMOVE_PREFIX: &str = "PathRemovePrefix";
const PATH_ROUTE_VALUES: &str = "PathRouteValues";

/// A path that always begins with `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathString(String);

impl PathString {
    /// Normalize `value` by prefixing `/` when missing. Nothing else changes.
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.starts_with('/') {
            Self(value)
        } else {
            Self(format!("/{value}"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl From<&str> for PathString {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for PathString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathTransformMode {
    Set,
    Prefix,
    RemovePrefix,
}

impl PathTransformMode {
    /// The configuration key selecting this mode.
    pub fn key(self) -> &'static str {
        match self {
            PathTransformMode::Set => PATH_SET,
            PathTransformMode::Prefix => PATH_PREFIX,
            PathTransformMode::RemovePrefix => PATH_REMOVE_PREFIX,
        }
    }
}

/// Rewrites the path with a value fixed at build time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathStringTransform {
    mode: PathTransformMode,
    value: PathString,
}

impl PathStringTransform {
    pub fn new(mode: PathTransformMode, value: PathString) -> Self {
        Self { mode, value }
    }

    pub fn mode(&self) -> PathTransformMode {
        self.mode
    }

    pub fn value(&self) -> &PathString {
        &self.value
    }

    pub fn apply(&self, state: &mut RequestState) {
        match self.mode {
            PathTransformMode::Set => {
                state.path.clear();
                state.path.push_str(self.value.as_str());
            }
            PathTransformMode::Prefix => state.path.insert_str(0, self.value.as_str()),
            PathTransformMode::RemovePrefix => {
                if let Some(len) = segment_prefix_len(&state.path, self.value.as_str()) {
                    state.path.drain(..len);
                }
            }
        }
    }
}

/// Length of `prefix` when `path` starts with it on a segment boundary.
///
/// The prefix is matched verbatim and case-sensitively, unlike ASP.NET's
/// `StartsWithSegments`. A prefix ending in `/` consumes that slash too; `/`
/// alone never matches.
fn segment_prefix_len(path: &str, prefix: &str) -> Option<usize> {
    if prefix.is_empty() || prefix == "/" {
        return None;
    }
    let rest = path.strip_prefix(prefix)?;
    (prefix.ends_with('/') || rest.is_empty() || rest.starts_with('/')).then_some(prefix.len())
}

/// Replaces the path with a template bound against the request's route values.
#[derive(Debug, Clone)]
pub struct PathRouteValuesTransform {
    template: RouteTemplate,
    binder: Arc<TemplateBinder>,
}

impl PathRouteValuesTransform {
    pub fn new(template: RouteTemplate, binder: Arc<TemplateBinder>) -> Self {
        Self { template, binder }
    }

    pub fn template(&self) -> &RouteTemplate {
        &self.template
    }

    pub fn apply(&self, state: &mut RequestState) {
        state.path = self.binder.bind(&self.template, &state.route_values);
    }
}

impl PartialEq for PathRouteValuesTransform {
    fn eq(&self, other: &Self) -> bool {
        self.template == other.template
    }
}

/// Parse a route-values template after normalizing its leading `/`.
fn route_values_transform(
    template: PathString,
    binder: &Arc<TemplateBinder>,
) -> Result<PathRouteValuesTransform, TransformError> {
    let template = RouteTemplate::parse(template.as_str()).map_err(|source| TransformError::Template {
        kind: PATH_ROUTE_VALUES,
        source,
    })?;
    Ok(PathRouteValuesTransform::new(template, binder.clone()))
}

/// Route-dependent checks that cannot be made from the template alone.
///
/// Fails when the binder requires a value the route never captures; warns
/// when the template leaves out the route's catch-all.
fn check_route_values(
    ctx: &TransformBuilderContext,
    transform: &PathRouteValuesTransform,
) -> Result<(), TransformError> {
    let template = transform.template();
    let shape = ctx.shape();

    if let Some(name) = ctx.binder().unsatisfied(template, shape.parameters()).first() {
        return Err(TransformError::UnboundRouteValue {
            kind: PATH_ROUTE_VALUES,
            name: name.to_string(),
        });
    }

    // The catch-all is always the pattern's last capture.
    let dropped = shape
        .parameters()
        .last()
        .filter(|_| shape.uses_catch_all())
        .filter(|captured| !template.parameters().any(|p| p.name().eq_ignore_ascii_case(captured)));
    if let Some(captured) = dropped {
        tracing::warn!(
            route = %ctx.route_id(),
            template = %template.text(),
            catch_all = %captured,
            "PathRouteValues template drops the route's catch-all segment"
        );
    }
    Ok(())
}

/// Builds the four path entry kinds.
pub struct PathTransformFactory {
    binder: Arc<TemplateBinder>,
}

impl PathTransformFactory {
    pub fn new(binder: Arc<TemplateBinder>) -> Self {
        Self { binder }
    }
}

impl TransformFactory for PathTransformFactory {
    fn can_handle(&self, entry: &TransformEntry) -> bool {
        [PATH_SET, PATH_PREFIX, PATH_REMOVE_PREFIX, PATH_ROUTE_VALUES]
            .iter()
            .any(|key| entry.contains_key(key))
    }

    fn validate(&self, entry: &TransformEntry) -> Result<Transform, TransformError> {
        let modes = [
            PathTransformMode::Set,
            PathTransformMode::Prefix,
            PathTransformMode::RemovePrefix,
        ];
        for mode in modes {
            if let Some(value) = entry.get(mode.key()) {
                expect_parameters(mode.key(), entry, 1, "1")?;
                let transform = PathStringTransform::new(mode, PathString::new(value));
                return Ok(RequestTransform::PathString(transform).into());
            }
        }

        let template = entry.get(PATH_ROUTE_VALUES).ok_or(TransformError::MissingParameter {
            kind: "Path",
            expected: "PathSet, PathPrefix, PathRemovePrefix, PathRouteValues",
        })?;
        expect_parameters(PATH_ROUTE_VALUES, entry, 1, "1")?;
        let transform = route_values_transform(PathString::new(template), &self.binder)?;
        Ok(RequestTransform::PathRouteValues(transform).into())
    }

    fn build(&self, ctx: &mut TransformBuilderContext, entry: &TransformEntry) -> bool {
        if !self.can_handle(entry) {
            return false;
        }
        let checked = self.validate(entry).and_then(|transform| {
            if let Transform::Request(RequestTransform::PathRouteValues(t)) = &transform {
                check_route_values(ctx, t)?;
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
    /// Replace the request path with `path`.
    pub fn add_path_set(&mut self, path: PathString) -> &mut Self {
        self.add_request_transform(RequestTransform::PathString(PathStringTransform::new(
            PathTransformMode::Set,
            path,
        )))
    }

    /// Prepend `prefix` to the request path.
    pub fn add_path_prefix(&mut self, prefix: PathString) -> &mut Self {
        self.add_request_transform(RequestTransform::PathString(PathStringTransform::new(
            PathTransformMode::Prefix,
            prefix,
        )))
    }

    /// Strip `prefix` from the request path when it matches whole segments.
    pub fn add_path_remove_prefix(&mut self, prefix: PathString) -> &mut Self {
        self.add_request_transform(RequestTransform::PathString(PathStringTransform::new(
            PathTransformMode::RemovePrefix,
            prefix,
        )))
    }

    /// Replace the request path with `template` bound to the route values.
    ///
    /// Applies the same route checks as a declarative `PathRouteValues` entry.
    pub fn add_path_route_values(&mut self, template: PathString) -> Result<&mut Self, TransformError> {
        let transform = route_values_transform(template, self.binder())?;
        check_route_values(self, &transform)?;
        Ok(self.add_request_transform(RequestTransform::PathRouteValues(transform)))
    }
}

impl RouteConfig {
    pub fn with_transform_path_set(self, path: PathString) -> Self {
        self.with_transform(TransformEntry::new().with(PATH_SET, path.into_inner()))
    }

    pub fn with_transform_path_prefix(self, prefix: PathString) -> Self {
        self.with_transform(TransformEntry::new().with(PATH_PREFIX, prefix.into_inner()))
    }

    pub fn with_transform_path_remove_prefix(self, prefix: PathString) -> Self {
        self.with_transform(TransformEntry::new().with(PATH_REMOVE_PREFIX, prefix.into_inner()))
    }

    pub fn with_transform_path_route_values(self, template: PathString) -> Self {
        self.with_transform(TransformEntry::new().with(PATH_ROUTE_VALUES, template.into_inner()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transforms::context::RouteShape;
    use crate::transforms::state::RouteValues;
    use crate::transforms::template::BindPolicy;

    fn factory() -> PathTransformFactory {
        PathTransformFactory::new(Arc::default())
    }

    fn context() -> TransformBuilderContext {
        TransformBuilderContext::new("route", RouteShape::default(), Arc::default())
    }

    fn single_path_transform(ctx: &TransformBuilderContext) -> &PathStringTransform {
        assert!(ctx.errors().is_empty(), "{:?}", ctx.errors());
        assert_eq!(ctx.request_transforms().len(), 1);
        match &ctx.request_transforms()[0] {
            RequestTransform::PathString(t) => t,
            other => panic!("expected a path string transform, got {:?}", other),
        }
    }

    fn apply(transform: &PathStringTransform, path: &str) -> String {
        let mut state = RequestState::new(path);
        transform.apply(&mut state);
        state.path
    }

    #[test]
    fn test_with_transform_path_set() {
        let route = RouteConfig::new("r", "http://127.0.0.1:3000")
            .with_transform_path_set(PathString::new("/path#"));
        let entry = &route.transforms[0];
        assert!(factory().validate(entry).is_ok());

        let mut ctx = context();
        assert!(factory().build(&mut ctx, entry));

        let t = single_path_transform(&ctx);
        assert_eq!(t.mode(), PathTransformMode::Set);
        assert_eq!(t.value().as_str(), "/path#");
    }

    #[test]
    fn test_add_path_set() {
        let mut ctx = context();
        ctx.add_path_set(PathString::new("/path#"));

        let t = single_path_transform(&ctx);
        assert_eq!(t.mode(), PathTransformMode::Set);
        assert_eq!(t.value().as_str(), "/path#");
    }

    #[test]
    fn test_with_transform_path_remove_prefix() {
        let route = RouteConfig::new("r", "http://127.0.0.1:3000")
            .with_transform_path_remove_prefix(PathString::new("/path#"));
        let mut ctx = context();
        assert!(factory().build(&mut ctx, &route.transforms[0]));

        let t = single_path_transform(&ctx);
        assert_eq!(t.mode(), PathTransformMode::RemovePrefix);
        assert_eq!(t.value().as_str(), "/path#");
    }

    #[test]
    fn test_add_path_remove_prefix() {
        let mut ctx = context();
        ctx.add_path_remove_prefix(PathString::new("/path#"));

        let t = single_path_transform(&ctx);
        assert_eq!(t.mode(), PathTransformMode::RemovePrefix);
        assert_eq!(t.value().as_str(), "/path#");
    }

    #[test]
    fn test_with_transform_path_prefix() {
        let route = RouteConfig::new("r", "http://127.0.0.1:3000")
            .with_transform_path_prefix(PathString::new("/path#"));
        let mut ctx = context();
        assert!(factory().build(&mut ctx, &route.transforms[0]));

        let t = single_path_transform(&ctx);
        assert_eq!(t.mode(), PathTransformMode::Prefix);
        assert_eq!(t.value().as_str(), "/path#");
    }

    #[test]
    fn test_add_path_prefix() {
        let mut ctx = context();
        ctx.add_path_prefix(PathString::new("/path#"));

        let t = single_path_transform(&ctx);
        assert_eq!(t.mode(), PathTransformMode::Prefix);
        assert_eq!(t.value().as_str(), "/path#");
    }

    fn single_route_values_transform(ctx: &TransformBuilderContext) -> &PathRouteValuesTransform {
        assert!(ctx.errors().is_empty(), "{:?}", ctx.errors());
        assert_eq!(ctx.request_transforms().len(), 1);
        match &ctx.request_transforms()[0] {
            RequestTransform::PathRouteValues(t) => t,
            other => panic!("expected a route values transform, got {:?}", other),
        }
    }

    #[test]
    fn test_with_transform_path_route_values() {
        let route = RouteConfig::new("r", "http://127.0.0.1:3000")
            .with_transform_path_route_values(PathString::new("/path#"));
        let mut ctx = context();
        assert!(factory().build(&mut ctx, &route.transforms[0]));

        let t = single_route_values_transform(&ctx);
        assert_eq!(t.template().text(), "/path#");
    }

    #[test]
    fn test_add_path_route_values() {
        let mut ctx = context();
        ctx.add_path_route_values(PathString::new("/path#")).unwrap();

        let t = single_route_values_transform(&ctx);
        assert_eq!(t.template().text(), "/path#");
    }

    #[test]
    fn test_declarative_and_programmatic_are_equivalent() {
        let entry = TransformEntry::new().with(PATH_SET, "/path#");
        let mut declarative = context();
        factory().build(&mut declarative, &entry);

        let mut programmatic = context();
        programmatic.add_path_set(PathString::new("/path#"));

        assert_eq!(declarative.request_transforms(), programmatic.request_transforms());

        let mut a = RequestState::new("/original");
        let mut b = RequestState::new("/original");
        declarative.request_transforms()[0].apply(&mut a);
        programmatic.request_transforms()[0].apply(&mut b);
        assert_eq!(a.path, b.path);
    }

    #[test]
    fn test_values_are_normalized() {
        let entry = TransformEntry::new().with(PATH_PREFIX, "api");
        match factory().validate(&entry).unwrap() {
            Transform::Request(RequestTransform::PathString(t)) => {
                assert_eq!(t.value().as_str(), "/api")
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(PathString::new("").as_str(), "/");
    }

    #[test]
    fn test_set_replaces_path() {
        let t = PathStringTransform::new(PathTransformMode::Set, "/path#".into());
        assert_eq!(apply(&t, "/anything/else"), "/path#");
        assert_eq!(apply(&t, ""), "/path#");
    }

    #[test]
    fn test_prefix_concatenates() {
        let t = PathStringTransform::new(PathTransformMode::Prefix, "/v2".into());
        assert_eq!(apply(&t, "/users"), "/v2/users");
        assert_eq!(apply(&t, ""), "/v2");

        let t = PathStringTransform::new(PathTransformMode::Prefix, "/path#".into());
        assert_eq!(apply(&t, "/x"), "/path#/x");
    }

    #[test]
    fn test_remove_prefix_is_segment_aware() {
        let t = PathStringTransform::new(PathTransformMode::RemovePrefix, "/api".into());
        assert_eq!(apply(&t, "/api/users"), "/users");
        assert_eq!(apply(&t, "/api"), "");
        assert_eq!(apply(&t, "/apiary/users"), "/apiary/users");
        assert_eq!(apply(&t, "/other/api"), "/other/api");
        assert_eq!(apply(&t, "/API/users"), "/API/users");

        let t = PathStringTransform::new(PathTransformMode::RemovePrefix, "/path#".into());
        assert_eq!(apply(&t, "/path#/x"), "/x");

        let t = PathStringTransform::new(PathTransformMode::RemovePrefix, "/api/".into());
        assert_eq!(apply(&t, "/api/users"), "users");
        assert_eq!(apply(&t, "/api"), "/api");
        assert_eq!(apply(&t, "/apiary/users"), "/apiary/users");

        let t = PathStringTransform::new(PathTransformMode::RemovePrefix, "/".into());
        assert_eq!(apply(&t, "/users"), "/users");
    }

    #[test]
    fn test_route_values_bind_per_request() {
        let mut ctx = context();
        ctx.add_path_route_values(PathString::new("/{a}/{b}")).unwrap();
        let transform = &ctx.request_transforms()[0];

        let mut first = RequestState::new("/in")
            .with_route_values([("a", "x"), ("b", "y")].into_iter().collect());
        transform.apply(&mut first);
        assert_eq!(first.path, "/x/y");

        let mut second = RequestState::new("/in")
            .with_route_values([("a", "1")].into_iter().collect::<RouteValues>());
        transform.apply(&mut second);
        assert_eq!(second.path, "/1/");
    }

    #[test]
    fn test_malformed_entries_are_reported() {
        let mut ctx = context();
        let entries = [
            TransformEntry::new().with(PATH_SET, "/a").with("Extra", "1"),
            TransformEntry::new().with(PATH_ROUTE_VALUES, "/{a"),
            TransformEntry::new().with(PATH_SET, "/a").with(PATH_PREFIX, "/b"),
        ];
        for (index, entry) in entries.iter().enumerate() {
            ctx.begin_entry(index);
            assert!(factory().build(&mut ctx, entry));
        }
        assert!(ctx.request_transforms().is_empty());
        let errors = ctx.errors();
        assert_eq!(errors.len(), 3);
        assert!(matches!(errors[0].error, TransformError::UnexpectedParameters { .. }));
        assert!(matches!(errors[1].error, TransformError::Template { .. }));
        assert_eq!(errors[2].index, 2);
    }

    #[test]
    fn test_unrelated_entry_is_not_handled() {
        let mut ctx = context();
        let entry = TransformEntry::new().with("RequestHeader", "X-A").with("Set", "1");
        assert!(!factory().build(&mut ctx, &entry));
        assert_eq!(ctx.state(), crate::transforms::context::BuilderState::Empty);
    }

    #[test]
    fn test_require_all_rejects_unbound_placeholders() {
        let binder = Arc::new(TemplateBinder::new(BindPolicy::RequireAll));
        let factory = PathTransformFactory::new(binder.clone());
        let shape = RouteShape::new(vec!["id".to_string()], false);
        let mut ctx = TransformBuilderContext::new("route", shape, binder);

        ctx.begin_entry(0);
        factory.build(&mut ctx, &TransformEntry::new().with(PATH_ROUTE_VALUES, "/items/{id}"));
        ctx.begin_entry(1);
        factory.build(&mut ctx, &TransformEntry::new().with(PATH_ROUTE_VALUES, "/items/{other}"));

        assert_eq!(ctx.request_transforms().len(), 1);
        assert_eq!(ctx.errors().len(), 1);
        assert_eq!(
            ctx.errors()[0].error,
            TransformError::UnboundRouteValue {
                kind: PATH_ROUTE_VALUES,
                name: "other".to_string()
            }
        );
    }

    #[test]
    fn test_require_all_applies_to_both_entry_points() {
        let binder = Arc::new(TemplateBinder::new(BindPolicy::RequireAll));
        let factory = PathTransformFactory::new(binder.clone());
        let shape = RouteShape::new(vec!["id".to_string()], false);

        let mut declarative = TransformBuilderContext::new("route", shape.clone(), binder.clone());
        declarative.begin_entry(0);
        factory.build(&mut declarative, &TransformEntry::new().with(PATH_ROUTE_VALUES, "/items/{other}"));

        let mut programmatic = TransformBuilderContext::new("route", shape, binder);
        let error = programmatic
            .add_path_route_values(PathString::new("/items/{other}"))
            .unwrap_err();

        assert_eq!(declarative.errors()[0].error, error);
        assert!(programmatic.request_transforms().is_empty());
        assert!(programmatic
            .add_path_route_values(PathString::new("/items/{id}"))
            .is_ok());
        assert!(declarative.freeze().is_err());
        assert!(programmatic.freeze().is_ok());
    }
}
