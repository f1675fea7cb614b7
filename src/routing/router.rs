//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Compile route configs (matcher, destination, transform pipeline)
//! - Look up the matching route for a request and capture its route values
//! - Publish new route sets atomically on reload
//!
//! # Design Decisions
//! - A snapshot is immutable after construction (thread-safe without locks)
//! - Reload swaps the whole snapshot through `ArcSwap`; in-flight requests
//!   keep the snapshot they started with
//! - A route that fails to compile is left out; its siblings are published
//! - O(n) scan in priority order (acceptable for typical route counts)
//! - Explicit NoMatch rather than silent default

use std::sync::Arc;

use arc_swap::ArcSwap;
use thiserror::Error;
use url::Url;

use crate::config::schema::RouteConfig;
use crate::observability::metrics;
use crate::routing::matcher::{HostMatcher, PathPattern, RouteMatcher, RoutePatternError};
use crate::transforms::builder::TransformBuilder;
use crate::transforms::error::TransformBuildError;
use crate::transforms::pipeline::CompiledTransformPipeline;
use crate::transforms::state::RouteValues;

/// Why a route was left out of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteBuildError {
    #[error("route '{route}': {source}")]
    Pattern {
        route: String,
        #[source]
        source: RoutePatternError,
    },

    #[error("route '{route}': invalid destination '{destination}': {reason}")]
    Destination {
        route: String,
        destination: String,
        reason: String,
    },

    #[error(transparent)]
    Transform(#[from] TransformBuildError),
}

impl RouteBuildError {
    pub fn route(&self) -> &str {
        match self {
            RouteBuildError::Pattern { route, .. } | RouteBuildError::Destination { route, .. } => route,
            RouteBuildError::Transform(e) => &e.route,
        }
    }
}

/// Parse an upstream destination: an absolute `http` URL, optionally with
/// a base path.
pub fn parse_destination(destination: &str) -> Result<Url, String> {
    let url = Url::parse(destination).map_err(|e| e.to_string())?;
    if url.scheme() != "http" {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err("must not carry a query or fragment".to_string());
    }
    Ok(url)
}

/// A route ready to serve requests.
#[derive(Debug, Clone)]
pub struct CompiledRoute {
    name: String,
    priority: u32,
    matcher: RouteMatcher,
    destination: Url,
    pipeline: CompiledTransformPipeline,
}

impl CompiledRoute {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> u32 {
        self.priority
    }

    pub fn destination(&self) -> &Url {
        &self.destination
    }

    pub fn pipeline(&self) -> &CompiledTransformPipeline {
        &self.pipeline
    }
}

/// Compile one route. All of its errors are returned together.
pub fn compile_route(
    config: &RouteConfig,
    builder: &TransformBuilder,
) -> Result<CompiledRoute, Vec<RouteBuildError>> {
    let mut errors = Vec::new();

    let pattern = PathPattern::parse(&config.path)
        .map_err(|source| {
            errors.push(RouteBuildError::Pattern {
                route: config.name.clone(),
                source,
            })
        })
        .ok();

    let destination = parse_destination(&config.destination)
        .map_err(|reason| {
            errors.push(RouteBuildError::Destination {
                route: config.name.clone(),
                destination: config.destination.clone(),
                reason,
            })
        })
        .ok();

    // Transforms need the pattern's shape; without it they cannot be checked.
    let pipeline = pattern.as_ref().and_then(|pattern| {
        builder
            .build(&config.name, pattern.shape(), &config.transforms)
            .map_err(|build_errors| errors.extend(build_errors.into_iter().map(RouteBuildError::from)))
            .ok()
    });

    match (pattern, destination, pipeline) {
        (Some(pattern), Some(destination), Some(pipeline)) if errors.is_empty() => Ok(CompiledRoute {
            name: config.name.clone(),
            priority: config.priority,
            matcher: RouteMatcher::new(config.host.as_deref().map(HostMatcher::new), pattern),
            destination,
            pipeline,
        }),
        _ => Err(errors),
    }
}

/// The outcome of a successful lookup.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    pub route: &'a CompiledRoute,
    pub values: RouteValues,
}

/// An immutable, ordered set of compiled routes.
#[derive(Debug, Default)]
pub struct RouteSnapshot {
    routes: Vec<CompiledRoute>,
}

impl RouteSnapshot {
    /// Compile every route. Routes that fail are excluded and their errors
    /// returned alongside the snapshot.
    pub fn build(configs: &[RouteConfig], builder: &TransformBuilder) -> (Self, Vec<RouteBuildError>) {
        let mut routes = Vec::with_capacity(configs.len());
        let mut errors = Vec::new();

        for config in configs {
            match compile_route(config, builder) {
                Ok(route) => routes.push(route),
                Err(route_errors) => {
                    for error in &route_errors {
                        tracing::warn!(route = %config.name, error = %error, "Route excluded");
                    }
                    metrics::record_route_build_failure(&config.name);
                    errors.extend(route_errors);
                }
            }
        }

        // Stable: equal priorities keep declaration order.
        routes.sort_by(|a, b| b.priority.cmp(&a.priority));
        (Self { routes }, errors)
    }

    /// First route, in priority order, matching `host` and `path`.
    pub fn match_request(&self, host: Option<&str>, path: &str) -> Option<RouteMatch<'_>> {
        self.routes.iter().find_map(|route| {
            route
                .matcher
                .matches(host, path)
                .map(|values| RouteMatch { route, values })
        })
    }

    pub fn routes(&self) -> &[CompiledRoute] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// The live route set, swapped atomically on reload.
pub struct RouteTable {
    current: ArcSwap<RouteSnapshot>,
}

impl RouteTable {
    pub fn new(snapshot: RouteSnapshot) -> Self {
        metrics::record_routes_published(snapshot.len());
        Self {
            current: ArcSwap::from_pointee(snapshot),
        }
    }

    /// The snapshot to use for one request.
    pub fn load(&self) -> Arc<RouteSnapshot> {
        self.current.load_full()
    }

    pub fn publish(&self, snapshot: RouteSnapshot) {
        let count = snapshot.len();
        self.current.store(Arc::new(snapshot));
        metrics::record_routes_published(count);
        tracing::info!(routes = count, "Published route snapshot");
    }

    /// Build and publish a snapshot from `configs`, returning the errors of
    /// the routes that were left out.
    pub fn rebuild(&self, configs: &[RouteConfig], builder: &TransformBuilder) -> Vec<RouteBuildError> {
        let (snapshot, errors) = RouteSnapshot::build(configs, builder);
        self.publish(snapshot);
        errors
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new(RouteSnapshot::default())
    }
}
