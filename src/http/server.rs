//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the proxy handler
//! - Wire up middleware (tracing, timeout, request ID)
//! - Dispatch requests to the route table
//! - Run request transforms, forward upstream, run response transforms
//! - Apply configuration updates by republishing the route table
//! - Observability (metrics, correlation IDs)

use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderName, StatusCode},
    response::Response,
    routing::any,
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::http::request::{request_host, request_state, upstream_request, X_REQUEST_ID};
use crate::http::response::{proxy_error, relay};
use crate::observability::metrics;
use crate::routing::RouteTable;
use crate::transforms::builder::TransformBuilder;
use crate::transforms::executor::apply_request_transforms;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<RouteTable>,
    pub client: Client<HttpConnector, Body>,
}

/// HTTP server for the transforming reverse proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    routes: Arc<RouteTable>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    ///
    /// Routes that fail to build are logged and left out.
    pub fn new(config: ProxyConfig) -> Self {
        let routes = Arc::new(RouteTable::default());
        let builder = TransformBuilder::from_settings(&config.transforms);
        let errors = routes.rebuild(&config.routes, &builder);
        if !errors.is_empty() {
            tracing::warn!(failed = errors.len(), "Some routes were excluded at startup");
        }

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        let state = AppState {
            routes: routes.clone(),
            client,
        };

        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            routes,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        let x_request_id = HeaderName::from_static(X_REQUEST_ID);
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::new(x_request_id))
                    .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
            )
    }

    /// The live route table, shared with the request handlers.
    pub fn routes(&self) -> Arc<RouteTable> {
        self.routes.clone()
    }

    /// The Axum router, for serving without a listener (tests).
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Every configuration received on `config_updates` replaces the route
    /// table. The server drains and stops when `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<ProxyConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            routes = self.routes.load().len(),
            "HTTP server starting"
        );

        let routes = self.routes.clone();
        tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                let builder = TransformBuilder::from_settings(&config.transforms);
                let errors = routes.rebuild(&config.routes, &builder);
                tracing::info!(
                    routes = config.routes.len(),
                    failed = errors.len(),
                    "Configuration reloaded"
                );
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// Main proxy handler.
/// Looks up route, transforms the request, forwards it and transforms the
/// response.
async fn proxy_handler(State(state): State<AppState>, request: Request) -> Response {
    let start_time = Instant::now();
    let (parts, body) = request.into_parts();
    let request_id = parts
        .headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();
    let method = parts.method.to_string();

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %parts.uri.path(),
        "Proxying request"
    );

    // 1. Match Route
    let snapshot = state.routes.load();
    let Some(matched) = snapshot.match_request(request_host(&parts), parts.uri.path()) else {
        tracing::warn!(request_id = %request_id, path = %parts.uri.path(), "No route matched");
        metrics::record_request(&method, 404, "none", start_time);
        return proxy_error(StatusCode::NOT_FOUND, "No matching route found", None);
    };
    let route = matched.route;
    let pipeline = route.pipeline();

    // 2. Transform Request
    let mut upstream_state = request_state(&parts, matched.values, pipeline.options());
    apply_request_transforms(pipeline, &mut upstream_state);

    let upstream = match upstream_request(route.destination(), upstream_state, body) {
        Ok(req) => req,
        Err(e) => {
            tracing::error!(request_id = %request_id, route = %route.name(), error = %e, "Invalid upstream request");
            metrics::record_request(&method, 502, route.name(), start_time);
            return proxy_error(StatusCode::BAD_GATEWAY, "Invalid upstream request", Some(pipeline));
        }
    };

    tracing::debug!(
        request_id = %request_id,
        route = %route.name(),
        upstream = %upstream.uri(),
        "Forwarding request"
    );

    // 3. Forward and transform the response
    match state.client.request(upstream).await {
        Ok(response) => {
            let status = response.status();
            metrics::record_request(&method, status.as_u16(), route.name(), start_time);
            relay(response.map(Body::new), pipeline)
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, route = %route.name(), error = %e, "Upstream error");
            metrics::record_request(&method, 502, route.name(), start_time);
            proxy_error(StatusCode::BAD_GATEWAY, "Upstream request failed", Some(pipeline))
        }
    }
}
