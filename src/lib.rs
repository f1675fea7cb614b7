//! Transforming Reverse Proxy Library
//!
//! Routes requests by host and path pattern, rewrites path, query and
//! headers through per-route transform pipelines, and relays the upstream
//! response through the route's response transforms.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod transforms;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
