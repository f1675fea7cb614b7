//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Root configuration for the reverse proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Route definitions, each carrying its ordered transform entries.
    pub routes: Vec<RouteConfig>,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Transform compilation settings shared by every route.
    pub transforms: TransformSettings,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Route configuration: which requests it claims, where they go and how they
/// are rewritten on the way.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging, metrics and error attribution.
    pub name: String,

    /// Host header to match (exact match, port ignored).
    #[serde(default)]
    pub host: Option<String>,

    /// Path pattern, e.g. `/api/{version}/{**remainder}`.
    #[serde(default = "default_route_path")]
    pub path: String,

    /// Upstream base URL (e.g., "http://127.0.0.1:3000").
    pub destination: String,

    /// Route priority (higher = checked first).
    #[serde(default)]
    pub priority: u32,

    /// Ordered transform entries. Order is significant.
    #[serde(default)]
    pub transforms: Vec<TransformEntry>,
}

fn default_route_path() -> String {
    "/{**catch-all}".to_string()
}

impl RouteConfig {
    /// Create a route that claims every path and forwards it unchanged.
    pub fn new(name: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: None,
            path: default_route_path(),
            destination: destination.into(),
            priority: 0,
            transforms: Vec::new(),
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    /// Append a raw transform entry.
    pub fn with_transform(mut self, entry: TransformEntry) -> Self {
        self.transforms.push(entry);
        self
    }
}

/// One declarative transform: a kind key plus its string parameters,
/// e.g. `{ PathSet = "/path" }` or `{ RequestHeader = "X-A", Set = "1" }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct TransformEntry(BTreeMap<String, String>);

impl TransformEntry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a parameter, builder style.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Comma separated key list, used in error messages.
    pub fn describe_keys(&self) -> String {
        self.keys().collect::<Vec<_>>().join(", ")
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TransformEntry {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Transform compilation settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TransformSettings {
    /// Reject `PathRouteValues` templates whose required placeholders the
    /// route's path pattern cannot supply. Off by default: a missing value
    /// binds to an empty string.
    pub require_route_values: bool,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
