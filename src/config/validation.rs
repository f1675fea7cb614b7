//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Route names are present and unique
//! - Route path patterns and destinations parse
//! - Validate value ranges (timeouts > 0, bind address valid)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Transform entries are not checked here; they are compiled per route and
//!   a broken route is isolated from its siblings (see `routing::router`)

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::routing::matcher::{PathPattern, RoutePatternError};
use crate::routing::router::parse_destination;

/// A semantic configuration problem.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("invalid bind address '{0}'")]
    BindAddress(String),

    #[error("request timeout must be greater than zero")]
    ZeroTimeout,

    #[error("route #{index} has an empty name")]
    EmptyRouteName { index: usize },

    #[error("route name '{0}' is used more than once")]
    DuplicateRouteName(String),

    #[error("route '{route}': {source}")]
    PathPattern {
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
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    let mut seen = HashSet::new();
    for (index, route) in config.routes.iter().enumerate() {
        if route.name.trim().is_empty() {
            errors.push(ValidationError::EmptyRouteName { index });
        } else if !seen.insert(route.name.as_str()) {
            errors.push(ValidationError::DuplicateRouteName(route.name.clone()));
        }

        if let Err(source) = PathPattern::parse(&route.path) {
            errors.push(ValidationError::PathPattern {
                route: route.name.clone(),
                source,
            });
        }

        if let Err(reason) = parse_destination(&route.destination) {
            errors.push(ValidationError::Destination {
                route: route.name.clone(),
                destination: route.destination.clone(),
                reason,
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::RouteConfig;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ProxyConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ProxyConfig::default();
        config.listener.bind_address = "nowhere".into();
        config.timeouts.request_secs = 0;
        config.routes.push(RouteConfig::new("", "http://127.0.0.1:3000"));
        config
            .routes
            .push(RouteConfig::new("api", "ftp://127.0.0.1").with_path("/api/{a}/{a}"));

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(matches!(errors[0], ValidationError::BindAddress(_)));
        assert!(matches!(errors[1], ValidationError::ZeroTimeout));
        assert!(matches!(errors[2], ValidationError::EmptyRouteName { index: 0 }));
        assert!(matches!(errors[3], ValidationError::PathPattern { .. }));
        assert!(matches!(errors[4], ValidationError::Destination { .. }));
    }

    #[test]
    fn test_duplicate_route_names() {
        let mut config = ProxyConfig::default();
        config.routes.push(RouteConfig::new("api", "http://127.0.0.1:3000"));
        config.routes.push(RouteConfig::new("api", "http://127.0.0.1:3001"));

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(&errors[0], ValidationError::DuplicateRouteName(name) if name == "api"));
    }
}
