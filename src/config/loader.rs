//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// On-disk configuration format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// `.json` files are JSON, everything else is TOML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ConfigFormat::Json,
            _ => ConfigFormat::Toml,
        }
    }
}

/// Load and validate configuration from a TOML or JSON file.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content, ConfigFormat::from_path(path))
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str, format: ConfigFormat) -> Result<ProxyConfig, ConfigError> {
    let config: ProxyConfig = match format {
        ConfigFormat::Toml => toml::from_str(content)?,
        ConfigFormat::Json => serde_json::from_str(content)?,
    };

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOML_CONFIG: &str = r#"
        [listener]
        bind_address = "127.0.0.1:8080"

        [transforms]
        require_route_values = true

        [[routes]]
        name = "api"
        path = "/api/{**remainder}"
        destination = "http://127.0.0.1:3000"
        transforms = [
            { PathRemovePrefix = "/api" },
            { ResponseHeader = "X-Served-By", Append = "proxy", When = "Always" },
        ]
    "#;

    #[test]
    fn test_parse_toml() {
        let config = parse_config(TOML_CONFIG, ConfigFormat::Toml).unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:8080");
        assert!(config.transforms.require_route_values);
        assert_eq!(config.routes.len(), 1);
        assert_eq!(config.routes[0].transforms[1].get("When"), Some("Always"));
    }

    #[test]
    fn test_parse_json() {
        let json = r#"{
            "routes": [{
                "name": "api",
                "destination": "http://127.0.0.1:3000",
                "transforms": [{ "PathSet": "/path#" }]
            }]
        }"#;
        let config = parse_config(json, ConfigFormat::Json).unwrap();
        assert_eq!(config.routes[0].transforms[0].get("PathSet"), Some("/path#"));
    }

    #[test]
    fn test_validation_errors_are_reported() {
        let toml = r#"
            [[routes]]
            name = "a"
            destination = "not a url"

            [[routes]]
            name = "a"
            destination = "http://127.0.0.1:3000"
        "#;
        match parse_config(toml, ConfigFormat::Toml) {
            Err(ConfigError::Validation(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("expected validation errors, got {:?}", other),
        }
    }

    #[test]
    fn test_example_config_is_valid() {
        let config = parse_config(include_str!("../../proxy.example.toml"), ConfigFormat::Toml).unwrap();
        assert_eq!(config.routes.len(), 2);
        assert_eq!(config.routes[0].priority, 10);
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ConfigFormat::from_path(Path::new("proxy.json")), ConfigFormat::Json);
        assert_eq!(ConfigFormat::from_path(Path::new("proxy.toml")), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path(Path::new("proxy")), ConfigFormat::Toml);
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/nonexistent/transform-proxy.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
