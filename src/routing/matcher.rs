//! Route matching logic.
//!
//! # Responsibilities
//! - Match host header (exact match, case-insensitive, port ignored)
//! - Match path patterns segment by segment and capture route values
//! - Combine conditions with AND semantics
//!
//! # Design Decisions
//! - Literal segments compare case-insensitively
//! - A trailing `/` on the request path is tolerated
//! - Captured values are the raw path text; nothing is percent-decoded
//! - Empty condition = always matches (wildcard)
//! - No regex to guarantee O(n) matching

use thiserror::Error;

use crate::transforms::context::RouteShape;
use crate::transforms::state::RouteValues;

/// Why a route path pattern failed to parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutePatternError {
    #[error("path pattern '{0}' must start with '/'")]
    MissingLeadingSlash(String),

    #[error("path pattern '{0}' contains an empty segment")]
    EmptySegment(String),

    #[error("segment '{segment}' mixes literal text and a parameter")]
    InvalidSegment { segment: String },

    #[error("parameter name in segment '{segment}' is empty or invalid")]
    InvalidParameterName { segment: String },

    #[error("parameter '{0}' appears more than once")]
    DuplicateParameter(String),

    #[error("catch-all parameter '{0}' must be the last segment")]
    CatchAllNotLast(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PatternSegment {
    Literal(String),
    Parameter(String),
    CatchAll(String),
}

/// A parsed route path pattern such as `/api/{version}/{**rest}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    text: String,
    segments: Vec<PatternSegment>,
}

impl PathPattern {
    pub fn parse(text: &str) -> Result<Self, RoutePatternError> {
        let body = text
            .strip_prefix('/')
            .ok_or_else(|| RoutePatternError::MissingLeadingSlash(text.to_string()))?;
        let body = body.strip_suffix('/').unwrap_or(body);

        let mut segments = Vec::new();
        if !body.is_empty() {
            for raw in body.split('/') {
                if raw.is_empty() {
                    return Err(RoutePatternError::EmptySegment(text.to_string()));
                }
                segments.push(parse_segment(raw)?);
            }
        }

        let mut names: Vec<&str> = Vec::new();
        for (i, segment) in segments.iter().enumerate() {
            let name = match segment {
                PatternSegment::Literal(_) => continue,
                PatternSegment::Parameter(name) => name,
                PatternSegment::CatchAll(name) => {
                    if i + 1 != segments.len() {
                        return Err(RoutePatternError::CatchAllNotLast(name.clone()));
                    }
                    name
                }
            };
            if names.iter().any(|seen| seen.eq_ignore_ascii_case(name)) {
                return Err(RoutePatternError::DuplicateParameter(name.clone()));
            }
            names.push(name);
        }

        Ok(Self {
            text: text.to_string(),
            segments,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Parameter names and catch-all flag, as seen by transform factories.
    pub fn shape(&self) -> RouteShape {
        let parameters = self
            .segments
            .iter()
            .filter_map(|segment| match segment {
                PatternSegment::Literal(_) => None,
                PatternSegment::Parameter(name) | PatternSegment::CatchAll(name) => Some(name.clone()),
            })
            .collect();
        let catch_all = matches!(self.segments.last(), Some(PatternSegment::CatchAll(_)));
        RouteShape::new(parameters, catch_all)
    }

    /// Match `path` and return the captured route values.
    pub fn matches(&self, path: &str) -> Option<RouteValues> {
        let mut rest = path.strip_prefix('/').unwrap_or(path);
        let mut values = RouteValues::new();

        for segment in &self.segments {
            if let PatternSegment::CatchAll(name) = segment {
                values.insert(name.as_str(), rest);
                return Some(values);
            }
            if rest.is_empty() {
                return None;
            }
            let (head, tail) = rest.split_once('/').unwrap_or((rest, ""));
            match segment {
                PatternSegment::Literal(literal) if head.eq_ignore_ascii_case(literal) => {}
                PatternSegment::Parameter(name) if !head.is_empty() => {
                    values.insert(name.as_str(), head);
                }
                _ => return None,
            }
            rest = tail;
        }

        rest.is_empty().then_some(values)
    }
}

fn parse_segment(raw: &str) -> Result<PatternSegment, RoutePatternError> {
    let Some(inner) = raw.strip_prefix('{').and_then(|s| s.strip_suffix('}')) else {
        if raw.contains('{') || raw.contains('}') {
            return Err(RoutePatternError::InvalidSegment {
                segment: raw.to_string(),
            });
        }
        return Ok(PatternSegment::Literal(raw.to_string()));
    };

    let (catch_all, name) = match inner.strip_prefix("**").or_else(|| inner.strip_prefix('*')) {
        Some(name) => (true, name),
        None => (false, inner),
    };
    let valid = !name.is_empty()
        && !name
            .chars()
            .any(|c| matches!(c, '{' | '}' | '/' | '*' | '?' | '=' | ':'));
    if !valid {
        return Err(RoutePatternError::InvalidParameterName {
            segment: raw.to_string(),
        });
    }

    Ok(if catch_all {
        PatternSegment::CatchAll(name.to_string())
    } else {
        PatternSegment::Parameter(name.to_string())
    })
}

/// Matches the request host.
#[derive(Debug, Clone)]
pub struct HostMatcher {
    expected_host: String,
}

impl HostMatcher {
    /// Create a new host matcher.
    /// The host is normalized to lowercase and any port is dropped.
    pub fn new(host: impl AsRef<str>) -> Self {
        Self {
            expected_host: strip_port(host.as_ref()).to_lowercase(),
        }
    }

    /// `host` is the raw `Host` header or URI authority.
    pub fn matches(&self, host: Option<&str>) -> bool {
        host.map(|h| strip_port(h).eq_ignore_ascii_case(&self.expected_host))
            .unwrap_or(false)
    }
}

fn strip_port(host: &str) -> &str {
    if let Some(bracketed) = host.strip_prefix('[') {
        return bracketed.split(']').next().unwrap_or(bracketed);
    }
    match host.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    }
}

/// Everything a request must satisfy to select a route.
#[derive(Debug, Clone)]
pub struct RouteMatcher {
    host: Option<HostMatcher>,
    path: PathPattern,
}

impl RouteMatcher {
    pub fn new(host: Option<HostMatcher>, path: PathPattern) -> Self {
        Self { host, path }
    }

    pub fn path(&self) -> &PathPattern {
        &self.path
    }

    /// AND of host and path; the route values are those of the path match.
    pub fn matches(&self, host: Option<&str>, path: &str) -> Option<RouteValues> {
        if let Some(matcher) = &self.host {
            if !matcher.matches(host) {
                return None;
            }
        }
        self.path.matches(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn captured(pattern: &str, path: &str) -> Option<Vec<(String, String)>> {
        PathPattern::parse(pattern)
            .unwrap()
            .matches(path)
            .map(|values| values.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
    }

    fn pairs(items: &[(&str, &str)]) -> Option<Vec<(String, String)>> {
        Some(items.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
    }

    #[test]
    fn test_host_matcher() {
        let matcher = HostMatcher::new("example.com");
        assert!(matcher.matches(Some("example.com")));
        assert!(matcher.matches(Some("EXAMPLE.COM"))); // Case insensitive
        assert!(matcher.matches(Some("example.com:8443")));
        assert!(!matcher.matches(Some("other.com")));
        assert!(!matcher.matches(None));

        let ipv6 = HostMatcher::new("[::1]:8080");
        assert!(ipv6.matches(Some("[::1]")));
    }

    #[test]
    fn test_literal_and_parameter_segments() {
        assert_eq!(captured("/api/users", "/API/Users"), pairs(&[]));
        assert_eq!(captured("/api/users", "/api/users/"), pairs(&[]));
        assert_eq!(captured("/api/users", "/api"), None);
        assert_eq!(captured("/api/{id}", "/api/42"), pairs(&[("id", "42")]));
        assert_eq!(captured("/api/{id}", "/api/"), None);
        assert_eq!(captured("/api/{id}", "/api/42/x"), None);
        assert_eq!(captured("/", "/"), pairs(&[]));
        assert_eq!(captured("/", "/a"), None);
    }

    #[test]
    fn test_catch_all_segment() {
        assert_eq!(
            captured("/api/{**rest}", "/api/a/b%20c/"),
            pairs(&[("rest", "a/b%20c/")])
        );
        assert_eq!(captured("/api/{*rest}", "/api"), pairs(&[("rest", "")]));
        assert_eq!(captured("/{**catch-all}", "/"), pairs(&[("catch-all", "")]));
        assert_eq!(captured("/api/{**rest}", "/other/a"), None);
    }

    #[test]
    fn test_shape() {
        let pattern = PathPattern::parse("/{tenant}/files/{**path}").unwrap();
        let shape = pattern.shape();
        assert_eq!(shape.parameters(), ["tenant".to_string(), "path".to_string()]);
        assert!(shape.uses_catch_all());

        let shape = PathPattern::parse("/static").unwrap().shape();
        assert!(shape.parameters().is_empty());
        assert!(!shape.uses_catch_all());
    }

    #[test]
    fn test_invalid_patterns() {
        assert!(matches!(
            PathPattern::parse("api"),
            Err(RoutePatternError::MissingLeadingSlash(_))
        ));
        assert!(matches!(
            PathPattern::parse("/a//b"),
            Err(RoutePatternError::EmptySegment(_))
        ));
        assert!(matches!(
            PathPattern::parse("/v{version}"),
            Err(RoutePatternError::InvalidSegment { .. })
        ));
        assert!(matches!(
            PathPattern::parse("/{}"),
            Err(RoutePatternError::InvalidParameterName { .. })
        ));
        assert!(matches!(
            PathPattern::parse("/{a}/{A}"),
            Err(RoutePatternError::DuplicateParameter(_))
        ));
        assert!(matches!(
            PathPattern::parse("/{**rest}/tail"),
            Err(RoutePatternError::CatchAllNotLast(_))
        ));
    }

    #[test]
    fn test_route_matcher_combines_conditions() {
        let matcher = RouteMatcher::new(
            Some(HostMatcher::new("api.example.com")),
            PathPattern::parse("/v1/{**rest}").unwrap(),
        );
        assert!(matcher.matches(Some("api.example.com"), "/v1/x").is_some());
        assert!(matcher.matches(Some("www.example.com"), "/v1/x").is_none());
        assert!(matcher.matches(Some("api.example.com"), "/v2/x").is_none());

        let any_host = RouteMatcher::new(None, PathPattern::parse("/v1").unwrap());
        assert!(any_host.matches(None, "/v1").is_some());
    }
}
