//! Per-request state handed to transforms.
//!
//! `RequestState` and `ResponseState` are owned by exactly one in-flight
//! request; transforms mutate them in place.

use axum::http::{HeaderMap, Method, StatusCode};
use url::form_urlencoded;

/// Named values extracted by route matching, e.g. `{id}` → `"42"`.
///
/// Lookups are case-insensitive. Routes carry a handful of values, so a flat
/// list beats hashing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteValues {
    entries: Vec<(String, String)>,
}

impl RouteValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(&key)) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Total length of all values.
    pub(crate) fn value_len(&self) -> usize {
        self.entries.iter().map(|(_, v)| v.len()).sum()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RouteValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut values = RouteValues::new();
        for (k, v) in iter {
            values.insert(k, v);
        }
        values
    }
}

/// The outgoing query string.
///
/// The raw inbound query is forwarded byte for byte unless a query transform
/// touches it; only then is it parsed and re-serialized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryString {
    raw: Option<String>,
    params: Option<Vec<(String, String)>>,
}

impl QueryString {
    /// Wrap a raw query (without the leading `?`).
    pub fn from_raw(raw: Option<&str>) -> Self {
        Self {
            raw: raw.filter(|q| !q.is_empty()).map(str::to_string),
            params: None,
        }
    }

    fn params_mut(&mut self) -> &mut Vec<(String, String)> {
        let raw = &self.raw;
        self.params.get_or_insert_with(|| {
            raw.as_deref()
                .map(|q| form_urlencoded::parse(q.as_bytes()).into_owned().collect())
                .unwrap_or_default()
        })
    }

    /// First value of `name` (case-insensitive).
    pub fn get(&self, name: &str) -> Option<String> {
        match &self.params {
            Some(params) => params
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.clone()),
            None => self.raw.as_deref().and_then(|q| {
                form_urlencoded::parse(q.as_bytes())
                    .find(|(k, _)| k.eq_ignore_ascii_case(name))
                    .map(|(_, v)| v.into_owned())
            }),
        }
    }

    /// Replace every value of `name` with `value`.
    pub fn set(&mut self, name: &str, value: &str) {
        let params = self.params_mut();
        params.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        params.push((name.to_string(), value.to_string()));
    }

    /// Add a value for `name`, keeping existing ones.
    pub fn append(&mut self, name: &str, value: &str) {
        self.params_mut().push((name.to_string(), value.to_string()));
    }

    /// Remove every value of `name`.
    pub fn remove(&mut self, name: &str) {
        self.params_mut().retain(|(k, _)| !k.eq_ignore_ascii_case(name));
    }

    /// Serialized query without `?`, or `None` when empty.
    pub fn to_query_string(&self) -> Option<String> {
        match &self.params {
            None => self.raw.clone(),
            Some(params) if params.is_empty() => None,
            Some(params) => Some(
                form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(params.iter())
                    .finish(),
            ),
        }
    }
}

/// Mutable view of the request about to be sent upstream.
#[derive(Debug, Clone)]
pub struct RequestState {
    pub method: Method,
    /// Path as sent upstream, appended to the destination's base URL.
    pub path: String,
    pub query: QueryString,
    pub headers: HeaderMap,
    /// Values captured by route matching for this request.
    pub route_values: RouteValues,
}

impl RequestState {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            query: QueryString::default(),
            headers: HeaderMap::new(),
            route_values: RouteValues::new(),
        }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_query(mut self, raw: Option<&str>) -> Self {
        self.query = QueryString::from_raw(raw);
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_route_values(mut self, route_values: RouteValues) -> Self {
        self.route_values = route_values;
        self
    }
}

/// Mutable view of the upstream response before it is relayed to the client.
#[derive(Debug, Clone)]
pub struct ResponseState {
    pub status: StatusCode,
    pub headers: HeaderMap,
}

impl ResponseState {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
        }
    }
}
