//! Request templates.
//!
//! # Design
//! A `Request` is the editable, still-templated form of a step's HTTP call.
//! Pre-processors and the resolver rewrite it; the runner then turns it into
//! an `HttpRequest`. Host, path, body and query values may contain `${...}`
//! placeholders. Headers are not templated.

use std::collections::BTreeMap;

use crate::http::HttpMethod;

pub const CONTENT_TYPE: &str = "Content-Type";
pub const APPLICATION_JSON: &str = "application/json";

/// Multi-valued header map with case-insensitive names.
///
/// Names are stored in canonical form (`content-type` → `Content-Type`) and
/// iterate in sorted order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: BTreeMap<String, Vec<String>>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `value` to the values already present for `name`.
    pub fn add(&mut self, name: &str, value: impl Into<String>) {
        self.entries
            .entry(canonical_name(name))
            .or_default()
            .push(value.into());
    }

    /// Replace every value of `name` with `value`.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.entries.insert(canonical_name(name), vec![value.into()]);
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&canonical_name(name))
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn get_all(&self, name: &str) -> &[String] {
        self.entries
            .get(&canonical_name(name))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        self.entries.remove(&canonical_name(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&canonical_name(name))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One `(name, value)` pair per value.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .flat_map(|(name, values)| values.iter().map(move |v| (name.as_str(), v.as_str())))
    }
}

/// `x-request-id` → `X-Request-Id`.
fn canonical_name(name: &str) -> String {
    name.trim()
        .split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => {
                    first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// Templated HTTP request owned by a `Step`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: HttpMethod,
    /// Overrides the session `host` when non-empty and parsable as a URL.
    pub host: Option<String>,
    pub path: String,
    pub body: String,
    /// Defaults to `application/json` when a body is present.
    pub content_type: Option<String>,
    pub query: BTreeMap<String, String>,
    pub headers: Headers,
}

impl Request {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            host: None,
            path: path.into(),
            body: String::new(),
            content_type: None,
            query: BTreeMap::new(),
            headers: Headers::new(),
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.add(name, value);
        self
    }
}
