//! Run-scoped key/value store shared by every step.
//!
//! # Design
//! Reads go through an explicit chain: the in-memory map first, then each
//! fallback `Source` in the order it was added. The default chain has a single
//! fallback, the process environment. Writes only ever touch the map.
//!
//! A lookup counts as found only when it yields a non-empty string, so an
//! entry explicitly set to `""` defers to the fallbacks.

use std::collections::HashMap;
use std::fmt;

/// Read-only lookup source consulted when the session map has no value.
pub trait Source: fmt::Debug {
    fn lookup(&self, key: &str) -> Option<String>;
}

/// Falls back to the process environment, keyed by exact variable name.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSource;

impl Source for EnvSource {
    fn lookup(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Fixed key/value pairs, handy for layering presets under the session.
impl Source for HashMap<String, String> {
    fn lookup(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

#[derive(Debug)]
pub struct Session {
    values: HashMap<String, String>,
    sources: Vec<Box<dyn Source>>,
}

impl Session {
    /// Empty session that falls back to the process environment.
    pub fn new() -> Self {
        Self::from_values(HashMap::new())
    }

    /// Session seeded with `values`, falling back to the process environment.
    pub fn from_values(values: HashMap<String, String>) -> Self {
        Self {
            values,
            sources: vec![Box::new(EnvSource)],
        }
    }

    /// Session with no fallback at all.
    pub fn isolated() -> Self {
        Self {
            values: HashMap::new(),
            sources: Vec::new(),
        }
    }

    /// Append `source` to the end of the fallback chain.
    pub fn with_source(mut self, source: impl Source + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    pub fn get(&self, key: &str) -> Option<String> {
        if let Some(value) = self.values.get(key).filter(|v| !v.is_empty()) {
            return Some(value.clone());
        }
        self.sources
            .iter()
            .find_map(|source| source.lookup(key).filter(|v| !v.is_empty()))
    }

    pub fn put(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Number of in-memory entries. Fallback sources are not counted.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// In-memory entries, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for Session {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.put(key, value);
        }
    }
}
