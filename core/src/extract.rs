//! Path lookups into JSON response bodies.
//!
//! Paths are dotted segments: `data.items.0.id`. A numeric segment indexes an
//! array, any other segment names an object key, `\.` escapes a dot inside a
//! key, and a final `#` yields the length of the array reached so far.

use serde_json::Value;

/// Look up `path` in the JSON `body`.
///
/// Strings come back without quotes and `null` as an empty string; every other
/// value is rendered as compact JSON (`42`, `true`, `{"a":1}`). Returns `None` for non-JSON bodies
/// and for paths that do not match.
pub fn lookup(body: &str, path: &str) -> Option<String> {
    let root: Value = serde_json::from_str(body).ok()?;
    lookup_value(&root, path).map(render)
}

/// Walk `path` from `root` and return the JSON value it designates.
pub fn lookup_value(root: &Value, path: &str) -> Option<Value> {
    let segments = split_path(path);
    let mut current = root;
    for (position, segment) in segments.iter().enumerate() {
        if segment == "#" && position + 1 == segments.len() {
            return current.as_array().map(|items| Value::from(items.len()));
        }
        current = match current {
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            Value::Object(map) => map.get(segment.as_str())?,
            _ => return None,
        };
    }
    Some(current.clone())
}

fn render(value: Value) -> String {
    match value {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn split_path(path: &str) -> Vec<String> {
    if path.is_empty() {
        return Vec::new();
    }
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some(escaped) => current.push(escaped),
                None => current.push('\\'),
            },
            '.' => segments.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    segments.push(current);
    segments
}
