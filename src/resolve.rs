// src/resolve.rs

//! Dotted-path resolution against a results map.

use std::fmt;

use serde_json::{Map, Value};

/// A dotted reference split into its segments, e.g. `getGenre.id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RefPath(Vec<String>);

impl RefPath {
    pub fn parse(s: &str) -> Self {
        Self(s.split('.').map(str::to_string).collect())
    }

    pub fn from_segments(segments: Vec<String>) -> Self {
        Self(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// First segment: the name looked up in the results map.
    pub fn root(&self) -> &str {
        self.0.first().map(String::as_str).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Split off the last segment, e.g. `a.b.m` into (`a.b`, `m`).
    pub fn split_last(mut self) -> (RefPath, String) {
        let last = self.0.pop().unwrap_or_default();
        (self, last)
    }

    /// Prefix the path with another segment.
    pub fn prefixed(mut self, root: &str) -> Self {
        self.0.insert(0, root.to_string());
        self
    }
}

impl fmt::Display for RefPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

/// Resolution hit a null value before the last segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingSegment {
    /// Task whose argument was being resolved.
    pub task: String,
    /// The segment that could not be looked up.
    pub segment: String,
    /// Dotted path walked so far; its value was null.
    pub traversed: String,
}

/// Resolve `path` against `results`.
///
/// A single segment is a plain lookup (absent keys read as `null`). Longer
/// paths walk object members, or array elements for numeric segments; the
/// final value may be `null` but nothing before it may be.
pub fn resolve(
    results: &Map<String, Value>,
    path: &RefPath,
    task: &str,
) -> Result<Value, MissingSegment> {
    let segments = path.segments();
    let mut current = results.get(path.root()).unwrap_or(&Value::Null);

    for (i, segment) in segments.iter().enumerate().skip(1) {
        if current.is_null() {
            return Err(MissingSegment {
                task: task.to_string(),
                segment: segment.clone(),
                traversed: segments[..i].join("."),
            });
        }
        current = member(current, segment);
    }

    Ok(current.clone())
}

fn member<'a>(value: &'a Value, segment: &str) -> &'a Value {
    match value {
        Value::Object(map) => map.get(segment).unwrap_or(&Value::Null),
        Value::Array(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(|idx| items.get(idx))
            .unwrap_or(&Value::Null),
        _ => &Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn results() -> Map<String, Value> {
        match json!({
            "page": { "chapter": { "book": { "genreId": 4 } } },
            "books": [ { "id": 7 }, { "id": 8 } ],
            "nothing": null
        }) {
            Value::Object(m) => m,
            _ => unreachable!(),
        }
    }

    #[test]
    fn single_segment_is_direct_lookup() {
        let r = results();
        assert_eq!(resolve(&r, &RefPath::parse("missing"), "t"), Ok(Value::Null));
        assert_eq!(
            resolve(&r, &RefPath::parse("books"), "t").unwrap(),
            json!([{ "id": 7 }, { "id": 8 }])
        );
    }

    #[test]
    fn walks_nested_members_and_indices() {
        let r = results();
        assert_eq!(
            resolve(&r, &RefPath::parse("page.chapter.book.genreId"), "t"),
            Ok(json!(4))
        );
        assert_eq!(resolve(&r, &RefPath::parse("books.1.id"), "t"), Ok(json!(8)));
        assert_eq!(resolve(&r, &RefPath::parse("page.chapter.title"), "t"), Ok(Value::Null));
    }

    #[test]
    fn null_before_last_segment_reports_traversed_path() {
        let r = results();
        let err = resolve(&r, &RefPath::parse("page.volume.book.id"), "getBook").unwrap_err();
        assert_eq!(err.task, "getBook");
        assert_eq!(err.traversed, "page.volume");
        assert_eq!(err.segment, "book");

        let err = resolve(&r, &RefPath::parse("nothing.id"), "t").unwrap_err();
        assert_eq!(err.traversed, "nothing");
    }
}
