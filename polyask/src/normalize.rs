//! Extract display text from provider response bodies.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// One step into a JSON document.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(usize),
}

/// Dot-separated path into a JSON document; all-digit segments index arrays,
/// e.g. `choices.0.message.content`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    raw: String,
    segments: Vec<Segment>,
}

impl FieldPath {
    pub fn new(path: &str) -> Self {
        let segments = path
            .split('.')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                if s.bytes().all(|b| b.is_ascii_digit()) {
                    s.parse().map(Segment::Index).unwrap_or_else(|_| Segment::Key(s.to_string()))
                } else {
                    Segment::Key(s.to_string())
                }
            })
            .collect();
        Self {
            raw: path.trim().to_string(),
            segments,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The value at this path, if every step resolves.
    pub fn lookup<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        if self.segments.is_empty() {
            return None;
        }
        self.segments.iter().try_fold(root, |node, seg| match seg {
            Segment::Key(key) => node.get(key.as_str()),
            Segment::Index(idx) => match node {
                Value::Array(items) => items.get(*idx),
                // Numeric object keys ("0": ...) are still addressable.
                Value::Object(map) => map.get(&idx.to_string()),
                _ => None,
            },
        })
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<&str> for FieldPath {
    fn from(path: &str) -> Self {
        FieldPath::new(path)
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for FieldPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(FieldPath::new(&raw))
    }
}

/// First non-empty string found at `paths`, tried in order.
///
/// Returns `None` when nothing matches or `raw_body` is not JSON; callers then
/// show the raw body instead.
pub fn normalize(provider: &str, raw_body: &[u8], paths: &[FieldPath]) -> Option<String> {
    let root: Value = match serde_json::from_slice(raw_body) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!(provider, error = %e, "response body is not JSON");
            return None;
        }
    };

    let found = paths.iter().find_map(|path| {
        path.lookup(&root)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(|s| (path, s))
    });

    match found {
        Some((path, text)) => {
            tracing::debug!(provider, path = %path, "extracted display text");
            Some(text.to_string())
        }
        None => {
            tracing::debug!(provider, "no field path matched");
            None
        }
    }
}
