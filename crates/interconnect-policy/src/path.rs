//! Dotted paths into an interpreted passport
//!
//! `payload.stats.level` addresses `value["stats"]["level"]`. The leading
//! `payload` segment is optional; it names the root. Numeric segments index
//! into arrays.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use interconnect_core::InterconnectError;

const ROOT: &str = "payload";

/// Location of a field in an interpreted passport
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The path names the whole payload
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn lookup<'a>(&self, value: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(value, |current, segment| step(current, segment))
    }

    /// Remove the addressed field, returning it. The root cannot be removed.
    pub fn remove(&self, value: &mut Value) -> Option<Value> {
        let (last, parents) = self.segments.split_last()?;
        let mut current = value;
        for segment in parents {
            current = step_mut(current, segment)?;
        }
        match current {
            Value::Object(map) => map.remove(last),
            Value::Array(items) => {
                let index: usize = last.parse().ok()?;
                (index < items.len()).then(|| items.remove(index))
            }
            _ => None,
        }
    }
}

fn step<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => items.get(segment.parse::<usize>().ok()?),
        _ => None,
    }
}

fn step_mut<'a>(value: &'a mut Value, segment: &str) -> Option<&'a mut Value> {
    match value {
        Value::Object(map) => map.get_mut(segment),
        Value::Array(items) => items.get_mut(segment.parse::<usize>().ok()?),
        _ => None,
    }
}

impl FromStr for FieldPath {
    type Err = InterconnectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut segments: Vec<String> = s.split('.').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(InterconnectError::Config(format!("invalid field path `{s}`")));
        }
        if segments.first().map(String::as_str) == Some(ROOT) {
            segments.remove(0);
        }
        Ok(FieldPath { segments })
    }
}

impl TryFrom<String> for FieldPath {
    type Error = InterconnectError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<FieldPath> for String {
    fn from(path: FieldPath) -> String {
        path.to_string()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(ROOT)?;
        for segment in &self.segments {
            write!(f, ".{segment}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldPath({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(s: &str) -> FieldPath {
        s.parse().unwrap()
    }

    #[test]
    fn test_payload_prefix_is_optional() {
        assert_eq!(path("payload.age_days"), path("age_days"));
        assert_eq!(path("age_days").to_string(), "payload.age_days");
        assert!(path("payload").is_root());
    }

    #[test]
    fn test_lookup_nested_and_arrays() {
        let value = json!({"stats": {"level": 7}, "items": ["sword", "shield"]});
        assert_eq!(path("stats.level").lookup(&value), Some(&json!(7)));
        assert_eq!(path("items.1").lookup(&value), Some(&json!("shield")));
        assert_eq!(path("items.9").lookup(&value), None);
        assert_eq!(path("stats.level.deeper").lookup(&value), None);
        assert_eq!(path("payload").lookup(&value), Some(&value));
    }

    #[test]
    fn test_remove() {
        let mut value = json!({"stats": {"level": 7, "xp": 100}, "items": ["a", "b"]});
        assert_eq!(path("stats.xp").remove(&mut value), Some(json!(100)));
        assert_eq!(path("items.0").remove(&mut value), Some(json!("a")));
        assert_eq!(path("missing").remove(&mut value), None);
        assert_eq!(path("payload").remove(&mut value), None);
        assert_eq!(value, json!({"stats": {"level": 7}, "items": ["b"]}));
    }

    #[test]
    fn test_invalid_paths() {
        assert!("a..b".parse::<FieldPath>().is_err());
        assert!("".parse::<FieldPath>().is_err());
        assert!(serde_json::from_str::<FieldPath>("\".x\"").is_err());
    }
}
