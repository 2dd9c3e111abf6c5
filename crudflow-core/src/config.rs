//! Dot-path configuration store.
//!
//! Every action, listener and the orchestrator itself keep their settings
//! in a [`ConfigStore`]. Paths are dot separated (`"messages.success.text"`).
//!
//! # Merge rules
//!
//! - Writing a map onto an existing map merges them key by key, recursively.
//! - Scalars and lists are replaced wholesale; lists are never concatenated.
//! - Writing with `merge = false` replaces whatever was stored at the path.
//! - Missing intermediate maps are created on write. A non-map value sitting
//!   on the path is replaced by a map.
//! - Reading a missing path yields `None`, never an error.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Hierarchical configuration addressed by dot-separated paths.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigStore {
    root: Map<String, Value>,
}

impl ConfigStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store from a JSON value. Anything other than an object
    /// yields an empty store.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(root) => Self { root },
            _ => Self::default(),
        }
    }

    /// Build a store from class-level defaults with instance overrides
    /// merged on top.
    pub fn with_defaults(defaults: Value, overrides: Value) -> Self {
        let mut store = Self::from_value(defaults);
        store.merge(overrides);
        store
    }

    /// Read the value stored at `path`.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.root.get(first)?;
        for segment in segments {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(list) => list.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Read a string value.
    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    /// Read a boolean value.
    pub fn get_bool(&self, path: &str) -> Option<bool> {
        self.get(path).and_then(Value::as_bool)
    }

    /// Read an integer value.
    pub fn get_i64(&self, path: &str) -> Option<i64> {
        self.get(path).and_then(Value::as_i64)
    }

    /// Read a map value.
    pub fn get_map(&self, path: &str) -> Option<&Map<String, Value>> {
        self.get(path).and_then(Value::as_object)
    }

    /// Deserialize the subtree at `path` into `T`.
    ///
    /// Returns `None` when the path is missing or the shape doesn't match.
    pub fn get_as<T: DeserializeOwned>(&self, path: &str) -> Option<T> {
        self.get(path)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Whether a value (including `null`) is stored at `path`.
    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Write `value` at `path`, merging maps.
    pub fn set(&mut self, path: &str, value: impl Into<Value>) {
        self.set_with(path, value, true);
    }

    /// Write `value` at `path`. With `merge` disabled the old value is
    /// replaced outright.
    pub fn set_with(&mut self, path: &str, value: impl Into<Value>, merge: bool) {
        let value = value.into();
        let mut segments: Vec<&str> = path.split('.').collect();
        let Some(last) = segments.pop() else {
            return;
        };

        let mut current = &mut self.root;
        for segment in segments {
            let slot = current
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            current = match slot {
                Value::Object(map) => map,
                _ => return,
            };
        }

        if merge {
            merge_value(
                current.entry(last.to_string()).or_insert(Value::Null),
                value,
            );
        } else {
            current.insert(last.to_string(), value);
        }
    }

    /// Merge a map into the root of the store.
    pub fn merge(&mut self, value: Value) {
        if let Value::Object(map) = value {
            for (key, value) in map {
                merge_value(self.root.entry(key).or_insert(Value::Null), value);
            }
        }
    }

    /// Remove and return the value stored at `path`.
    pub fn remove(&mut self, path: &str) -> Option<Value> {
        let (parent, last) = match path.rsplit_once('.') {
            Some((parent, last)) => (Some(parent), last),
            None => (None, path),
        };
        let map = match parent {
            Some(parent) => self.get_map_mut(parent)?,
            None => &mut self.root,
        };
        map.remove(last)
    }

    /// Borrow the whole tree.
    pub fn all(&self) -> &Map<String, Value> {
        &self.root
    }

    /// Consume the store and return its tree as a JSON value.
    pub fn into_value(self) -> Value {
        Value::Object(self.root)
    }

    fn get_map_mut(&mut self, path: &str) -> Option<&mut Map<String, Value>> {
        let mut current = &mut self.root;
        for segment in path.split('.') {
            current = current.get_mut(segment)?.as_object_mut()?;
        }
        Some(current)
    }
}

impl From<Value> for ConfigStore {
    fn from(value: Value) -> Self {
        Self::from_value(value)
    }
}

/// Merge `source` into `target`: maps recursively, everything else replaced.
pub fn merge_value(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(target), Value::Object(source)) => {
            for (key, value) in source {
                merge_value(target.entry(key).or_insert(Value::Null), value);
            }
        }
        (target, source) => *target = source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_path_is_none() {
        let store = ConfigStore::from_value(json!({"a": {"b": 1}}));
        assert!(store.get("a.c").is_none());
        assert!(store.get("a.b.c").is_none());
        assert!(store.get("x").is_none());
    }

    #[test]
    fn test_merge_keeps_sibling_keys() {
        let mut store = ConfigStore::new();
        store.set("a.b", json!({"x": 1}));
        store.set("a.b", json!({"y": 2}));
        assert_eq!(store.get("a.b"), Some(&json!({"x": 1, "y": 2})));
    }

    #[test]
    fn test_set_without_merge_replaces() {
        let mut store = ConfigStore::new();
        store.set("a.b", json!({"x": 1}));
        store.set_with("a.b", json!({"y": 2}), false);
        assert_eq!(store.get("a.b"), Some(&json!({"y": 2})));
    }

    #[test]
    fn test_lists_are_replaced_not_concatenated() {
        let mut store = ConfigStore::from_value(json!({"methods": ["put", "post"]}));
        store.set("methods", json!(["delete"]));
        assert_eq!(store.get("methods"), Some(&json!(["delete"])));
    }

    #[test]
    fn test_write_creates_intermediate_maps() {
        let mut store = ConfigStore::new();
        store.set("a.b.c", 3);
        assert_eq!(store.get_i64("a.b.c"), Some(3));

        // A scalar on the path is replaced by a map.
        store.set("a.b.c.d", true);
        assert_eq!(store.get_bool("a.b.c.d"), Some(true));
    }

    #[test]
    fn test_with_defaults_merges_nested_overrides() {
        let store = ConfigStore::with_defaults(
            json!({"messages": {"success": {"text": "Saved"}, "error": {"text": "Failed"}}}),
            json!({"messages": {"success": {"text": "Stored"}}}),
        );
        assert_eq!(store.get_str("messages.success.text"), Some("Stored"));
        assert_eq!(store.get_str("messages.error.text"), Some("Failed"));
    }

    #[test]
    fn test_numeric_segments_index_lists() {
        let store = ConfigStore::from_value(json!({"url": ["entity.field", "id"]}));
        assert_eq!(store.get_str("url.1"), Some("id"));
    }

    #[test]
    fn test_remove_nested() {
        let mut store = ConfigStore::from_value(json!({"a": {"b": 1, "c": 2}}));
        assert_eq!(store.remove("a.b"), Some(json!(1)));
        assert_eq!(store.get("a"), Some(&json!({"c": 2})));
        assert!(store.remove("a.z").is_none());
    }

    #[test]
    fn test_null_is_stored_and_visible() {
        let mut store = ConfigStore::from_value(json!({"validateId": "integer"}));
        store.set("validateId", Value::Null);
        assert!(store.contains("validateId"));
        assert_eq!(store.get("validateId"), Some(&Value::Null));
    }
}
