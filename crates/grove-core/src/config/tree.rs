use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::error::ConfigError;

/// Hierarchical configuration tree addressed by dotted keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigTree {
    root: Map<String, Value>,
}

impl ConfigTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tree from a JSON value. Anything but an object yields `None`.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(root) => Some(Self { root }),
            _ => None,
        }
    }

    pub fn as_value(&self) -> Value {
        Value::Object(self.root.clone())
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.root)
    }

    /// Value at a dotted path
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.root.get(first)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Value at a dotted path converted to `T`
    pub fn get_as<T: DeserializeOwned>(&self, path: &str) -> Option<T> {
        self.get(path)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn get_or<T: DeserializeOwned>(&self, path: &str, default: T) -> T {
        self.get_as(path).unwrap_or(default)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Set a value at a dotted path, creating intermediate objects and
    /// replacing any scalar found on the way
    pub fn set<T: Serialize>(&mut self, path: &str, value: T) -> Result<(), ConfigError> {
        let value = serde_json::to_value(value).map_err(|e| ConfigError::InvalidValue {
            key: path.to_string(),
            message: e.to_string(),
        })?;

        let segments: Vec<&str> = path.split('.').collect();
        let (last, parents) = match segments.split_last() {
            Some((last, parents)) if !last.is_empty() => (*last, parents),
            _ => {
                return Err(ConfigError::InvalidValue {
                    key: path.to_string(),
                    message: "empty key".to_string(),
                })
            }
        };

        let mut current = &mut self.root;
        for segment in parents {
            let slot = current
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            current = match slot.as_object_mut() {
                Some(map) => map,
                None => {
                    return Err(ConfigError::InvalidValue {
                        key: path.to_string(),
                        message: format!("'{}' is not a table", segment),
                    })
                }
            };
        }
        current.insert(last.to_string(), value);
        Ok(())
    }

    pub fn remove(&mut self, path: &str) -> Option<Value> {
        let (parents, last) = match path.rsplit_once('.') {
            Some((parents, last)) => (Some(parents), last),
            None => (None, path),
        };
        let map = match parents {
            Some(parents) => {
                let mut current = &mut self.root;
                for segment in parents.split('.') {
                    current = current.get_mut(segment)?.as_object_mut()?;
                }
                current
            }
            None => &mut self.root,
        };
        map.remove(last)
    }

    /// Deep-merge `other` into this tree. Nested objects merge key by key;
    /// any other value in `other` replaces the existing one.
    pub fn merge(&mut self, other: &ConfigTree) {
        merge_maps(&mut self.root, &other.root);
    }

    /// Object at a dotted path as its own tree; empty when absent or not an object
    pub fn subtree(&self, path: &str) -> ConfigTree {
        self.get(path)
            .and_then(|v| v.as_object())
            .map(|m| ConfigTree { root: m.clone() })
            .unwrap_or_default()
    }

    /// Leaf values keyed by their full dotted path
    pub fn flatten(&self) -> BTreeMap<String, Value> {
        let mut out = BTreeMap::new();
        flatten_into(&self.root, "", &mut out);
        out
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.root.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Deserialize the whole tree into `T`
    pub fn deserialize_into<T: DeserializeOwned>(&self) -> Result<T, ConfigError> {
        serde_json::from_value(self.as_value()).map_err(|e| ConfigError::InvalidValue {
            key: "<root>".to_string(),
            message: e.to_string(),
        })
    }
}

fn merge_maps(target: &mut Map<String, Value>, source: &Map<String, Value>) {
    for (key, value) in source {
        match (target.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => merge_maps(existing, incoming),
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

fn flatten_into(map: &Map<String, Value>, prefix: &str, out: &mut BTreeMap<String, Value>) {
    for (key, value) in map {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match value {
            Value::Object(nested) if !nested.is_empty() => flatten_into(nested, &path, out),
            _ => {
                out.insert(path, value.clone());
            }
        }
    }
}

impl From<Map<String, Value>> for ConfigTree {
    fn from(root: Map<String, Value>) -> Self {
        Self { root }
    }
}
