//! Free-form metadata dictionaries.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// String-keyed JSON metadata carried by products, variants, carts and orders.
///
/// Keys are kept in sorted order so serialized documents are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<String, serde_json::Value>);

impl Metadata {
    /// Creates an empty metadata dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a key/value pair, replacing any previous value for the key.
    pub fn insert(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.0.insert(key.into(), value);
    }

    /// Returns the value for a key, if present.
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    /// Removes a key, returning its value if it was present.
    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        self.0.remove(key)
    }

    /// Returns true if the key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Returns true if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates over entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &serde_json::Value)> {
        self.0.iter()
    }
}

impl From<BTreeMap<String, serde_json::Value>> for Metadata {
    fn from(map: BTreeMap<String, serde_json::Value>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, serde_json::Value)> for Metadata {
    fn from_iter<T: IntoIterator<Item = (String, serde_json::Value)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let mut metadata = Metadata::new();
        assert!(metadata.is_empty());

        metadata.insert("color", serde_json::json!("red"));
        metadata.insert("weight_grams", serde_json::json!(250));

        assert_eq!(metadata.len(), 2);
        assert_eq!(metadata.get("color"), Some(&serde_json::json!("red")));
        assert!(metadata.get("missing").is_none());
    }

    #[test]
    fn test_remove() {
        let mut metadata = Metadata::new();
        metadata.insert("key", serde_json::json!(true));

        assert_eq!(metadata.remove("key"), Some(serde_json::json!(true)));
        assert!(metadata.remove("key").is_none());
        assert!(metadata.is_empty());
    }

    #[test]
    fn test_serializes_as_plain_object() {
        let mut metadata = Metadata::new();
        metadata.insert("b", serde_json::json!(2));
        metadata.insert("a", serde_json::json!(1));

        let json = serde_json::to_string(&metadata).unwrap();
        assert_eq!(json, r#"{"a":1,"b":2}"#);

        let deserialized: Metadata = serde_json::from_str(&json).unwrap();
        assert_eq!(metadata, deserialized);
    }
}
