//! Key Schema Module
//!
//! Maps logical cache keys onto the key attributes of the backing table.

use crate::store::{AttributeValue, Item, KeyRecord};

// == Key Schema ==
/// Partition attribute plus an optional fixed-value sort attribute.
///
/// With a sort attribute configured, several logical caches can share one
/// physical table, each under its own sort value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySchema {
    partition_attribute: String,
    sort: Option<(String, String)>,
}

impl KeySchema {
    pub fn new(partition_attribute: impl Into<String>, sort: Option<(String, String)>) -> Self {
        Self {
            partition_attribute: partition_attribute.into(),
            sort,
        }
    }

    pub fn partition_attribute(&self) -> &str {
        &self.partition_attribute
    }

    /// Sort attribute name and its fixed value, when in compound-key mode.
    pub fn sort_key(&self) -> Option<(&str, &str)> {
        self.sort
            .as_ref()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    // == Resolve ==
    /// Builds the key record addressing `logical_key`.
    pub fn resolve(&self, logical_key: &str) -> KeyRecord {
        let mut record = KeyRecord::with_capacity(2);
        record.insert(
            self.partition_attribute.clone(),
            AttributeValue::from(logical_key),
        );
        if let Some((name, value)) = &self.sort {
            record.insert(name.clone(), AttributeValue::from(value.as_str()));
        }
        record
    }

    /// Recovers the logical key from a stored item.
    ///
    /// Returns `None` when the item lacks a string partition value or belongs
    /// to a different sort namespace.
    pub fn logical_key<'a>(&self, item: &'a Item) -> Option<&'a str> {
        if let Some((name, value)) = &self.sort {
            if item.get(name).and_then(AttributeValue::as_str) != Some(value.as_str()) {
                return None;
            }
        }
        item.get(&self.partition_attribute)
            .and_then(AttributeValue::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compound() -> KeySchema {
        KeySchema::new("pk", Some(("sk".to_string(), "apq".to_string())))
    }

    #[test]
    fn test_resolve_simple_key() {
        let schema = KeySchema::new("CacheKey", None);
        let record = schema.resolve("hello");

        assert_eq!(record.len(), 1);
        assert_eq!(record.get("CacheKey"), Some(&AttributeValue::from("hello")));
    }

    #[test]
    fn test_resolve_compound_key() {
        let record = compound().resolve("hello");

        assert_eq!(record.len(), 2);
        assert_eq!(record.get("pk"), Some(&AttributeValue::from("hello")));
        assert_eq!(record.get("sk"), Some(&AttributeValue::from("apq")));
    }

    #[test]
    fn test_logical_key_round_trips_resolved_record() {
        let schema = compound();
        let item = schema.resolve("hello");
        assert_eq!(schema.logical_key(&item), Some("hello"));
    }

    #[test]
    fn test_logical_key_rejects_other_namespace() {
        let schema = compound();
        let mut item = schema.resolve("hello");
        item.insert("sk".to_string(), AttributeValue::from("other"));

        assert_eq!(schema.logical_key(&item), None);
    }

    #[test]
    fn test_logical_key_requires_string_partition() {
        let schema = KeySchema::new("CacheKey", None);
        let item = Item::from([("CacheKey".to_string(), AttributeValue::from(1))]);

        assert_eq!(schema.logical_key(&item), None);
    }
}
