//! Cache Entry Module
//!
//! Converts between cache entries and the attribute maps the store persists.

use thiserror::Error;

use crate::cache::KeySchema;
use crate::config::CacheOptions;
use crate::store::{AttributeValue, Item};

// == Cache Entry ==
/// A single cache entry, owned for the duration of one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Logical cache key
    pub key: String,
    /// The stored value
    pub value: String,
    /// Absolute expiry in epoch seconds, None = never expires
    pub expires_at: Option<i64>,
}

/// A stored record that cannot be read back as a cache entry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedRecord {
    #[error("value attribute {0} is missing or not a string")]
    Value(String),

    #[error("expiry attribute {0} is not a number")]
    Expiry(String),
}

impl CacheEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>, expires_at: Option<i64>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            expires_at,
        }
    }

    // == To Item ==
    /// Builds the full item: key attributes, value and expiry.
    pub fn to_item(&self, schema: &KeySchema, options: &CacheOptions) -> Item {
        let mut item = schema.resolve(&self.key);
        item.insert(
            options.value_attribute.clone(),
            AttributeValue::from(self.value.as_str()),
        );
        if let Some(expires_at) = self.expires_at {
            item.insert(options.ttl_attribute.clone(), AttributeValue::N(expires_at));
        }
        item
    }

    // == From Item ==
    /// Reads an entry back from a stored item.
    ///
    /// A missing expiry attribute means the record never expires.
    pub fn from_item(
        key: impl Into<String>,
        item: &Item,
        options: &CacheOptions,
    ) -> Result<Self, MalformedRecord> {
        let value = item
            .get(&options.value_attribute)
            .and_then(AttributeValue::as_str)
            .ok_or_else(|| MalformedRecord::Value(options.value_attribute.clone()))?;

        let expires_at = match item.get(&options.ttl_attribute) {
            Some(raw) => Some(
                raw.as_number()
                    .ok_or_else(|| MalformedRecord::Expiry(options.ttl_attribute.clone()))?,
            ),
            None => None,
        };

        Ok(Self::new(key, value, expires_at))
    }
}
