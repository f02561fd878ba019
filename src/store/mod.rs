//! Backing Store Module
//!
//! The document-store collaborator the cache adapter talks to. A store only
//! has to offer independent point operations; the batched read is optional
//! and falls back to concurrent point reads.

mod dynamodb;
mod memory;

use std::collections::HashMap;

use async_trait::async_trait;
use futures::future::try_join_all;

use crate::error::StoreError;

pub use dynamodb::DynamoDbStore;
pub use memory::{MemoryStore, StoreCall};

// == Attribute Value ==
/// An attribute as stored in the backing table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttributeValue {
    /// String attribute
    S(String),
    /// Integer number attribute
    N(i64),
    /// Any attribute the cache has no use for, described by its type tag.
    /// Kept on reads so a record holding one is rejected rather than
    /// silently losing the attribute.
    Other(String),
}

impl AttributeValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::S(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<i64> {
        match self {
            AttributeValue::N(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::S(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::S(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::N(value)
    }
}

/// A full record, keyed by attribute name.
pub type Item = HashMap<String, AttributeValue>;

/// The key attributes addressing one record.
pub type KeyRecord = HashMap<String, AttributeValue>;

// == Document Store Trait ==
/// Point operations against a single table. Each call is one network round trip.
#[async_trait]
pub trait DocumentStore: Send + Sync + std::fmt::Debug {
    /// Reads one record; `Ok(None)` when no record exists for the key.
    async fn get_item(&self, table: &str, key: KeyRecord) -> Result<Option<Item>, StoreError>;

    /// Writes one record, fully replacing any existing record with the same key.
    async fn put_item(&self, table: &str, item: Item) -> Result<(), StoreError>;

    /// Deletes one record. Deleting an absent key succeeds.
    async fn delete_item(&self, table: &str, key: KeyRecord) -> Result<(), StoreError>;

    /// Reads up to `keys.len()` records in one call.
    ///
    /// Returns the subset of records actually found, in any order. Callers
    /// must match results back by key attributes, never by position.
    async fn batch_get_items(
        &self,
        table: &str,
        keys: Vec<KeyRecord>,
    ) -> Result<Vec<Item>, StoreError> {
        let reads = keys.into_iter().map(|key| self.get_item(table, key));
        let found = try_join_all(reads).await?;
        Ok(found.into_iter().flatten().collect())
    }
}
