//! In-Memory Document Store
//!
//! A table store held in process memory. It behaves like a document store
//! with a lazy expiry sweep: expired records are never purged, so only the
//! reader's TTL check keeps them from being served.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::{AttributeValue, DocumentStore, Item, KeyRecord};
use crate::error::StoreError;

type StoredKey = BTreeMap<String, AttributeValue>;

// == Store Call ==
/// A recorded call, in the order the store received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    GetItem { table: String, key: KeyRecord },
    PutItem { table: String, item: Item },
    DeleteItem { table: String, key: KeyRecord },
    BatchGetItem { table: String, keys: Vec<KeyRecord> },
}

impl StoreCall {
    /// Operation name as reported in errors.
    pub fn operation(&self) -> &'static str {
        match self {
            StoreCall::GetItem { .. } => "GetItem",
            StoreCall::PutItem { .. } => "PutItem",
            StoreCall::DeleteItem { .. } => "DeleteItem",
            StoreCall::BatchGetItem { .. } => "BatchGetItem",
        }
    }
}

#[derive(Debug)]
struct Table {
    /// Key attribute names, partition first
    key_attributes: Vec<String>,
    items: HashMap<StoredKey, Item>,
}

impl Table {
    fn stored_key(
        &self,
        operation: &'static str,
        record: &HashMap<String, AttributeValue>,
    ) -> Result<StoredKey, StoreError> {
        let mut key = StoredKey::new();
        for name in &self.key_attributes {
            match record.get(name) {
                Some(value) => {
                    key.insert(name.clone(), value.clone());
                }
                None => {
                    return Err(StoreError::backend(
                        operation,
                        format!("missing key attribute {}", name),
                    ))
                }
            }
        }
        Ok(key)
    }
}

// == Memory Store ==
/// In-process document store with call recording and failure injection.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Table>>,
    calls: Mutex<Vec<StoreCall>>,
    fail_next: Mutex<Option<&'static str>>,
}

impl MemoryStore {
    // == Constructor ==
    /// Creates an empty store with no tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table keyed by `partition_key` and, optionally, `sort_key`.
    pub fn with_table(mut self, name: &str, partition_key: &str, sort_key: Option<&str>) -> Self {
        let mut key_attributes = vec![partition_key.to_string()];
        key_attributes.extend(sort_key.map(str::to_string));

        let table = Table {
            key_attributes,
            items: HashMap::new(),
        };
        self.tables.get_mut().insert(name.to_string(), table);
        self
    }

    /// Writes an item directly, without recording a call.
    ///
    /// Used to seed fixtures such as expired or malformed records.
    pub async fn insert_raw(&self, table: &str, item: Item) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let table = lookup_mut(&mut tables, "PutItem", table)?;
        let key = table.stored_key("PutItem", &item)?;
        table.items.insert(key, item);
        Ok(())
    }

    /// Reads an item directly, without recording a call or checking expiry.
    pub async fn peek(&self, table: &str, key: &KeyRecord) -> Option<Item> {
        let tables = self.tables.read().await;
        let table = tables.get(table)?;
        let key = table.stored_key("GetItem", key).ok()?;
        table.items.get(&key).cloned()
    }

    /// Number of items physically present in `table`.
    pub async fn len(&self, table: &str) -> usize {
        self.tables
            .read()
            .await
            .get(table)
            .map_or(0, |t| t.items.len())
    }

    /// All calls received so far.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn reset_calls(&self) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.clear();
        }
    }

    /// Makes the next call of `operation` (e.g. "GetItem") fail once.
    pub fn fail_next(&self, operation: &'static str) {
        if let Ok(mut slot) = self.fail_next.lock() {
            *slot = Some(operation);
        }
    }

    fn record(&self, call: StoreCall) -> Result<(), StoreError> {
        let operation = call.operation();
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }

        let mut slot = match self.fail_next.lock() {
            Ok(slot) => slot,
            Err(_) => return Ok(()),
        };
        if *slot == Some(operation) {
            *slot = None;
            return Err(StoreError::backend(operation, "injected failure"));
        }
        Ok(())
    }
}

fn lookup<'a>(
    tables: &'a HashMap<String, Table>,
    operation: &'static str,
    name: &str,
) -> Result<&'a Table, StoreError> {
    tables
        .get(name)
        .ok_or_else(|| StoreError::backend(operation, format!("table not found: {}", name)))
}

fn lookup_mut<'a>(
    tables: &'a mut HashMap<String, Table>,
    operation: &'static str,
    name: &str,
) -> Result<&'a mut Table, StoreError> {
    tables
        .get_mut(name)
        .ok_or_else(|| StoreError::backend(operation, format!("table not found: {}", name)))
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_item(&self, table: &str, key: KeyRecord) -> Result<Option<Item>, StoreError> {
        self.record(StoreCall::GetItem {
            table: table.to_string(),
            key: key.clone(),
        })?;

        let tables = self.tables.read().await;
        let table = lookup(&tables, "GetItem", table)?;
        let key = table.stored_key("GetItem", &key)?;
        Ok(table.items.get(&key).cloned())
    }

    async fn put_item(&self, table: &str, item: Item) -> Result<(), StoreError> {
        self.record(StoreCall::PutItem {
            table: table.to_string(),
            item: item.clone(),
        })?;

        let mut tables = self.tables.write().await;
        let table = lookup_mut(&mut tables, "PutItem", table)?;
        let key = table.stored_key("PutItem", &item)?;
        table.items.insert(key, item);
        Ok(())
    }

    async fn delete_item(&self, table: &str, key: KeyRecord) -> Result<(), StoreError> {
        self.record(StoreCall::DeleteItem {
            table: table.to_string(),
            key: key.clone(),
        })?;

        let mut tables = self.tables.write().await;
        let table = lookup_mut(&mut tables, "DeleteItem", table)?;
        let key = table.stored_key("DeleteItem", &key)?;
        table.items.remove(&key);
        Ok(())
    }

    async fn batch_get_items(
        &self,
        table: &str,
        keys: Vec<KeyRecord>,
    ) -> Result<Vec<Item>, StoreError> {
        self.record(StoreCall::BatchGetItem {
            table: table.to_string(),
            keys: keys.clone(),
        })?;

        let tables = self.tables.read().await;
        let table = lookup(&tables, "BatchGetItem", table)?;

        let mut found = Vec::with_capacity(keys.len());
        for key in &keys {
            let key = table.stored_key("BatchGetItem", key)?;
            if let Some(item) = table.items.get(&key) {
                found.push(item.clone());
            }
        }
        // Responses carry no ordering guarantee; reversing keeps callers honest.
        found.reverse();
        debug!(requested = keys.len(), found = found.len(), "batch read");
        Ok(found)
    }
}
