//! Cache Adapter Module
//!
//! get / set / delete against a document store, with key resolution and
//! client-side TTL enforcement. Store failures propagate; every other kind
//! of absence is a miss.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;
use tracing::{debug, warn};

use crate::cache::{
    CacheEntry, CacheStats, Clock, Expiry, KeySchema, StatsSnapshot, SystemClock, TtlPolicy,
};
use crate::config::CacheOptions;
use crate::error::Result;
use crate::store::{DocumentStore, Item};

// == Key Value Cache ==
/// The caller-facing cache contract.
#[async_trait]
pub trait KeyValueCache: Send + Sync {
    /// Returns the live value for `key`, or `None` on any kind of miss.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` for `ttl` seconds (configured default when `None`).
    /// A `ttl` <= 0 means "do not cache".
    async fn set(&self, key: &str, value: &str, ttl: Option<i64>) -> Result<SetOutcome>;

    /// Removes `key`. Removing an absent key succeeds.
    async fn delete(&self, key: &str) -> Result<()>;
}

/// What a `set` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    /// Record written with this absolute expiry
    Written { expires_at: i64 },
    /// Effective TTL was <= 0; the store was not called
    Skipped,
}

// == Document Cache ==
/// Cache adapter over a [`DocumentStore`]. Cheap to clone; clones share
/// configuration, store handle and statistics.
#[derive(Debug, Clone)]
pub struct DocumentCache {
    store: Arc<dyn DocumentStore>,
    options: Arc<CacheOptions>,
    schema: KeySchema,
    ttl: TtlPolicy,
    stats: Arc<CacheStats>,
}

impl DocumentCache {
    // == Constructor ==
    pub fn new(store: Arc<dyn DocumentStore>, options: CacheOptions) -> Self {
        Self::with_clock(store, options, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: Arc<dyn DocumentStore>,
        options: CacheOptions,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let schema = options.key_schema();
        let ttl = TtlPolicy::new(options.default_ttl, clock);
        Self {
            store,
            options: Arc::new(options),
            schema,
            ttl,
            stats: Arc::new(CacheStats::new()),
        }
    }

    pub fn options(&self) -> &CacheOptions {
        &self.options
    }

    pub fn schema(&self) -> &KeySchema {
        &self.schema
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    // == Get ==
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let item = self
            .store
            .get_item(&self.options.table_name, self.schema.resolve(key))
            .await?;

        let value = match item {
            Some(item) => self.live_value(key, &item),
            None => {
                self.stats.record_miss();
                None
            }
        };
        debug!(key, hit = value.is_some(), "cache get");
        Ok(value)
    }

    // == Set ==
    pub async fn set(&self, key: &str, value: &str, ttl: Option<i64>) -> Result<SetOutcome> {
        let expires_at = match self.ttl.compute_expiry(ttl) {
            Expiry::At(expires_at) => expires_at,
            Expiry::DoNotPersist => {
                self.stats.record_skipped_write();
                debug!(key, "cache set skipped: non-positive ttl");
                return Ok(SetOutcome::Skipped);
            }
        };

        let item =
            CacheEntry::new(key, value, Some(expires_at)).to_item(&self.schema, &self.options);
        self.store.put_item(&self.options.table_name, item).await?;

        self.stats.record_write();
        debug!(key, expires_at, "cache set");
        Ok(SetOutcome::Written { expires_at })
    }

    // == Delete ==
    pub async fn delete(&self, key: &str) -> Result<()> {
        self.store
            .delete_item(&self.options.table_name, self.schema.resolve(key))
            .await?;

        self.stats.record_delete();
        debug!(key, "cache delete");
        Ok(())
    }

    // == Get Many ==
    /// Reads many keys with batched store reads, `max_batch_size` keys per call.
    ///
    /// The returned map holds live values only; requested keys absent from it
    /// are misses. Duplicate keys are requested once.
    pub async fn get_many(&self, keys: &[String]) -> Result<HashMap<String, String>> {
        let mut seen = HashSet::with_capacity(keys.len());
        let distinct: Vec<&str> = keys
            .iter()
            .map(String::as_str)
            .filter(|key| seen.insert(*key))
            .collect();
        if distinct.is_empty() {
            return Ok(HashMap::new());
        }

        let reads = distinct
            .chunks(self.options.max_batch_size)
            .map(|chunk| self.batch_read(chunk));
        let found = try_join_all(reads).await?;

        let mut values = HashMap::with_capacity(distinct.len());
        let mut matched = HashSet::with_capacity(distinct.len());
        for item in found.iter().flatten() {
            // Items are matched by key attributes; the store may reorder or omit.
            let Some(key) = self.schema.logical_key(item) else {
                continue;
            };
            if !seen.contains(key) || !matched.insert(key) {
                continue;
            }
            if let Some(value) = self.live_value(key, item) {
                values.insert(key.to_string(), value);
            }
        }

        for _ in matched.len()..distinct.len() {
            self.stats.record_miss();
        }
        debug!(requested = distinct.len(), hits = values.len(), "cache get_many");
        Ok(values)
    }

    async fn batch_read(&self, keys: &[&str]) -> Result<Vec<Item>> {
        let records = keys.iter().map(|key| self.schema.resolve(key)).collect();
        self.stats.record_batch_read();
        Ok(self
            .store
            .batch_get_items(&self.options.table_name, records)
            .await?)
    }

    /// Applies the malformed-record and liveness checks to a stored item.
    fn live_value(&self, key: &str, item: &Item) -> Option<String> {
        let entry = match CacheEntry::from_item(key, item, &self.options) {
            Ok(entry) => entry,
            Err(err) => {
                warn!(key, error = %err, "treating malformed record as a miss");
                self.stats.record_malformed();
                return None;
            }
        };

        if !self.ttl.is_alive_now(entry.expires_at) {
            self.stats.record_expired();
            return None;
        }

        self.stats.record_hit();
        Some(entry.value)
    }
}

#[async_trait]
impl KeyValueCache for DocumentCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        DocumentCache::get(self, key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<i64>) -> Result<SetOutcome> {
        DocumentCache::set(self, key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        DocumentCache::delete(self, key).await
    }
}
