//! Batch Loader Module
//!
//! Coalesces concurrent point reads into batched store reads.
//!
//! Every `load` issued before the current task yields joins one window. The
//! window closes when a dispatcher task, spawned by the window's first
//! `load`, gets scheduled, or as soon as `max_batch_size` distinct keys are
//! pending. On a multi-threaded runtime that task may run before sibling
//! `load`s are polled, so separate `load` calls coalesce on a best-effort
//! basis there. `load_many` queues all of its keys under one lock and always
//! costs one batched read per `max_batch_size` distinct keys.
//!
//! Results are memoised per loader, so a loader is meant to live for one unit
//! of work (e.g. one request) rather than for the whole process.
//!
//! # Ordering hazard
//!
//! Keys are buffered before dispatch. A `load(key)` racing a `set(key)` or
//! `delete(key)` without the caller ordering them (awaiting one before
//! issuing the other) may observe either the old or the new state.

use std::collections::HashMap;
use std::fmt;
use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use futures::future::{join_all, ready, BoxFuture, Shared};
use futures::FutureExt;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::cache::{DocumentCache, KeyValueCache, SetOutcome};
use crate::error::Result;

type LoadResult = Shared<BoxFuture<'static, Option<String>>>;

struct Memo {
    /// Distinguishes successive loads of the same key
    id: u64,
    result: LoadResult,
}

struct Pending {
    key: String,
    id: u64,
    tx: oneshot::Sender<Option<String>>,
}

#[derive(Default)]
struct LoaderState {
    memo: HashMap<String, Memo>,
    /// Current window, in arrival order
    pending: Vec<Pending>,
    /// A dispatcher task is scheduled for the current window
    window_open: bool,
    next_id: u64,
}

struct LoaderInner {
    cache: DocumentCache,
    max_batch_size: usize,
    state: Mutex<LoaderState>,
}

// == Batch Loader ==
/// Read-coalescing front for a [`DocumentCache`]. Clones share one window
/// and one memo. Must be used from within a tokio runtime.
#[derive(Clone)]
pub struct BatchLoader {
    inner: Arc<LoaderInner>,
}

impl BatchLoader {
    // == Constructor ==
    /// Creates a loader batching up to the cache's `max_batch_size` keys per read.
    pub fn new(cache: DocumentCache) -> Self {
        let max_batch_size = cache.options().max_batch_size;
        Self::with_max_batch_size(cache, max_batch_size)
    }

    pub fn with_max_batch_size(cache: DocumentCache, max_batch_size: usize) -> Self {
        Self {
            inner: Arc::new(LoaderInner {
                cache,
                max_batch_size: max_batch_size.max(1),
                state: Mutex::new(LoaderState::default()),
            }),
        }
    }

    pub fn cache(&self) -> &DocumentCache {
        &self.inner.cache
    }

    // == Load ==
    /// Resolves `key` through the next batched read, or from the memo.
    ///
    /// A failed batched read resolves as a miss.
    pub async fn load(&self, key: &str) -> Option<String> {
        let Some(result) = self.inner.enqueue([key]).pop() else {
            return None;
        };
        result.await
    }

    /// Loads all `keys` in the same window; results follow input order.
    pub async fn load_many(&self, keys: &[String]) -> Vec<Option<String>> {
        let results = self.inner.enqueue(keys.iter().map(String::as_str));
        join_all(results).await
    }

    // == Set ==
    /// Writes through the cache, then primes the memo with `value`.
    ///
    /// When the write is skipped (effective TTL <= 0) the memo is cleared
    /// instead, so the loader never serves a value the cache refused to keep.
    pub async fn set(&self, key: &str, value: &str, ttl: Option<i64>) -> Result<SetOutcome> {
        let outcome = match self.inner.cache.set(key, value, ttl).await {
            Ok(outcome) => outcome,
            Err(err) => {
                // The write may still land server-side; drop what we knew.
                self.clear(key);
                return Err(err);
            }
        };

        let mut state = self.inner.state();
        state.memo.remove(key);
        if let SetOutcome::Written { .. } = outcome {
            let memo = state.ready(Some(value.to_string()));
            state.memo.insert(key.to_string(), memo);
        }
        Ok(outcome)
    }

    // == Delete ==
    /// Deletes through the cache and clears the memo without priming.
    pub async fn delete(&self, key: &str) -> Result<()> {
        let result = self.inner.cache.delete(key).await;
        self.clear(key);
        result
    }

    /// Primes the memo for `key` unless it already holds a result.
    pub fn prime(&self, key: &str, value: Option<String>) {
        let mut state = self.inner.state();
        if !state.memo.contains_key(key) {
            let memo = state.ready(value);
            state.memo.insert(key.to_string(), memo);
        }
    }

    /// Forgets the memoised result for `key`.
    pub fn clear(&self, key: &str) {
        self.inner.state().memo.remove(key);
    }

    /// Forgets every memoised result.
    pub fn clear_all(&self) {
        self.inner.state().memo.clear();
    }
}

impl LoaderState {
    fn ready(&mut self, value: Option<String>) -> Memo {
        let id = self.next_id;
        self.next_id += 1;
        Memo {
            id,
            result: ready(value).boxed().shared(),
        }
    }
}

impl LoaderInner {
    fn state(&self) -> MutexGuard<'_, LoaderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues every key not already memoised, under one lock, and returns
    /// one result per key in input order.
    fn enqueue<'a, I>(self: &Arc<Self>, keys: I) -> Vec<LoadResult>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut state = self.state();
        let mut results = Vec::new();
        let mut full = Vec::new();

        for key in keys {
            if let Some(memo) = state.memo.get(key) {
                results.push(memo.result.clone());
                continue;
            }

            let (tx, rx) = oneshot::channel();
            let id = state.next_id;
            state.next_id += 1;

            let result = rx.map(|sent| sent.unwrap_or(None)).boxed().shared();
            state.memo.insert(
                key.to_string(),
                Memo {
                    id,
                    result: result.clone(),
                },
            );
            state.pending.push(Pending {
                key: key.to_string(),
                id,
                tx,
            });
            results.push(result);

            if state.pending.len() >= self.max_batch_size {
                full.push(mem::take(&mut state.pending));
            }
        }

        let open_window = !state.pending.is_empty() && !state.window_open;
        if open_window {
            state.window_open = true;
        }
        drop(state);

        for batch in full {
            let inner = Arc::clone(self);
            tokio::spawn(async move { inner.dispatch(batch).await });
        }

        if open_window {
            let inner = Arc::clone(self);
            tokio::spawn(async move {
                // Let the enqueuing task finish its synchronous work first.
                tokio::task::yield_now().await;
                let batch = {
                    let mut state = inner.state();
                    state.window_open = false;
                    mem::take(&mut state.pending)
                };
                inner.dispatch(batch).await;
            });
        }

        results
    }

    async fn dispatch(&self, batch: Vec<Pending>) {
        if batch.is_empty() {
            return;
        }

        let keys: Vec<String> = batch.iter().map(|p| p.key.clone()).collect();
        debug!(keys = keys.len(), "dispatching batched read");

        match self.cache.get_many(&keys).await {
            Ok(values) => {
                for pending in batch {
                    let _ = pending.tx.send(values.get(&pending.key).cloned());
                }
            }
            Err(err) => {
                warn!(keys = keys.len(), error = %err, "batched read failed, resolving as misses");
                let mut state = self.state();
                for pending in batch {
                    // Only forget this load's memo, not a newer prime or load.
                    if state
                        .memo
                        .get(&pending.key)
                        .is_some_and(|memo| memo.id == pending.id)
                    {
                        state.memo.remove(&pending.key);
                    }
                    let _ = pending.tx.send(None);
                }
            }
        }
    }
}

impl fmt::Debug for BatchLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state();
        f.debug_struct("BatchLoader")
            .field("max_batch_size", &self.inner.max_batch_size)
            .field("memoised", &state.memo.len())
            .field("pending", &state.pending.len())
            .finish()
    }
}

#[async_trait]
impl KeyValueCache for BatchLoader {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load(key).await)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<i64>) -> Result<SetOutcome> {
        BatchLoader::set(self, key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        BatchLoader::delete(self, key).await
    }
}
