//! TTL Policy Module
//!
//! Computes absolute expiry timestamps and decides record liveness.
//!
//! Document stores with native TTL sweep expired records lazily, so a record
//! can stay readable well past its expiry. Liveness is therefore always
//! decided here, on every read, never by the store.

use std::fmt::Debug;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

// == Clock ==
/// Source of the current time in whole epoch seconds.
pub trait Clock: Send + Sync + Debug {
    fn now_seconds(&self) -> i64;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_seconds(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(now_seconds: i64) -> Self {
        Self {
            now: AtomicI64::new(now_seconds),
        }
    }

    pub fn set(&self, now_seconds: i64) {
        self.now.store(now_seconds, Ordering::SeqCst);
    }

    pub fn advance(&self, seconds: i64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_seconds(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

// == Expiry ==
/// Outcome of the expiry computation for a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// Persist with this absolute expiry (epoch seconds)
    At(i64),
    /// Effective TTL was <= 0: the value must not be written at all
    DoNotPersist,
}

// == TTL Policy ==
#[derive(Debug, Clone)]
pub struct TtlPolicy {
    default_ttl: i64,
    clock: Arc<dyn Clock>,
}

impl TtlPolicy {
    pub fn new(default_ttl: i64, clock: Arc<dyn Clock>) -> Self {
        Self { default_ttl, clock }
    }

    pub fn default_ttl(&self) -> i64 {
        self.default_ttl
    }

    pub fn now_seconds(&self) -> i64 {
        self.clock.now_seconds()
    }

    /// Computes the expiry for a write with an optional TTL override.
    ///
    /// An explicit `ttl` always wins over the configured default, including
    /// an explicit `0` or negative value.
    pub fn compute_expiry(&self, ttl: Option<i64>) -> Expiry {
        let ttl = ttl.unwrap_or(self.default_ttl);
        if ttl <= 0 {
            return Expiry::DoNotPersist;
        }
        Expiry::At(self.now_seconds().saturating_add(ttl))
    }

    /// Liveness against the policy's clock.
    pub fn is_alive_now(&self, stored_expiry: Option<i64>) -> bool {
        is_alive(stored_expiry, self.now_seconds())
    }
}

/// A record without expiry never expires; otherwise it is alive up to and
/// including its expiry second.
pub fn is_alive(stored_expiry: Option<i64>, now_seconds: i64) -> bool {
    match stored_expiry {
        Some(expiry) => expiry >= now_seconds,
        None => true,
    }
}
