//! Cache Module
//!
//! Key-value caching over a document store: key schema resolution, TTL
//! enforcement, the get/set/delete adapter and the read-coalescing loader.

mod adapter;
mod entry;
mod key;
mod loader;
mod stats;
mod ttl;


// Re-export public types
pub use adapter::{DocumentCache, KeyValueCache, SetOutcome};
pub use entry::{CacheEntry, MalformedRecord};
pub use key::KeySchema;
pub use loader::BatchLoader;
pub use stats::{CacheStats, StatsSnapshot};
pub use ttl::{is_alive, Clock, Expiry, ManualClock, SystemClock, TtlPolicy};
