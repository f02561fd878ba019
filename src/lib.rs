//! Dynamo KV Cache - A key-value cache adapter over a document store
//!
//! Stores cache entries as records in a DynamoDB-style table with a
//! per-record expiry attribute, and coalesces reads into batched requests.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod store;

pub use api::AppState;
pub use cache::{BatchLoader, DocumentCache, KeyValueCache, SetOutcome};
pub use config::{CacheOptions, ServerConfig};
pub use error::{CacheError, StoreError};
