//! Request DTOs for the cache HTTP facade
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

/// Maximum keys accepted by one batch-get request
pub const MAX_BATCH_GET_KEYS: usize = 1000;

/// DynamoDB's limit on a partition key value, in bytes
pub const MAX_KEY_BYTES: usize = 2048;

/// Checks a single cache key; shared by every endpoint taking a key.
pub fn validate_key(key: &str) -> Option<String> {
    if key.is_empty() {
        return Some("Key cannot be empty".to_string());
    }
    if key.len() > MAX_KEY_BYTES {
        return Some(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_BYTES
        ));
    }
    None
}

/// Request body for the SET operation (PUT /set)
///
/// # Fields
/// - `key`: The cache key to store the value under
/// - `value`: The value to store
/// - `ttl`: Optional TTL in seconds; `0` or negative means "do not cache"
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The cache key
    pub key: String,
    /// The value to store
    pub value: String,
    /// Optional TTL in seconds
    #[serde(default)]
    pub ttl: Option<i64>,
}

impl SetRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        validate_key(&self.key)
    }
}

/// Request body for POST /batch-get
#[derive(Debug, Clone, Deserialize)]
pub struct BatchGetRequest {
    pub keys: Vec<String>,
}

impl BatchGetRequest {
    pub fn validate(&self) -> Option<String> {
        if self.keys.len() > MAX_BATCH_GET_KEYS {
            return Some(format!(
                "At most {} keys per request, got {}",
                MAX_BATCH_GET_KEYS,
                self.keys.len()
            ));
        }
        self.keys.iter().find_map(|key| validate_key(key))
    }
}
