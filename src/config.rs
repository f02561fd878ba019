//! Configuration Module
//!
//! Handles loading cache and server configuration from environment variables.
//! Both structs are built once at startup and shared read-only afterwards.

use std::env;
use std::str::FromStr;

use crate::cache::KeySchema;

// == Defaults ==
pub const DEFAULT_TABLE_NAME: &str = "KeyValueCache";
pub const DEFAULT_PARTITION_KEY: &str = "CacheKey";
pub const DEFAULT_SORT_KEY_VALUE: &str = "apq";
pub const DEFAULT_VALUE_ATTRIBUTE: &str = "CacheValue";
pub const DEFAULT_TTL_ATTRIBUTE: &str = "CacheTTL";
pub const DEFAULT_TTL: i64 = 300;
/// DynamoDB rejects BatchGetItem requests with more than 100 keys
pub const DEFAULT_MAX_BATCH_SIZE: usize = 100;

/// Cache adapter configuration.
///
/// Attribute names are configurable so that one physical table can host
/// several logical caches (compound-key mode, see [`CacheOptions::with_sort_key`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheOptions {
    /// Backing table name
    pub table_name: String,
    /// Partition key attribute holding the logical cache key
    pub partition_key_name: String,
    /// Sort key attribute; enables compound-key mode when set
    pub sort_key_name: Option<String>,
    /// Fixed sort key value written alongside every partition key
    pub sort_key_value: String,
    /// Attribute holding the cached value
    pub value_attribute: String,
    /// Attribute holding the absolute expiry in epoch seconds
    pub ttl_attribute: String,
    /// TTL in seconds applied when `set` gets no explicit ttl; <= 0 disables writes
    pub default_ttl: i64,
    /// Maximum keys per underlying batched read
    pub max_batch_size: usize,
}

impl CacheOptions {
    /// Creates options by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_TABLE_NAME` - Table name (default: KeyValueCache)
    /// - `CACHE_PARTITION_KEY` - Partition key attribute (default: CacheKey)
    /// - `CACHE_SORT_KEY` - Sort key attribute (default: unset)
    /// - `CACHE_SORT_KEY_VALUE` - Fixed sort key value (default: apq)
    /// - `CACHE_VALUE_ATTRIBUTE` - Value attribute (default: CacheValue)
    /// - `CACHE_TTL_ATTRIBUTE` - Expiry attribute (default: CacheTTL)
    /// - `CACHE_DEFAULT_TTL` - Default TTL in seconds (default: 300)
    /// - `CACHE_MAX_BATCH_SIZE` - Keys per batched read (default: 100)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            table_name: env_string("CACHE_TABLE_NAME").unwrap_or(defaults.table_name),
            partition_key_name: env_string("CACHE_PARTITION_KEY")
                .unwrap_or(defaults.partition_key_name),
            sort_key_name: env_string("CACHE_SORT_KEY"),
            sort_key_value: env_string("CACHE_SORT_KEY_VALUE")
                .unwrap_or(defaults.sort_key_value),
            value_attribute: env_string("CACHE_VALUE_ATTRIBUTE")
                .unwrap_or(defaults.value_attribute),
            ttl_attribute: env_string("CACHE_TTL_ATTRIBUTE").unwrap_or(defaults.ttl_attribute),
            default_ttl: env_parse("CACHE_DEFAULT_TTL").unwrap_or(defaults.default_ttl),
            max_batch_size: env_parse("CACHE_MAX_BATCH_SIZE")
                .unwrap_or(defaults.max_batch_size)
                .max(1),
        }
    }

    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = table_name.into();
        self
    }

    pub fn with_partition_key(mut self, name: impl Into<String>) -> Self {
        self.partition_key_name = name.into();
        self
    }

    /// Switches to compound-key mode: every key record carries `name = value`.
    pub fn with_sort_key(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.sort_key_name = Some(name.into());
        self.sort_key_value = value.into();
        self
    }

    pub fn with_value_attribute(mut self, name: impl Into<String>) -> Self {
        self.value_attribute = name.into();
        self
    }

    pub fn with_ttl_attribute(mut self, name: impl Into<String>) -> Self {
        self.ttl_attribute = name.into();
        self
    }

    pub fn with_default_ttl(mut self, seconds: i64) -> Self {
        self.default_ttl = seconds;
        self
    }

    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size.max(1);
        self
    }

    /// Derives the key schema used to address records.
    pub fn key_schema(&self) -> KeySchema {
        KeySchema::new(
            self.partition_key_name.clone(),
            self.sort_key_name
                .clone()
                .map(|name| (name, self.sort_key_value.clone())),
        )
    }
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            table_name: DEFAULT_TABLE_NAME.to_string(),
            partition_key_name: DEFAULT_PARTITION_KEY.to_string(),
            sort_key_name: None,
            sort_key_value: DEFAULT_SORT_KEY_VALUE.to_string(),
            value_attribute: DEFAULT_VALUE_ATTRIBUTE.to_string(),
            ttl_attribute: DEFAULT_TTL_ATTRIBUTE.to_string(),
            default_ttl: DEFAULT_TTL,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }
}

/// Which backing store the server binary talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Memory,
    DynamoDb,
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Backend::Memory),
            "dynamodb" => Ok(Backend::DynamoDb),
            other => Err(format!("unknown cache backend: {}", other)),
        }
    }
}

/// Server configuration parameters.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP server port
    pub server_port: u16,
    /// Backing store selection
    pub backend: Backend,
    /// Endpoint override, e.g. DynamoDB Local
    pub dynamodb_endpoint: Option<String>,
    pub cache: CacheOptions,
}

impl ServerConfig {
    /// Creates a new ServerConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CACHE_BACKEND` - `memory` or `dynamodb` (default: memory)
    /// - `DYNAMODB_ENDPOINT` - Optional endpoint URL override
    /// - plus everything read by [`CacheOptions::from_env`]
    pub fn from_env() -> Self {
        Self {
            server_port: env_parse("SERVER_PORT").unwrap_or(3000),
            backend: env_parse("CACHE_BACKEND").unwrap_or(Backend::Memory),
            dynamodb_endpoint: env_string("DYNAMODB_ENDPOINT"),
            cache: CacheOptions::from_env(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_port: 3000,
            backend: Backend::Memory,
            dynamodb_endpoint: None,
            cache: CacheOptions::default(),
        }
    }
}

fn env_string(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_default() {
        let options = CacheOptions::default();
        assert_eq!(options.table_name, "KeyValueCache");
        assert_eq!(options.partition_key_name, "CacheKey");
        assert_eq!(options.sort_key_name, None);
        assert_eq!(options.value_attribute, "CacheValue");
        assert_eq!(options.ttl_attribute, "CacheTTL");
        assert_eq!(options.default_ttl, 300);
        assert_eq!(options.max_batch_size, 100);
    }

    #[test]
    fn test_options_overrides() {
        let options = CacheOptions::default()
            .with_table_name("T")
            .with_partition_key("P")
            .with_value_attribute("V")
            .with_ttl_attribute("TTL")
            .with_default_ttl(42);

        assert_eq!(options.table_name, "T");
        assert_eq!(options.partition_key_name, "P");
        assert_eq!(options.value_attribute, "V");
        assert_eq!(options.ttl_attribute, "TTL");
        assert_eq!(options.default_ttl, 42);
    }

    #[test]
    fn test_key_schema_simple_and_compound() {
        let simple = CacheOptions::default().key_schema();
        assert_eq!(simple.partition_attribute(), "CacheKey");
        assert!(simple.sort_key().is_none());

        let compound = CacheOptions::default()
            .with_partition_key("pk")
            .with_sort_key("sk", "apq")
            .key_schema();
        assert_eq!(compound.sort_key(), Some(("sk", "apq")));
    }

    #[test]
    fn test_max_batch_size_is_at_least_one() {
        let options = CacheOptions::default().with_max_batch_size(0);
        assert_eq!(options.max_batch_size, 1);
    }

    #[test]
    fn test_backend_from_str() {
        assert_eq!("memory".parse::<Backend>(), Ok(Backend::Memory));
        assert_eq!("DynamoDB".parse::<Backend>(), Ok(Backend::DynamoDb));
        assert!("redis".parse::<Backend>().is_err());
    }

    #[test]
    fn test_options_from_env_defaults() {
        // Clear any existing env vars to test defaults
        for name in [
            "CACHE_TABLE_NAME",
            "CACHE_PARTITION_KEY",
            "CACHE_SORT_KEY",
            "CACHE_SORT_KEY_VALUE",
            "CACHE_VALUE_ATTRIBUTE",
            "CACHE_TTL_ATTRIBUTE",
            "CACHE_DEFAULT_TTL",
            "CACHE_MAX_BATCH_SIZE",
        ] {
            env::remove_var(name);
        }

        assert_eq!(CacheOptions::from_env(), CacheOptions::default());
    }
}
