//! DynamoDB Document Store
//!
//! Maps the point operations onto GetItem / PutItem / DeleteItem and the
//! batched read onto BatchGetItem.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::{AttributeValue as DynamoValue, KeysAndAttributes};
use aws_sdk_dynamodb::Client;
use tracing::{debug, warn};

use super::{AttributeValue, DocumentStore, Item, KeyRecord};
use crate::error::StoreError;

/// Document store backed by an AWS DynamoDB client.
#[derive(Debug, Clone)]
pub struct DynamoDbStore {
    client: Client,
}

impl DynamoDbStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a client from the default AWS credential and region chain.
    ///
    /// `endpoint` overrides the service URL, e.g. `http://localhost:8000`
    /// for DynamoDB Local.
    pub async fn from_env(endpoint: Option<&str>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(url) = endpoint {
            loader = loader.endpoint_url(url);
        }
        let config = loader.load().await;
        Self::new(Client::new(&config))
    }
}

fn to_dynamo(
    operation: &'static str,
    record: HashMap<String, AttributeValue>,
) -> Result<HashMap<String, DynamoValue>, StoreError> {
    record
        .into_iter()
        .map(|(name, value)| {
            let value = match value {
                AttributeValue::S(s) => DynamoValue::S(s),
                AttributeValue::N(n) => DynamoValue::N(n.to_string()),
                AttributeValue::Other(kind) => {
                    return Err(StoreError::backend(
                        operation,
                        format!("attribute {} of type {} cannot be sent", name, kind),
                    ))
                }
            };
            Ok((name, value))
        })
        .collect()
}

/// Converts a DynamoDB item attribute by attribute.
///
/// Fractional numbers are floored, so an expiry written by another client
/// as `1550664300.5` still reads as whole epoch seconds. Other types and
/// numbers outside `i64` come through as [`AttributeValue::Other`].
fn from_dynamo(item: &HashMap<String, DynamoValue>) -> Item {
    item.iter()
        .map(|(name, value)| {
            let value = match value {
                DynamoValue::S(s) => AttributeValue::S(s.clone()),
                DynamoValue::N(n) => match parse_number(n) {
                    Some(n) => AttributeValue::N(n),
                    None => {
                        debug!(attribute = %name, raw = %n, "number out of range");
                        AttributeValue::Other("N".to_string())
                    }
                },
                other => AttributeValue::Other(type_tag(other).to_string()),
            };
            (name.clone(), value)
        })
        .collect()
}

fn type_tag(value: &DynamoValue) -> &'static str {
    match value {
        DynamoValue::B(_) => "B",
        DynamoValue::Bool(_) => "BOOL",
        DynamoValue::Bs(_) => "BS",
        DynamoValue::L(_) => "L",
        DynamoValue::M(_) => "M",
        DynamoValue::N(_) => "N",
        DynamoValue::Ns(_) => "NS",
        DynamoValue::Null(_) => "NULL",
        DynamoValue::S(_) => "S",
        DynamoValue::Ss(_) => "SS",
        _ => "UNKNOWN",
    }
}

fn parse_number(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .map(f64::floor)
            .filter(|f| f.is_finite() && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
            .map(|f| f as i64)
    })
}

fn backend_error<E>(operation: &'static str, err: E) -> StoreError
where
    E: std::error::Error,
{
    StoreError::backend(operation, DisplayErrorContext(err).to_string())
}

#[async_trait]
impl DocumentStore for DynamoDbStore {
    async fn get_item(&self, table: &str, key: KeyRecord) -> Result<Option<Item>, StoreError> {
        let output = self
            .client
            .get_item()
            .table_name(table)
            .set_key(Some(to_dynamo("GetItem", key)?))
            .send()
            .await
            .map_err(|e| backend_error("GetItem", e))?;

        Ok(output.item().map(from_dynamo))
    }

    async fn put_item(&self, table: &str, item: Item) -> Result<(), StoreError> {
        self.client
            .put_item()
            .table_name(table)
            .set_item(Some(to_dynamo("PutItem", item)?))
            .send()
            .await
            .map_err(|e| backend_error("PutItem", e))?;
        Ok(())
    }

    async fn delete_item(&self, table: &str, key: KeyRecord) -> Result<(), StoreError> {
        self.client
            .delete_item()
            .table_name(table)
            .set_key(Some(to_dynamo("DeleteItem", key)?))
            .send()
            .await
            .map_err(|e| backend_error("DeleteItem", e))?;
        Ok(())
    }

    async fn batch_get_items(
        &self,
        table: &str,
        keys: Vec<KeyRecord>,
    ) -> Result<Vec<Item>, StoreError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let requested = keys.len();
        let keys = keys
            .into_iter()
            .map(|key| to_dynamo("BatchGetItem", key))
            .collect::<Result<Vec<_>, _>>()?;
        let request = KeysAndAttributes::builder()
            .set_keys(Some(keys))
            .build()
            .map_err(|e| backend_error("BatchGetItem", e))?;

        let output = self
            .client
            .batch_get_item()
            .request_items(table, request)
            .send()
            .await
            .map_err(|e| backend_error("BatchGetItem", e))?;

        // Unprocessed keys are not retried; the caller sees them as misses.
        if output
            .unprocessed_keys()
            .is_some_and(|unprocessed| unprocessed.contains_key(table))
        {
            warn!(table, requested, "batch read left unprocessed keys");
        }

        let found: Vec<Item> = output
            .responses()
            .and_then(|responses| responses.get(table))
            .map(|items| items.iter().map(from_dynamo).collect())
            .unwrap_or_default();

        debug!(table, requested, found = found.len(), "batch read");
        Ok(found)
    }
}
