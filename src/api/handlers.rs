//! API Handlers
//!
//! HTTP request handlers for each cache facade endpoint.

use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::cache::{BatchLoader, DocumentCache};
use crate::error::{CacheError, Result};
use crate::models::{
    validate_key, BatchGetRequest, BatchGetResponse, DeleteResponse, GetResponse, HealthResponse,
    SetRequest, SetResponse, StatsResponse,
};

/// Application state shared across all handlers.
///
/// The adapter is internally synchronised and cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub cache: DocumentCache,
}

impl AppState {
    /// Creates a new AppState around the given adapter.
    pub fn new(cache: DocumentCache) -> Self {
        Self { cache }
    }
}

/// Handler for PUT /set
///
/// Stores a key-value pair with optional TTL. A non-positive TTL is accepted
/// and reported as `cached: false`.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let outcome = state.cache.set(&req.key, &req.value, req.ttl).await?;

    Ok(Json(SetResponse::new(req.key, outcome)))
}

/// Handler for GET /get/:key
///
/// Any miss (absent, expired, malformed) is a 404.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    if let Some(error_msg) = validate_key(&key) {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    match state.cache.get(&key).await? {
        Some(value) => Ok(Json(GetResponse::new(key, value))),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for DELETE /del/:key
///
/// Deleting an absent key succeeds.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    if let Some(error_msg) = validate_key(&key) {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    state.cache.delete(&key).await?;

    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for POST /batch-get
///
/// Resolves all keys through a request-scoped loader, so the store sees one
/// batched read per `max_batch_size` distinct keys.
pub async fn batch_get_handler(
    State(state): State<AppState>,
    Json(req): Json<BatchGetRequest>,
) -> Result<Json<BatchGetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let loader = BatchLoader::new(state.cache.clone());
    let results = loader.load_many(&req.keys).await;

    let values: BTreeMap<String, Option<String>> = req.keys.into_iter().zip(results).collect();
    Ok(Json(BatchGetResponse { values }))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::from(state.cache.stats()))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
