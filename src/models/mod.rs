//! Request and Response models for the cache HTTP facade
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{validate_key, BatchGetRequest, SetRequest, MAX_BATCH_GET_KEYS, MAX_KEY_BYTES};
pub use responses::{
    BatchGetResponse, DeleteResponse, GetResponse, HealthResponse, SetResponse, StatsResponse,
};
