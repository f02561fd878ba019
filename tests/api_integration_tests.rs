//! Integration Tests for the cache adapter and its HTTP facade
//!
//! Tests the full request/response cycle for each endpoint, plus adapter
//! and loader behaviour observed through the recording in-memory store.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use dynamo_kv_cache::{
    api::create_router,
    cache::{BatchLoader, DocumentCache, ManualClock, SetOutcome},
    config::CacheOptions,
    store::{AttributeValue, KeyRecord, MemoryStore, StoreCall},
    AppState,
};
use serde_json::Value;
use tower::ServiceExt;

const T0: i64 = 1_550_664_000;

// == Helper Functions ==

fn memory_store(options: &CacheOptions) -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new().with_table(
        &options.table_name,
        &options.partition_key_name,
        options.sort_key_name.as_deref(),
    ))
}

fn create_test_app() -> Router {
    let options = CacheOptions::default();
    let cache = DocumentCache::new(memory_store(&options), options);
    create_router(AppState::new(cache))
}

fn clocked_cache(options: CacheOptions) -> (DocumentCache, Arc<MemoryStore>, Arc<ManualClock>) {
    let store = memory_store(&options);
    let clock = Arc::new(ManualClock::new(T0));
    let cache = DocumentCache::with_clock(store.clone(), options, clock.clone());
    (cache, store, clock)
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn put_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

// == SET Endpoint Tests ==

#[tokio::test]
async fn test_set_endpoint_success() {
    let app = create_test_app();

    let response = app
        .oneshot(put_json("/set", r#"{"key":"test_key","value":"test_value"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert!(json["message"].as_str().unwrap().contains("test_key"));
    assert_eq!(json["cached"], true);
    assert!(json["expires_at"].as_i64().is_some());
}

#[tokio::test]
async fn test_set_endpoint_zero_ttl_not_cached() {
    let app = create_test_app();

    let response = app
        .clone()
        .oneshot(put_json("/set", r#"{"key":"x","value":"y","ttl":0}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["cached"], false);

    let get_response = app.oneshot(empty("GET", "/get/x")).await.unwrap();
    assert_eq!(get_response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_set_endpoint_empty_key_rejected() {
    let app = create_test_app();

    let response = app
        .oneshot(put_json("/set", r#"{"key":"","value":"v"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert!(json.get("error").is_some());
}

// == GET Endpoint Tests ==

#[tokio::test]
async fn test_get_endpoint_success() {
    let app = create_test_app();

    let set_response = app
        .clone()
        .oneshot(put_json("/set", r#"{"key":"get_key","value":"get_value"}"#))
        .await
        .unwrap();
    assert_eq!(set_response.status(), StatusCode::OK);

    let get_response = app.oneshot(empty("GET", "/get/get_key")).await.unwrap();

    assert_eq!(get_response.status(), StatusCode::OK);
    let json = body_to_json(get_response.into_body()).await;
    assert_eq!(json["key"].as_str().unwrap(), "get_key");
    assert_eq!(json["value"].as_str().unwrap(), "get_value");
}

#[tokio::test]
async fn test_get_endpoint_not_found() {
    let app = create_test_app();

    let response = app
        .oneshot(empty("GET", "/get/nonexistent_key"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_get_endpoint_store_failure() {
    let options = CacheOptions::default();
    let store = memory_store(&options);
    let app = create_router(AppState::new(DocumentCache::new(store.clone(), options)));

    store.fail_next("GetItem");
    let response = app.oneshot(empty("GET", "/get/k")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

// == DELETE Endpoint Tests ==

#[tokio::test]
async fn test_delete_endpoint_success() {
    let app = create_test_app();

    app.clone()
        .oneshot(put_json("/set", r#"{"key":"delete_key","value":"delete_value"}"#))
        .await
        .unwrap();

    let del_response = app
        .clone()
        .oneshot(empty("DELETE", "/del/delete_key"))
        .await
        .unwrap();
    assert_eq!(del_response.status(), StatusCode::OK);

    let get_response = app.oneshot(empty("GET", "/get/delete_key")).await.unwrap();
    assert_eq!(get_response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_endpoint_absent_key_succeeds() {
    let app = create_test_app();

    let response = app
        .oneshot(empty("DELETE", "/del/nonexistent_key"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

// == BATCH-GET Endpoint Tests ==

#[tokio::test]
async fn test_batch_get_endpoint() {
    let app = create_test_app();

    for body in [r#"{"key":"a","value":"1"}"#, r#"{"key":"c","value":"3"}"#] {
        app.clone().oneshot(put_json("/set", body)).await.unwrap();
    }

    let response = app
        .oneshot(post_json("/batch-get", r#"{"keys":["a","b","c","a"]}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["values"]["a"], "1");
    assert!(json["values"]["b"].is_null());
    assert_eq!(json["values"]["c"], "3");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_batch_get_endpoint_one_store_read_per_request() {
    let options = CacheOptions::default();
    let cache = DocumentCache::new(memory_store(&options), options);
    let app = create_router(AppState::new(cache.clone()));

    let keys: Vec<String> = (0..90).map(|i| format!("key-{}", i)).collect();
    let body = serde_json::json!({ "keys": keys }).to_string();

    for round in 1..=10 {
        let response = app
            .clone()
            .oneshot(post_json("/batch-get", &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(cache.stats().batch_reads, round);
    }
}

#[tokio::test]
async fn test_set_endpoint_oversize_key_rejected() {
    let app = create_test_app();
    let body = serde_json::json!({ "key": "k".repeat(2049), "value": "v" }).to_string();

    let response = app.oneshot(put_json("/set", &body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_batch_get_endpoint_rejects_empty_key() {
    let app = create_test_app();

    let response = app
        .oneshot(post_json("/batch-get", r#"{"keys":["a",""]}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// == STATS / HEALTH Endpoint Tests ==

#[tokio::test]
async fn test_stats_endpoint_counts() {
    let app = create_test_app();

    app.clone()
        .oneshot(put_json("/set", r#"{"key":"s","value":"v"}"#))
        .await
        .unwrap();
    app.clone().oneshot(empty("GET", "/get/s")).await.unwrap();
    app.clone().oneshot(empty("GET", "/get/missing")).await.unwrap();

    let response = app.oneshot(empty("GET", "/stats")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["hits"], 1);
    assert_eq!(json["misses"], 1);
    assert_eq!(json["writes"], 1);
    assert!((json["hit_rate"].as_f64().unwrap() - 0.5).abs() < 0.001);
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app();

    let response = app.oneshot(empty("GET", "/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "healthy");
}

// == Adapter Scenarios ==

#[tokio::test]
async fn test_default_ttl_expiry_boundary() {
    let (cache, store, clock) = clocked_cache(CacheOptions::default());

    let outcome = cache.set("hello", "world", None).await.unwrap();
    assert_eq!(outcome, SetOutcome::Written { expires_at: T0 + 300 });

    let key: KeyRecord = [("CacheKey".to_string(), AttributeValue::from("hello"))].into();
    let stored = store.peek("KeyValueCache", &key).await.unwrap();
    assert_eq!(stored.get("CacheTTL"), Some(&AttributeValue::N(T0 + 300)));

    clock.set(T0 + 299);
    assert_eq!(cache.get("hello").await.unwrap(), Some("world".to_string()));

    clock.set(T0 + 300);
    assert_eq!(cache.get("hello").await.unwrap(), Some("world".to_string()));

    clock.set(T0 + 301);
    assert_eq!(cache.get("hello").await.unwrap(), None);
}

#[tokio::test]
async fn test_zero_ttl_makes_no_store_call() {
    let (cache, store, _) = clocked_cache(CacheOptions::default());

    let outcome = cache.set("x", "y", Some(0)).await.unwrap();

    assert_eq!(outcome, SetOutcome::Skipped);
    assert!(store.calls().is_empty());
    assert_eq!(cache.get("x").await.unwrap(), None);
}

#[tokio::test]
async fn test_compound_key_read() {
    let options = CacheOptions::default()
        .with_partition_key("pk")
        .with_sort_key("sk", "apq");
    let (cache, store, _) = clocked_cache(options);

    assert_eq!(cache.get("hello").await.unwrap(), None);

    let expected: KeyRecord = [
        ("pk".to_string(), AttributeValue::from("hello")),
        ("sk".to_string(), AttributeValue::from("apq")),
    ]
    .into();
    assert_eq!(
        store.calls(),
        vec![StoreCall::GetItem {
            table: "KeyValueCache".to_string(),
            key: expected,
        }]
    );
}

#[tokio::test]
async fn test_loader_coalesces_and_maps_by_key() {
    let (cache, store, _) = clocked_cache(CacheOptions::default());
    cache.set("a", "valA", None).await.unwrap();
    cache.set("c", "valC", None).await.unwrap();
    store.reset_calls();

    let loader = BatchLoader::new(cache);
    let (a, b, c) = tokio::join!(loader.load("a"), loader.load("b"), loader.load("c"));

    assert_eq!(a, Some("valA".to_string()));
    assert_eq!(b, None);
    assert_eq!(c, Some("valC".to_string()));

    let calls = store.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].operation(), "BatchGetItem");
}

#[tokio::test]
async fn test_loader_set_then_load_skips_store() {
    let (cache, store, _) = clocked_cache(CacheOptions::default());
    let loader = BatchLoader::new(cache);

    loader.set("k", "v", None).await.unwrap();
    store.reset_calls();

    assert_eq!(loader.load("k").await, Some("v".to_string()));
    assert!(store.calls().is_empty());
}

// == End-to-end over TCP ==

#[tokio::test]
async fn test_server_round_trip_over_http() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = create_test_app();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = reqwest::Client::new();
    let base = format!("http://{}", addr);

    let set = client
        .put(format!("{}/set", base))
        .json(&serde_json::json!({"key": "remote", "value": "ok", "ttl": 60}))
        .send()
        .await
        .unwrap();
    assert_eq!(set.status(), reqwest::StatusCode::OK);

    let get: Value = client
        .get(format!("{}/get/remote", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(get["value"], "ok");

    let missing = client
        .get(format!("{}/get/absent", base))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);
}
