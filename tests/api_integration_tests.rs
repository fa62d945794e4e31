//! Integration Tests for the purge endpoint
//!
//! Tests the full request/response cycle through the router, and the
//! server lifecycle over a real socket.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use sentinel_purge::{api::create_router, server, AppState, Config, MemoryStore};
use tokio::sync::oneshot;
use tower::ServiceExt;

// == Helper Functions ==

fn test_config() -> Config {
    Config {
        addr: "127.0.0.1:0".to_string(),
        pattern: "menu:*".to_string(),
        ..Config::default()
    }
}

fn create_test_app(store: Arc<MemoryStore>) -> Router {
    create_router(AppState::new(store, test_config()))
}

async fn body_to_string(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn delete_request() -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/delete")
        .body(Body::empty())
        .unwrap()
}

// == Endpoint Tests ==

#[tokio::test]
async fn test_delete_removes_matching_keys() {
    let store = Arc::new(MemoryStore::with_keys(["menu:k1", "menu:k2", "session:1"]));
    let app = create_test_app(store.clone());

    let response = app.oneshot(delete_request()).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
    assert!(content_type.starts_with("text/plain"));
    assert_eq!(body_to_string(response.into_body()).await, "ok");

    assert!(!store.contains("menu:k1").await);
    assert!(!store.contains("menu:k2").await);
    assert!(store.contains("session:1").await);
}

#[tokio::test]
async fn test_delete_removes_non_utf8_keys() {
    let store = Arc::new(MemoryStore::with_keys(["menu:k1", "session:1"]));
    store.insert(&b"menu:\xff\xfe"[..], "v").await;
    let app = create_test_app(store.clone());

    let response = app.oneshot(delete_request()).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_to_string(response.into_body()).await, "ok");
    assert!(!store.contains(&b"menu:\xff\xfe"[..]).await);
    assert!(!store.contains("menu:k1").await);
    assert_eq!(store.keys().await, vec!["session:1".to_string()]);
}

#[tokio::test]
async fn test_delete_with_no_matches_skips_store_delete() {
    let store = Arc::new(MemoryStore::with_keys(["session:1"]));
    let app = create_test_app(store.clone());

    let response = app.oneshot(delete_request()).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_to_string(response.into_body()).await, "ok");
    assert_eq!(store.list_calls(), 1);
    assert_eq!(store.delete_calls(), 0);
}

#[tokio::test]
async fn test_scan_failure_reported_in_body() {
    let store = Arc::new(MemoryStore::with_keys(["menu:k1"]));
    store.fail_list("EOF").await;
    let app = create_test_app(store.clone());

    let response = app.oneshot(delete_request()).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_to_string(response.into_body()).await, "EOF");
    assert_eq!(store.delete_calls(), 0);
    assert!(store.contains("menu:k1").await);
}

#[tokio::test]
async fn test_delete_failure_reported_in_body() {
    let store = Arc::new(MemoryStore::with_keys(["menu:k1"]));
    store.fail_delete("MISCONF Errors writing to the AOF file").await;
    let app = create_test_app(store.clone());

    let response = app.oneshot(delete_request()).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_to_string(response.into_body()).await,
        "MISCONF Errors writing to the AOF file"
    );
}

#[tokio::test]
async fn test_closed_store_reported_in_body() {
    let store = Arc::new(MemoryStore::with_keys(["menu:k1"]));
    sentinel_purge::KeyStore::close(store.as_ref()).await;
    let app = create_test_app(store);

    let response = app.oneshot(delete_request()).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_to_string(response.into_body()).await, "client is closed");
}

#[tokio::test]
async fn test_concurrent_deletes_over_overlapping_keys() {
    let store = Arc::new(MemoryStore::with_keys(["menu:1", "menu:2", "menu:3", "other"]));
    // both requests list before either deletes
    store.set_latency(Duration::from_millis(50)).await;
    let app = create_test_app(store.clone());

    let (first, second) = tokio::join!(
        app.clone().oneshot(delete_request()),
        app.oneshot(delete_request()),
    );
    let (first, second) = (first.unwrap(), second.unwrap());

    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(body_to_string(first.into_body()).await, "ok");
    assert_eq!(body_to_string(second.into_body()).await, "ok");
    assert_eq!(store.keys().await, vec!["other".to_string()]);
}

// == Lifecycle Tests ==

#[tokio::test]
async fn test_server_serves_then_shuts_down() {
    let store = Arc::new(MemoryStore::with_keys(["menu:1"]));
    let running = server::start(test_config(), store.clone()).await.unwrap();
    let url = format!("http://{}/delete", running.local_addr());

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let lifecycle = tokio::spawn(running.run_until(async {
        let _ = stop_rx.await;
    }));

    let body = reqwest::get(&url).await.unwrap().text().await.unwrap();
    assert_eq!(body, "ok");
    assert!(store.is_empty().await);

    stop_tx.send(()).unwrap();
    lifecycle.await.unwrap().unwrap();
    assert_eq!(store.close_calls(), 1);

    // listener is gone
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(1))
        .build()
        .unwrap();
    assert!(client.get(&url).send().await.is_err());
}

#[tokio::test]
async fn test_shutdown_abandons_slow_requests_after_grace() {
    let store = Arc::new(MemoryStore::with_keys(["menu:1"]));
    store.set_latency(Duration::from_secs(30)).await;
    let running = server::start(test_config(), store.clone())
        .await
        .unwrap()
        .with_grace(Duration::from_millis(200));
    let url = format!("http://{}/delete", running.local_addr());

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let lifecycle = tokio::spawn(running.run_until(async {
        let _ = stop_rx.await;
    }));

    let in_flight = tokio::spawn(async move { reqwest::get(&url).await });
    // let the request reach the handler
    while store.list_calls() == 0 {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let started = Instant::now();
    stop_tx.send(()).unwrap();
    lifecycle.await.unwrap().unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(store.close_calls(), 1);
    assert!(store.contains("menu:1").await);
    in_flight.abort();
}

#[tokio::test]
async fn test_startup_aborts_when_store_unreachable() {
    let store = Arc::new(MemoryStore::new());
    store.fail_ping("all sentinels are unreachable").await;

    let err = server::start(test_config(), store.clone())
        .await
        .err()
        .expect("startup should fail");

    assert!(err.to_string().contains("all sentinels are unreachable"));
    assert_eq!(store.close_calls(), 0);
}
