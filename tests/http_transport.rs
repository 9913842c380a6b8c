//! Integration tests for the HTTP transport and the fetcher against a mock server

use std::sync::Arc;
use std::time::Duration;

use mockito::{Matcher, Server};
use serde_json::{json, Value};
use warmfetch::{
    EndpointRegistry, FetchOutcome, FetchRequest, Fetcher, HttpTransport, MemoryCache, Method,
    Role, Transport, TransportError,
};

const TIMEOUT: Duration = Duration::from_secs(5);

fn create_fetcher(base_url: String) -> Fetcher {
    let cache = MemoryCache::new(100, Duration::from_secs(1800)).expect("valid capacity");
    let transport = HttpTransport::new(base_url, TIMEOUT).expect("client should build");
    Fetcher::new(
        Role::Server,
        EndpointRegistry::default(),
        Arc::new(cache),
        Arc::new(transport),
    )
}

#[tokio::test]
async fn test_get_returns_json_body_and_sends_json_headers() {
    let mut server = Server::new_async().await;
    let body = json!({"is_success": true, "data": [{"result": []}], "message": null});
    let mock = server
        .mock("GET", "/cars/")
        .match_header("accept", "application/json")
        .match_header("content-type", "application/json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .create_async()
        .await;

    let transport = HttpTransport::new(server.url(), TIMEOUT).unwrap();
    let payload = transport.send(Method::Get, "cars/", None).await.unwrap();

    assert_eq!(payload, body);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_post_sends_json_body() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/cities/")
        .match_body(Matcher::Json(json!({"countries": "China", "limit": 2})))
        .with_status(200)
        .with_body(r#"{"data": ["Beijing", "Shanghai"]}"#)
        .create_async()
        .await;

    let transport = HttpTransport::new(server.url(), TIMEOUT).unwrap();
    let body = json!({"countries": "China", "limit": 2});
    let payload = transport
        .send(Method::Post, "cities/", Some(&body))
        .await
        .unwrap();

    assert_eq!(payload["data"][0], "Beijing");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_error_status_is_transport_error() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("DELETE", "/try_delete/")
        .with_status(500)
        .create_async()
        .await;

    let transport = HttpTransport::new(server.url(), TIMEOUT).unwrap();
    let result = transport.send(Method::Delete, "try_delete/", None).await;

    assert!(matches!(result, Err(TransportError::Status { status: 500, .. })));
}

#[tokio::test]
async fn test_non_json_body_is_passed_through() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("PUT", "/try_put/")
        .with_status(200)
        .with_body("ok")
        .create_async()
        .await;

    let transport = HttpTransport::new(server.url(), TIMEOUT).unwrap();
    let payload = transport
        .send(Method::Put, "try_put/", Some(&json!({"a": 1})))
        .await
        .unwrap();

    assert_eq!(payload, Value::String("ok".to_string()));
}

#[tokio::test]
async fn test_fetcher_caches_across_calls() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/test_cache1/")
        .with_status(200)
        .with_body(r#"{"data": {"randomValue": 0.42}}"#)
        .expect(1)
        .create_async()
        .await;

    let fetcher = create_fetcher(server.url());
    let request = FetchRequest::named("GET_TEST1").allow_cache();

    let first = fetcher.fetch(&request).await;
    let second = fetcher.fetch(&request).await;

    assert!(matches!(first, FetchOutcome::Fetched(_)));
    assert!(second.is_cache_hit());
    assert_eq!(second.payload(), Some(&json!({"data": {"randomValue": 0.42}})));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_fetcher_rebuild_always_calls_remote() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/test_cache1/")
        .with_status(200)
        .with_body(r#"{"data": 1}"#)
        .expect(2)
        .create_async()
        .await;

    let fetcher = create_fetcher(server.url());
    let request = FetchRequest::named("GET_TEST1").allow_cache().rebuild_cache();

    assert!(fetcher.make(&request).await.is_some());
    assert!(fetcher.make(&request).await.is_some());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_fetcher_server_error_is_absent() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/test_cache2/")
        .with_status(503)
        .create_async()
        .await;

    let fetcher = create_fetcher(server.url());
    let request = FetchRequest::named("POST_TEST2")
        .body(json!({"planet1": "mars"}))
        .allow_data_cache();

    assert!(fetcher.make(&request).await.is_none());
}
