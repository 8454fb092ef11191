// Integration tests for `FlagsClient` using wiremock.

use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use etch_api::{Error, FlagUser, FlagsClient, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, FlagsClient) {
    let server = MockServer::start().await;
    let client = FlagsClient::new(
        Url::parse(&server.uri()).unwrap(),
        &SecretString::from("client-test-key"),
        &TransportConfig::default(),
    )
    .unwrap();
    (server, client)
}

fn snapshot_body() -> serde_json::Value {
    json!({
        "feature_gates": {
            "new_checkout": { "value": true, "rule_id": "r1" },
            "legacy_nav": { "value": false }
        },
        "dynamic_configs": {
            "banner": { "value": { "text": "hello", "max": 3 } }
        }
    })
}

// ── Happy path ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_initialize_then_read_gates_and_configs() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/v1/initialize"))
        .and(header("X-Client-Key", "client-test-key"))
        .and(body_partial_json(json!({ "user": { "userID": "u-1" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(snapshot_body()))
        .expect(1)
        .mount(&server)
        .await;

    assert!(!client.is_ready());
    client.initialize(&FlagUser::new("u-1")).await.unwrap();
    assert!(client.is_ready());

    assert!(client.check_gate("new_checkout").unwrap());
    assert!(!client.check_gate("legacy_nav").unwrap());
    assert!(!client.check_gate("unknown").unwrap());

    let banner = client.dynamic_config("banner").unwrap().unwrap();
    assert_eq!(banner.value["text"], "hello");

    assert!(client.dynamic_config("nope").unwrap().is_none());
}

#[tokio::test]
async fn test_environment_tier_is_sent() {
    let server = MockServer::start().await;
    let client = FlagsClient::with_client(
        reqwest::Client::new(),
        Url::parse(&server.uri()).unwrap(),
    )
    .with_environment("production");

    Mock::given(method("POST"))
        .and(path("/v1/initialize"))
        .and(body_partial_json(
            json!({ "environment": { "tier": "production" } }),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(snapshot_body()))
        .expect(1)
        .mount(&server)
        .await;

    client.initialize(&FlagUser::new("u-1")).await.unwrap();
}

// ── Error cases ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_reads_before_initialize_fail() {
    let (_server, client) = setup().await;
    assert!(matches!(
        client.check_gate("new_checkout"),
        Err(Error::NotInitialized)
    ));
    assert!(matches!(
        client.dynamic_config("banner"),
        Err(Error::NotInitialized)
    ));
}

#[tokio::test]
async fn test_unauthorized_maps_to_invalid_client_key() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/v1/initialize"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "message": "invalid client key" })),
        )
        .mount(&server)
        .await;

    let err = client.initialize(&FlagUser::new("u-1")).await.unwrap_err();
    match err {
        Error::InvalidClientKey { message } => assert_eq!(message, "invalid client key"),
        other => panic!("expected InvalidClientKey, got {other:?}"),
    }
    assert!(!client.is_ready());
}

#[tokio::test]
async fn test_rate_limited_carries_retry_after() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/v1/initialize"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "12"))
        .mount(&server)
        .await;

    let err = client.initialize(&FlagUser::new("u-1")).await.unwrap_err();
    assert!(matches!(
        err,
        Error::RateLimited {
            retry_after_secs: Some(12)
        }
    ));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_server_error_is_transient() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/v1/initialize"))
        .respond_with(ResponseTemplate::new(503).set_body_string("service unavailable"))
        .mount(&server)
        .await;

    let err = client.initialize(&FlagUser::new("u-1")).await.unwrap_err();
    match &err {
        Error::Server { status, message } => {
            assert_eq!(*status, 503);
            assert_eq!(message, "service unavailable");
        }
        other => panic!("expected Server, got {other:?}"),
    }
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_error_in_success_body_is_sdk_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/v1/initialize"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "error": "network request failed" })),
        )
        .mount(&server)
        .await;

    let err = client.initialize(&FlagUser::new("u-1")).await.unwrap_err();
    match err {
        Error::Sdk { message } => assert_eq!(message, "network request failed"),
        other => panic!("expected Sdk, got {other:?}"),
    }
    assert!(!client.is_ready());
}

#[tokio::test]
async fn test_malformed_body_is_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/v1/initialize"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = client.initialize(&FlagUser::new("u-1")).await.unwrap_err();
    match err {
        Error::Deserialization { body, .. } => assert_eq!(body, "<html>oops</html>"),
        other => panic!("expected Deserialization, got {other:?}"),
    }
}

// ── Shutdown ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_shutdown_is_idempotent() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/v1/initialize"))
        .respond_with(ResponseTemplate::new(200).set_body_json(snapshot_body()))
        .mount(&server)
        .await;

    client.initialize(&FlagUser::new("u-1")).await.unwrap();
    assert!(client.shutdown());
    assert!(!client.shutdown());
    assert!(matches!(
        client.check_gate("new_checkout"),
        Err(Error::NotInitialized)
    ));
}
