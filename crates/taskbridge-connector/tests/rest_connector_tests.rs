//! Integration tests for the REST connector using wiremock.
//!
//! These tests verify the connector against a mock HTTP server, covering
//! the import/export routes, bearer authentication, and the mapping of
//! error statuses to connector error variants.

use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use taskbridge_connector::{ConnectorError, ExternalItem, PmConnector, RestConfig, RestPmConnector};
use taskbridge_core::Provider;

fn connector(base_url: &str) -> RestPmConnector {
    RestPmConnector::new(RestConfig {
        provider: Provider::Jira,
        endpoint: base_url.trim_end_matches('/').to_string(),
        api_key: "test-token-123".to_string(),
        connect_timeout_secs: 5,
        read_timeout_secs: 5,
    })
    .unwrap()
}

#[tokio::test]
async fn test_fetch_items_sends_bearer_and_resource() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/pm/import"))
        .and(query_param("resource", "issues"))
        .and(header("Authorization", "Bearer test-token-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                { "id": "EXT-1", "fields": { "summary": "Fix login" } },
                { "id": "EXT-2" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let items = connector(&server.uri()).fetch_items("issues").await.unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].id, "EXT-1");
    assert_eq!(items[0].fields.get("summary"), Some(&json!("Fix login")));
    assert!(items[1].fields.is_empty());
}

#[tokio::test]
async fn test_export_items_posts_batch_with_bearer() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/pm/export"))
        .and(header("Authorization", "Bearer test-token-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "count": 2 })))
        .expect(1)
        .mount(&server)
        .await;

    let items = vec![
        ExternalItem::new("EXT-1", serde_json::Map::new()),
        ExternalItem::new("EXT-2", serde_json::Map::new()),
    ];
    let count = connector(&server.uri())
        .export_items("issues", items)
        .await
        .unwrap();
    assert_eq!(count, 2);
}

#[tokio::test]
async fn test_unauthorized_maps_to_authentication_failed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/pm/import"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&server)
        .await;

    let err = connector(&server.uri())
        .fetch_items("issues")
        .await
        .unwrap_err();
    assert!(matches!(err, ConnectorError::AuthenticationFailed));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_forbidden_maps_to_authentication_failed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/pm/export"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden"))
        .mount(&server)
        .await;

    let err = connector(&server.uri())
        .export_items("issues", Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ConnectorError::AuthenticationFailed));
}

#[tokio::test]
async fn test_rate_limit_carries_retry_after() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/pm/import"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("Retry-After", "30")
                .set_body_string("slow down"),
        )
        .mount(&server)
        .await;

    let err = connector(&server.uri())
        .fetch_items("issues")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ConnectorError::RateLimited {
            retry_after_secs: Some(30)
        }
    ));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_rate_limit_without_retry_after_header() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/pm/import"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let err = connector(&server.uri())
        .fetch_items("issues")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ConnectorError::RateLimited {
            retry_after_secs: None
        }
    ));
}

#[tokio::test]
async fn test_server_error_maps_to_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/pm/import"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&server)
        .await;

    let err = connector(&server.uri())
        .fetch_items("issues")
        .await
        .unwrap_err();
    match err {
        ConnectorError::ApiError { status, ref message } => {
            assert_eq!(status, 500);
            assert!(message.contains("Internal Server Error"));
        }
        other => panic!("expected ApiError, got {other:?}"),
    }
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_malformed_body_maps_to_invalid_response() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/pm/import"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = connector(&server.uri())
        .fetch_items("issues")
        .await
        .unwrap_err();
    assert!(matches!(err, ConnectorError::InvalidResponse { .. }));
}

#[tokio::test]
async fn test_connection_success() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/pm/import"))
        .and(header("Authorization", "Bearer test-token-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .mount(&server)
        .await;

    assert!(connector(&server.uri()).test_connection().await.is_ok());
}
