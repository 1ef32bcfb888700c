//! Authorization validator against a mock publisher manifest server.

mod common;

use adscout::AuthorizationValidator;
use common::{conformant_manifest, manifest_mock, server_domain, test_config};
use serde_json::json;

#[tokio::test]
async fn authorizes_listed_agent_with_trailing_slash_difference() {
    let mut server = mockito::Server::new_async().await;
    let _mock = manifest_mock(&mut server, &conformant_manifest(&["https://sales.example.com"])).await;

    let validator = AuthorizationValidator::new(test_config()).unwrap();
    let result = validator
        .validate(&server_domain(&server), "https://sales.example.com/")
        .await;

    assert!(result.authorized);
    assert!(result.error.is_none());
}

#[tokio::test]
async fn rejects_agent_not_listed() {
    let mut server = mockito::Server::new_async().await;
    let _mock = manifest_mock(&mut server, &conformant_manifest(&["https://sales.example.com"])).await;

    let validator = AuthorizationValidator::new(test_config()).unwrap();
    let result = validator
        .validate(&server_domain(&server), "https://intruder.example.com")
        .await;

    assert!(!result.authorized);
    assert!(result.error.is_none());
}

#[tokio::test]
async fn tolerates_deprecated_flat_string_manifest() {
    let mut server = mockito::Server::new_async().await;
    let _mock = manifest_mock(
        &mut server,
        &json!({"authorized_agents": ["https://sales.example.com"]}),
    )
    .await;

    let validator = AuthorizationValidator::new(test_config()).unwrap();
    let result = validator
        .validate(&server_domain(&server), "https://sales.example.com")
        .await;

    assert!(result.authorized);
}

#[tokio::test]
async fn missing_manifest_reports_http_status() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/.well-known/adagents.json")
        .with_status(404)
        .create_async()
        .await;

    let validator = AuthorizationValidator::new(test_config()).unwrap();
    let result = validator
        .validate(&server_domain(&server), "https://sales.example.com")
        .await;

    assert!(!result.authorized);
    assert!(result.error.as_deref().unwrap().contains("404"));
}

#[tokio::test]
async fn server_error_reports_http_status() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/.well-known/adagents.json")
        .with_status(503)
        .create_async()
        .await;

    let validator = AuthorizationValidator::new(test_config()).unwrap();
    let result = validator
        .validate(&server_domain(&server), "https://sales.example.com")
        .await;

    assert!(!result.authorized);
    assert_eq!(result.error.as_deref(), Some("HTTP 503"));
}

#[tokio::test]
async fn wrong_content_type_is_rejected() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/.well-known/adagents.json")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body("<html>not a manifest</html>")
        .create_async()
        .await;

    let validator = AuthorizationValidator::new(test_config()).unwrap();
    let result = validator
        .validate(&server_domain(&server), "https://sales.example.com")
        .await;

    assert!(!result.authorized);
    assert!(result.error.as_deref().unwrap().contains("content type"));
}

#[tokio::test]
async fn invalid_manifest_shape_is_rejected() {
    let mut server = mockito::Server::new_async().await;
    let _mock = manifest_mock(&mut server, &json!({"authorized_agents": 42})).await;

    let validator = AuthorizationValidator::new(test_config()).unwrap();
    let result = validator
        .validate(&server_domain(&server), "https://sales.example.com")
        .await;

    assert!(!result.authorized);
    assert!(result
        .error
        .as_deref()
        .unwrap()
        .contains("authorized_agents"));
}

#[tokio::test]
async fn network_failure_becomes_error_result() {
    // Bring a server up to learn its address, then take it down.
    let server = mockito::Server::new_async().await;
    let domain = server_domain(&server);
    drop(server);

    let validator = AuthorizationValidator::new(test_config()).unwrap();
    let result = validator.validate(&domain, "https://sales.example.com").await;

    assert!(!result.authorized);
    assert!(result.error.is_some());
}

#[tokio::test]
async fn repeated_validation_is_served_from_cache() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/.well-known/adagents.json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(conformant_manifest(&["https://sales.example.com"]).to_string())
        .expect(1)
        .create_async()
        .await;

    let validator = AuthorizationValidator::new(test_config()).unwrap();
    let domain = server_domain(&server);

    let first = validator.validate(&domain, "https://sales.example.com").await;
    let second = validator.validate(&domain, "https://sales.example.com").await;

    assert!(first.authorized);
    assert!(second.authorized);
    assert_eq!(first.checked_at, second.checked_at);
    mock.assert_async().await;
}

#[tokio::test]
async fn clearing_the_cache_forces_a_refetch() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/.well-known/adagents.json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(conformant_manifest(&["https://sales.example.com"]).to_string())
        .expect(2)
        .create_async()
        .await;

    let validator = AuthorizationValidator::new(test_config()).unwrap();
    let domain = server_domain(&server);

    validator.validate(&domain, "https://sales.example.com").await;
    validator.clear_cache().await;
    validator.validate(&domain, "https://sales.example.com").await;

    mock.assert_async().await;
}
