use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http::HeaderMap;
use vocabmeld_relay::auth::{authenticate, build_allowed_key_set};
use vocabmeld_relay::config::{AppConfig, ClientAuthConfig};
use vocabmeld_relay::error::RelayError;
use vocabmeld_relay::routing::dispatch::dispatch_request;
use vocabmeld_relay::state::AppState;

fn config_with_keys(keys: Vec<&str>) -> AppConfig {
    AppConfig {
        client_authentication: ClientAuthConfig {
            allowed_keys: keys.into_iter().map(ToString::to_string).collect(),
        },
        ..AppConfig::default()
    }
}

#[test]
fn test_auth_bearer_success() {
    let allowed = build_allowed_key_set(&config_with_keys(vec!["client-key"]));
    let mut headers = HeaderMap::new();
    headers.insert(
        "authorization",
        "Bearer client-key".parse().expect("header"),
    );
    assert!(authenticate(&headers, &allowed).is_ok());
}

#[test]
fn test_auth_missing_key_is_error() {
    let allowed = build_allowed_key_set(&config_with_keys(vec!["client-key", "other"]));
    let headers = HeaderMap::new();
    let err = authenticate(&headers, &allowed).expect_err("auth should fail");
    assert!(matches!(err, RelayError::Auth(_)));
}

#[tokio::test]
async fn test_relay_rejects_unauthenticated_calls() {
    let state = Arc::new(AppState::from_config(config_with_keys(vec!["client-key"])));

    let request = Request::builder()
        .method("GET")
        .uri("/v1/settings")
        .body(Body::empty())
        .expect("build request");
    let response = dispatch_request(Arc::clone(&state), request)
        .await
        .expect("dispatch");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let payload: serde_json::Value = serde_json::from_slice(&body).expect("json payload");
    assert_eq!(payload["success"], false);
    assert_eq!(payload["error"], "Auth error: Missing API key");

    let request = Request::builder()
        .method("POST")
        .uri("/v1/llm")
        .header("authorization", "Bearer wrong")
        .body(Body::from(r#"{"messages":[{"role":"user","content":"hi"}]}"#))
        .expect("build request");
    let response = dispatch_request(Arc::clone(&state), request)
        .await
        .expect("dispatch");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Health stays public.
    let request = Request::builder()
        .method("GET")
        .uri("/")
        .body(Body::empty())
        .expect("build request");
    let response = dispatch_request(state, request).await.expect("dispatch");
    assert_eq!(response.status(), StatusCode::OK);
}
