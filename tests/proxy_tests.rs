#![cfg(feature = "proxy")]

mod player_support;

use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, Request, StatusCode},
};
use serde_json::{json, Value};
use tower::util::ServiceExt;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use player_support::{exchange, token_response};

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn token_route_requires_code() {
    let server = MockServer::start().await;
    let app = playdeck::proxy::router(exchange(&server));

    let response = app
        .oneshot(post_json("/api/spotify/token", json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["statusMessage"], "Code is required");
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn token_route_returns_provider_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=the-code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_response("user-token")))
        .expect(1)
        .mount(&server)
        .await;
    let app = playdeck::proxy::router(exchange(&server));

    let response = app
        .oneshot(post_json("/api/spotify/token", json!({ "code": "the-code" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        extract_json(response.into_body()).await,
        token_response("user-token")
    );
}

#[tokio::test]
async fn token_route_mirrors_upstream_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "error": "invalid_client" })))
        .mount(&server)
        .await;
    let app = playdeck::proxy::router(exchange(&server));

    let response = app
        .oneshot(post_json("/api/spotify/token", json!({ "code": "x" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["statusMessage"], "Failed to fetch token from Spotify");
}

#[tokio::test]
async fn refresh_route_requires_refresh_token() {
    let server = MockServer::start().await;
    let app = playdeck::proxy::router(exchange(&server));

    let response = app
        .oneshot(post_json("/api/spotify/refresh", json!({ "refresh_token": "" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["statusMessage"], "Refresh token is required");
}

#[tokio::test]
async fn refresh_route_forwards_refresh_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=r-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_response("fresh")))
        .expect(1)
        .mount(&server)
        .await;
    let app = playdeck::proxy::router(exchange(&server));

    let response = app
        .oneshot(post_json("/api/spotify/refresh", json!({ "refresh_token": "r-1" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["access_token"], "fresh");
}

#[tokio::test]
async fn refresh_route_maps_upstream_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "error": "invalid_grant" })))
        .mount(&server)
        .await;
    let app = playdeck::proxy::router(exchange(&server));

    let response = app
        .oneshot(post_json("/api/spotify/refresh", json!({ "refresh_token": "bad" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["statusMessage"], "Failed to refresh token from Spotify");
}

#[tokio::test]
async fn network_failure_is_internal_error() {
    let exchange = playdeck::auth::TokenExchange::new("id", "secret")
        .with_token_url("http://127.0.0.1:9/api/token");
    let app = playdeck::proxy::router(exchange);

    let response = app
        .oneshot(post_json("/api/spotify/refresh", json!({ "refresh_token": "r" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
