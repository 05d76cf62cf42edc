use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use axum::{body::Body, http::StatusCode};
use axum_test::TestServer;
use esign_oauth::{
    ClientConfig, ConsentClient, ConsentSettings, Endpoints, assertion::SigningKey,
    http_client::HttpClient,
};
use esign_oauth_axum::{AppState, router};
use http::Request;
use serde_json::{Value, json};
use tower::ServiceExt;

const TEST_KEY: &str = include_str!("../../esign-oauth/tests/fixtures/test_rsa.pem");

#[derive(Debug, thiserror::Error)]
#[error("connection refused")]
struct Unreachable;

// Hands out queued upstream responses in order
#[derive(Debug, Clone, Default)]
struct MockUpstream {
    responses: Arc<Mutex<VecDeque<Result<http::Response<Vec<u8>>, Unreachable>>>>,
    requests: Arc<Mutex<Vec<http::Request<Vec<u8>>>>>,
}

impl MockUpstream {
    fn json(&self, status: StatusCode, body: Value) -> &Self {
        let response = http::Response::builder()
            .status(status)
            .body(serde_json::to_vec(&body).unwrap())
            .unwrap();
        self.responses.lock().unwrap().push_back(Ok(response));
        self
    }

    fn unreachable(&self) -> &Self {
        self.responses.lock().unwrap().push_back(Err(Unreachable));
        self
    }

    fn seen(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| format!("{} {}", r.method(), r.uri()))
            .collect()
    }
}

impl HttpClient for MockUpstream {
    type Error = Unreachable;

    async fn send_http(
        &self,
        request: http::Request<Vec<u8>>,
    ) -> Result<http::Response<Vec<u8>>, Self::Error> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(Unreachable))
    }
}

fn server(upstream: &MockUpstream, state: Option<&str>) -> TestServer {
    let settings = ConsentSettings::builder()
        .client(
            ClientConfig::builder()
                .client_id("X")
                .scopes(vec!["signature".into()])
                .redirect_uri("http://localhost:3000/ds-callback")
                .maybe_state(state)
                .build(),
        )
        .operator("operator-1")
        .endpoints(Endpoints::custom("https://issuer/oauth", "issuer"))
        .build();
    let key = SigningKey::from_pem(TEST_KEY.as_bytes()).unwrap();
    let client = ConsentClient::new(settings, key, upstream.clone()).unwrap();
    TestServer::new(router(AppState::new(Arc::new(client), 3000))).unwrap()
}

fn token_ok(upstream: &MockUpstream) -> &MockUpstream {
    upstream.json(
        StatusCode::OK,
        json!({"access_token": "abc", "token_type": "Bearer", "expires_in": 3600}),
    )
}

#[tokio::test]
async fn root_reports_port() {
    let upstream = MockUpstream::default();
    let response = server(&upstream, None).get("/").await;
    response.assert_status_ok();
    assert_eq!(response.text(), "Server running at port 3000");
}

#[tokio::test]
async fn get_consent_returns_link_as_text() {
    let upstream = MockUpstream::default();
    let response = server(&upstream, Some("xyz")).get("/api/get-consent").await;
    response.assert_status_ok();
    assert_eq!(
        response.text(),
        "https://issuer/oauth/auth?response_type=code&scope=signature\
         &client_id=X&redirect_uri=http://localhost:3000/ds-callback&state=xyz"
    );
    assert!(upstream.seen().is_empty());
}

#[tokio::test]
async fn callback_resolves_default_base_uri() {
    let upstream = MockUpstream::default();
    token_ok(&upstream).json(
        StatusCode::OK,
        json!({
            "sub": "operator-1",
            "accounts": [
                {"account_id": "1", "is_default": false, "base_uri": "https://na1.example.net"},
                {"account_id": "2", "is_default": true, "base_uri": "https://na2.example.net"}
            ]
        }),
    );

    let response = server(&upstream, None)
        .get("/ds-callback?code=ignored-code&state=xyz")
        .await;
    response.assert_status_ok();
    assert_eq!(response.text(), "https://na2.example.net");
    assert_eq!(
        upstream.seen(),
        vec![
            "POST https://issuer/oauth/token".to_string(),
            "GET https://issuer/oauth/userinfo".to_string(),
        ]
    );
}

#[tokio::test]
async fn callback_with_error_param_skips_upstream() {
    let upstream = MockUpstream::default();
    let response = server(&upstream, None)
        .get("/ds-callback?error=access_denied&error_description=no+thanks")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "consent_denied");
    assert_eq!(body["upstream_error"], "access_denied");
    assert!(upstream.seen().is_empty());
}

#[tokio::test]
async fn upstream_rejection_is_sanitized() {
    let upstream = MockUpstream::default();
    upstream.json(
        StatusCode::BAD_REQUEST,
        json!({"error": "consent_required", "error_description": "user 1234 at host 10.1.2.3"}),
    );

    let response = server(&upstream, None).get("/ds-callback").await;
    response.assert_status(StatusCode::BAD_GATEWAY);
    let body: Value = response.json();
    assert_eq!(body["error"], "upstream_rejected");
    assert_eq!(body["upstream_error"], "consent_required");
    assert!(!response.text().contains("10.1.2.3"));
    // no userinfo call after a failed exchange
    assert_eq!(upstream.seen().len(), 1);
}

#[tokio::test]
async fn unreachable_upstream() {
    let upstream = MockUpstream::default();
    upstream.unreachable();

    let response = server(&upstream, None).get("/ds-callback").await;
    response.assert_status(StatusCode::BAD_GATEWAY);
    let body: Value = response.json();
    assert_eq!(body["error"], "upstream_unavailable");
    assert!(body.get("upstream_error").is_none());
}

#[tokio::test]
async fn ambiguous_default_account() {
    let upstream = MockUpstream::default();
    token_ok(&upstream).json(
        StatusCode::OK,
        json!({
            "sub": "operator-1",
            "accounts": [
                {"account_id": "1", "is_default": true, "base_uri": "https://na1.example.net"},
                {"account_id": "2", "is_default": true, "base_uri": "https://na2.example.net"}
            ]
        }),
    );

    let response = server(&upstream, None).get("/ds-callback").await;
    response.assert_status(StatusCode::BAD_GATEWAY);
    let body: Value = response.json();
    assert_eq!(body["error"], "invalid_upstream_response");
}

#[tokio::test]
async fn token_response_without_access_token() {
    let upstream = MockUpstream::default();
    upstream.json(StatusCode::OK, json!({"token_type": "Bearer"}));

    let response = server(&upstream, None).get("/ds-callback").await;
    response.assert_status(StatusCode::BAD_GATEWAY);
    let body: Value = response.json();
    assert_eq!(body["error"], "invalid_upstream_response");
    assert_eq!(upstream.seen().len(), 1);
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let upstream = MockUpstream::default();
    let settings = ConsentSettings::builder()
        .client(
            ClientConfig::builder()
                .client_id("X")
                .scopes(vec!["signature".into()])
                .redirect_uri("http://localhost:3000/ds-callback")
                .build(),
        )
        .operator("operator-1")
        .build();
    let key = SigningKey::from_pem(TEST_KEY.as_bytes()).unwrap();
    let client = ConsentClient::new(settings, key, upstream).unwrap();
    let app = router(AppState::new(Arc::new(client), 3000));

    let request = Request::builder()
        .uri("/api/missing")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
