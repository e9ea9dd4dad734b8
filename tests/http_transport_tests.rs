mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use weave::agent_loop::Agent;
use weave::auth::{Credential, CredentialRefresher, IssuedToken};
use weave::config::WeaveConfig;
use weave::error::{ErrorCategory, WeaveError};
use weave::provider::{HttpTransport, Transport};
use weave::types::ChatMessage;

use common::text_response;

const CHAT_PATH: &str = "/v1/chat/completions";

struct StaticRefresher {
    token: &'static str,
    calls: AtomicUsize,
}

impl StaticRefresher {
    fn new(token: &'static str) -> Arc<Self> {
        Arc::new(Self {
            token,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl CredentialRefresher for StaticRefresher {
    async fn refresh(&self) -> weave::Result<IssuedToken> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(IssuedToken::new(self.token))
    }
}

fn sse_response(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/event-stream")
        .set_body_string(body)
}

async fn read_body(transport: &HttpTransport) -> Result<String, WeaveError> {
    let mut stream = transport.send(CHAT_PATH, &json!({ "model": "gpt-4o" })).await?;
    let mut out = Vec::new();
    while let Some(chunk) = stream.next().await {
        out.extend_from_slice(&chunk?);
    }
    Ok(String::from_utf8(out).expect("utf-8 body"))
}

#[tokio::test]
async fn sends_bearer_token_and_streams_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .and(header("authorization", "Bearer key-1"))
        .and(header("accept", "text/event-stream"))
        .and(body_partial_json(json!({ "model": "gpt-4o" })))
        .respond_with(sse_response(text_response("hi")))
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpTransport::new(server.uri(), Arc::new(Credential::new("key-1"))).unwrap();
    let body = read_body(&transport).await.unwrap();
    assert!(body.contains("\"content\":\"hi\""));
    assert!(body.ends_with("data: [DONE]\n\n"));
}

#[tokio::test]
async fn refreshes_once_after_401_and_retries() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .and(header("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(sse_response(text_response("ok")))
        .expect(1)
        .mount(&server)
        .await;

    let refresher = StaticRefresher::new("fresh");
    let credential = Arc::new(Credential::new("stale").with_refresher(refresher.clone()));
    let transport = HttpTransport::new(server.uri(), credential.clone()).unwrap();

    read_body(&transport).await.unwrap();
    assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
    assert_eq!(credential.snapshot().await.token, "fresh");
}

#[tokio::test]
async fn second_401_is_returned_without_another_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "error": { "message": "revoked" } })),
        )
        .expect(2)
        .mount(&server)
        .await;

    let refresher = StaticRefresher::new("still-bad");
    let credential = Arc::new(Credential::new("stale").with_refresher(refresher.clone()));
    let transport = HttpTransport::new(server.uri(), credential).unwrap();

    let err = read_body(&transport).await.unwrap_err();
    match &err {
        WeaveError::Api { status, message, .. } => {
            assert_eq!(*status, 401);
            assert_eq!(message, "revoked");
        }
        other => panic!("expected API error, got {other:?}"),
    }
    assert_eq!(err.category(), ErrorCategory::Authentication);
    assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unauthorized_without_refresher_fails_after_one_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpTransport::new(server.uri(), Arc::new(Credential::new("key"))).unwrap();
    let err = read_body(&transport).await.unwrap_err();
    assert_eq!(err.status(), Some(401));
}

#[tokio::test]
async fn rate_limit_keeps_structured_details() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": { "message": "slow down", "retry_after": 3 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpTransport::new(server.uri(), Arc::new(Credential::new("key"))).unwrap();
    let err = read_body(&transport).await.unwrap_err();

    assert!(err.is_retryable());
    assert_eq!(err.category(), ErrorCategory::RateLimit);
    match err {
        WeaveError::Api {
            status, details, ..
        } => {
            assert_eq!(status, 429);
            assert_eq!(details.unwrap()["error"]["retry_after"], 3);
        }
        other => panic!("expected API error, got {other:?}"),
    }
}

#[tokio::test]
async fn agent_from_config_runs_against_http_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .and(header("authorization", "Bearer cfg-key"))
        .and(body_partial_json(json!({ "model": "gpt-4o-mini", "stream": true })))
        .respond_with(sse_response(text_response("4")))
        .expect(1)
        .mount(&server)
        .await;

    let config = WeaveConfig::default()
        .with_api_key("cfg-key")
        .with_base_url(server.uri());
    let agent = Agent::from_config(&config, Vec::new()).unwrap();

    let result = agent.run(vec![ChatMessage::user("2+2?")]).await.unwrap();
    assert_eq!(result.text, "4");
}

#[test]
fn from_config_requires_an_api_key() {
    let err = HttpTransport::from_config(&WeaveConfig::default()).unwrap_err();
    assert!(matches!(err, WeaveError::Configuration(_)));
}
