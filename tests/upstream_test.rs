//! Tests for [`HttpUpstream`] — wire behaviour against a wiremock
//! backend.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use gencache::GencacheError;
use gencache::types::GenerateRequest;
use gencache::upstream::{CompletionBackend, HttpUpstream};

fn upstream(uri: &str) -> HttpUpstream {
    HttpUpstream::new(uri, Duration::from_secs(2)).unwrap()
}

fn request(n: u64) -> GenerateRequest {
    GenerateRequest::from_value(json!({
        "text": "Hello",
        "sampling_params": {"temperature": 0.0, "n": n}
    }))
    .unwrap()
}

#[tokio::test]
async fn forwards_the_request_body_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .and(body_partial_json(json!({
            "text": "Hello",
            "sampling_params": {"temperature": 0.0, "n": 2}
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"text": "a"}, {"text": "b"}])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let completions = upstream(&server.uri()).generate(&request(2)).await.unwrap();
    assert_eq!(completions.len(), 2);
    assert_eq!(completions[0].text(), "a");
}

#[tokio::test]
async fn scalar_body_normalizes_to_one_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"text": "only"})))
        .mount(&server)
        .await;

    let completions = upstream(&server.uri()).generate(&request(1)).await.unwrap();
    assert_eq!(completions.len(), 1);
    assert_eq!(completions[0].text(), "only");
}

#[tokio::test]
async fn backend_5xx_surfaces_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let err = upstream(&server.uri())
        .generate(&request(1))
        .await
        .unwrap_err();
    match err {
        GencacheError::UpstreamProtocol { status, message } => {
            assert_eq!(status, 503);
            assert!(message.contains("overloaded"));
        }
        other => panic!("expected protocol error, got {other:?}"),
    }
}

#[tokio::test]
async fn non_json_body_is_a_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = upstream(&server.uri())
        .generate(&request(1))
        .await
        .unwrap_err();
    assert!(matches!(err, GencacheError::UpstreamProtocol { .. }));
}

#[tokio::test]
async fn connection_refused_is_unavailable() {
    let err = upstream("http://127.0.0.1:1")
        .generate(&request(1))
        .await
        .unwrap_err();
    assert!(matches!(err, GencacheError::UpstreamUnavailable(_)));
}

#[tokio::test]
async fn health_probe_round_trips() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    upstream(&server.uri()).health().await.unwrap();
    assert!(upstream("http://127.0.0.1:1").health().await.is_err());
}

#[tokio::test]
async fn trailing_slash_in_base_url_is_tolerated() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"text": "ok"})))
        .mount(&server)
        .await;

    let with_slash = upstream(&format!("{}/", server.uri()));
    let completions = with_slash.generate(&request(1)).await.unwrap();
    assert_eq!(completions[0].text(), "ok");
}
