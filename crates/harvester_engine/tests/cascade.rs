use std::sync::Arc;

use harvester_engine::{
    CascadeError, FailureKind, FetchCascade, FetchSettings, RequestPayload, ReqwestTransport,
    SessionContext, DEFAULT_CASCADE,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn session() -> SessionContext {
    SessionContext {
        api_key: "test-key".into(),
        client_version: "2.20240101.00.00".into(),
        visitor_id: Some("visitor-1".into()),
        request_context: json!({ "client": { "hl": "de", "clientScreen": "WATCH" } }),
    }
}

fn cascade(server: &MockServer) -> FetchCascade {
    let transport = ReqwestTransport::new(FetchSettings::default()).expect("client");
    FetchCascade::new(Arc::new(transport), server.uri(), DEFAULT_CASCADE.to_vec())
}

async fn mount_pair(server: &MockServer, endpoint: &str, client: &str, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path(format!("/youtubei/v1/{endpoint}")))
        .and(header("X-YouTube-Client-Name", client))
        .respond_with(response)
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn falls_through_to_the_fourth_pair() {
    engine_logging::initialize_for_tests();
    let server = MockServer::start().await;
    mount_pair(&server, "next", "1", ResponseTemplate::new(500)).await;
    mount_pair(&server, "next", "3", ResponseTemplate::new(500)).await;
    mount_pair(&server, "browse", "1", ResponseTemplate::new(500)).await;
    mount_pair(
        &server,
        "browse",
        "3",
        ResponseTemplate::new(200).set_body_json(json!({ "served_by": "android-browse" })),
    )
    .await;

    let response = cascade(&server)
        .fetch(&session(), &RequestPayload::Continuation("CONTINUATION_TOKEN".into()))
        .await
        .expect("fourth pair succeeds");
    assert_eq!(response, json!({ "served_by": "android-browse" }));
}

#[tokio::test]
async fn undecodable_success_moves_to_next_pair() {
    let server = MockServer::start().await;
    mount_pair(
        &server,
        "next",
        "1",
        ResponseTemplate::new(200).set_body_raw("<html>consent</html>", "text/html"),
    )
    .await;
    mount_pair(
        &server,
        "next",
        "3",
        ResponseTemplate::new(200).set_body_json(json!({ "served_by": "android-next" })),
    )
    .await;

    let response = cascade(&server)
        .fetch(&session(), &RequestPayload::Continuation("CONTINUATION_TOKEN".into()))
        .await
        .expect("second pair succeeds");
    assert_eq!(response, json!({ "served_by": "android-next" }));
}

#[tokio::test]
async fn every_pair_failing_is_exhausted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .expect(4)
        .mount(&server)
        .await;

    let err = cascade(&server)
        .fetch(&session(), &RequestPayload::Continuation("CONTINUATION_TOKEN".into()))
        .await
        .expect_err("all pairs fail");
    let CascadeError::Exhausted { attempts } = err;
    let steps: Vec<_> = attempts.iter().map(|a| a.step).collect();
    assert_eq!(steps, DEFAULT_CASCADE.to_vec());
    assert!(attempts
        .iter()
        .all(|a| a.error.kind == FailureKind::HttpStatus(503)));
}

#[tokio::test]
async fn request_carries_identity_headers_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/youtubei/v1/next"))
        .and(query_param("key", "test-key"))
        .and(header("X-YouTube-Client-Name", "1"))
        .and(header("X-YouTube-Client-Version", "2.20240101.00.00"))
        .and(header("X-Goog-Visitor-Id", "visitor-1"))
        .and(header("x-goog-api-format-version", "2"))
        .and(body_partial_json(json!({
            "params": "SECTION_PARAMS_VALUE",
            "context": { "client": { "clientName": "WEB", "hl": "de", "clientScreen": "WATCH" } }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    cascade(&server)
        .fetch(&session(), &RequestPayload::Params("SECTION_PARAMS_VALUE".into()))
        .await
        .expect("first pair matches");
}

#[tokio::test]
async fn android_identity_uses_its_own_version() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/youtubei/v1/next"))
        .and(header("X-YouTube-Client-Name", "1"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/youtubei/v1/next"))
        .and(header("X-YouTube-Client-Name", "3"))
        .and(header("X-YouTube-Client-Version", "19.39.34"))
        .and(body_partial_json(json!({
            "videoId": "abc123",
            "context": { "client": { "clientName": "ANDROID", "clientVersion": "19.39.34", "gl": "US" } }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    let response = cascade(&server)
        .fetch(&session(), &RequestPayload::ContentId("abc123".into()))
        .await
        .expect("android pair succeeds");
    assert_eq!(response, json!({ "ok": true }));
}
