use axum::{
    extract::Query,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use classroom_core::{
    checkpoints::CheckpointStore,
    domain::SessionCredential,
    ports::{ClassroomBackend, PortError},
    session_config::{SessionConfig, SessionSettings},
};
use classroom_lib::adapters::{HttpBackend, SdpNegotiator};
use serde_json::{json, Value};
use std::collections::HashMap;

/// Serves `router` on an ephemeral port and returns its base URL.
async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn config() -> SessionConfig {
    SessionConfig::for_checkpoint(&CheckpointStore::default(), 0, &SessionSettings::default())
}

#[tokio::test]
async fn preprocess_posts_the_link_and_parses_checkpoints() {
    let router = Router::new().route(
        "/api/preprocess",
        post(|Json(body): Json<Value>| async move {
            assert_eq!(body["youtube_link"], "https://youtu.be/dQw4w9WgXcQ");
            Json(json!({
                "checkpoints": [
                    {"time": 12.5, "question": "Why?", "segment": "intro"},
                    {"time": 40, "question": "How?"}
                ],
                "final": {"summary": "All of it.", "review_questions": ["What?"]}
            }))
        }),
    );
    let base = serve(router).await;
    let backend = HttpBackend::new(reqwest::Client::new(), format!("{}/api/", base));

    let result = backend
        .preprocess("https://youtu.be/dQw4w9WgXcQ")
        .await
        .unwrap();

    assert_eq!(result.checkpoints.len(), 2);
    assert_eq!(result.checkpoints[0].time, 12.5);
    assert_eq!(result.checkpoints[1].segment, "");
    assert_eq!(result.final_review.unwrap().review_questions, vec!["What?"]);
}

#[tokio::test]
async fn preprocess_failures_are_reported_as_unavailable() {
    let router = Router::new().route(
        "/api/preprocess",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    );
    let backend = HttpBackend::new(reqwest::Client::new(), format!("{}/api", serve(router).await));

    let err = backend.preprocess("https://youtu.be/dQw4w9WgXcQ").await.unwrap_err();
    assert!(matches!(err, PortError::Unavailable(_)), "{err}");
}

#[tokio::test]
async fn session_token_sends_the_session_config() {
    let router = Router::new().route(
        "/api/session-token",
        post(|Json(body): Json<Value>| async move {
            assert_eq!(body["tools"].as_array().map(Vec::len), Some(4));
            assert_eq!(body["turn_detection"]["type"], "server_vad");
            Json(json!({"client_secret": {"value": format!("ek_{}", body["voice"].as_str().unwrap())}}))
        }),
    );
    let backend = HttpBackend::new(reqwest::Client::new(), format!("{}/api", serve(router).await));

    let credential = backend.session_token(&config()).await.unwrap();
    assert_eq!(credential.expose(), "ek_verse");
}

#[tokio::test]
async fn a_token_response_without_a_secret_is_invalid() {
    let router = Router::new().route(
        "/api/session-token",
        post(|| async { Json(json!({"client_secret": {}})) }),
    );
    let backend = HttpBackend::new(reqwest::Client::new(), format!("{}/api", serve(router).await));

    let err = backend.session_token(&config()).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid response: Missing client_secret in response"
    );
}

#[tokio::test]
async fn rejected_credentials_are_permission_errors() {
    let router = Router::new().route(
        "/api/session-token",
        post(|| async { StatusCode::UNAUTHORIZED }),
    );
    let backend = HttpBackend::new(reqwest::Client::new(), format!("{}/api", serve(router).await));

    let err = backend.session_token(&config()).await.unwrap_err();
    assert!(matches!(err, PortError::PermissionDenied(_)), "{err}");
}

#[tokio::test]
async fn discovery_prefers_a_live_local_backend() {
    let local = serve(Router::new().route("/api/ping", get(|| async { "pong" }))).await;
    let backend = HttpBackend::discover(
        reqwest::Client::new(),
        &format!("{}/api", local),
        Some("http://remote.invalid/api"),
    )
    .await
    .unwrap();
    assert_eq!(backend.base_url(), format!("{}/api", local));
}

#[tokio::test]
async fn discovery_falls_back_to_the_remote_backend() {
    // Nothing answers on port 1.
    let backend = HttpBackend::discover(
        reqwest::Client::new(),
        "http://127.0.0.1:1/api",
        Some("https://classroom.example.com/api/"),
    )
    .await
    .unwrap();
    assert_eq!(backend.base_url(), "https://classroom.example.com/api");

    let err = HttpBackend::discover(reqwest::Client::new(), "http://127.0.0.1:1/api", None)
        .await
        .err()
        .unwrap();
    assert!(matches!(err, PortError::Unavailable(_)), "{err}");
}

#[tokio::test]
async fn sdp_offers_are_exchanged_for_answers() {
    let router = Router::new().route(
        "/v1/realtime",
        post(
            |Query(query): Query<HashMap<String, String>>, headers: HeaderMap, offer: String| async move {
                assert_eq!(query.get("model").map(String::as_str), Some("model-x"));
                assert_eq!(headers["authorization"], "Bearer ek_test");
                assert_eq!(headers["content-type"], "application/sdp");
                format!("answer for {}", offer)
            },
        ),
    );
    let url = format!("{}/v1/realtime", serve(router).await);
    let negotiator = SdpNegotiator::new(reqwest::Client::new(), url);

    let answer = negotiator
        .negotiate("v=0 offer", "model-x", &SessionCredential::new("ek_test"))
        .await
        .unwrap();
    assert_eq!(answer, "answer for v=0 offer");
}

#[tokio::test]
async fn an_empty_sdp_answer_is_invalid() {
    let router = Router::new().route("/v1/realtime", post(|| async { "  " }));
    let url = format!("{}/v1/realtime", serve(router).await);
    let negotiator = SdpNegotiator::new(reqwest::Client::new(), url);

    let err = negotiator
        .negotiate("v=0", "model-x", &SessionCredential::new("ek_test"))
        .await
        .unwrap_err();
    assert!(matches!(err, PortError::InvalidResponse(_)), "{err}");
}
