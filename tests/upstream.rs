//! Upstream client tests against a local stand-in server

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tokio::net::TcpListener;

use voice_relay::config::{Config, LlmConfig};
use voice_relay::llm::{
    ChatMessage, CompletionProvider, CompletionRequest, FALLBACK_REPLY, OpenAiCompatibleProvider,
};
use voice_relay::speech::{GoogleTranslateEngine, SpeechEngine};
use voice_relay::{ApiServerBuilder, Error};

mod common;
use common::{body_json, post_json};

/// What the stand-in upstream saw and how it should answer
#[derive(Default)]
struct Upstream {
    authorization: Mutex<Vec<Option<String>>>,
    bodies: Mutex<Vec<serde_json::Value>>,
    queries: Mutex<Vec<HashMap<String, String>>>,
    status: Mutex<Option<StatusCode>>,
    content: Mutex<Option<String>>,
}

impl Upstream {
    fn fail_with(&self, status: StatusCode) {
        *self.status.lock().unwrap() = Some(status);
    }

    fn recover(&self) {
        *self.status.lock().unwrap() = None;
    }

    fn reply_with(&self, content: Option<&str>) {
        *self.content.lock().unwrap() = content.map(String::from);
    }

    fn bodies(&self) -> Vec<serde_json::Value> {
        self.bodies.lock().unwrap().clone()
    }
}

async fn completions(
    State(upstream): State<Arc<Upstream>>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Response {
    upstream.authorization.lock().unwrap().push(
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(String::from),
    );
    upstream.bodies.lock().unwrap().push(body);

    if let Some(status) = *upstream.status.lock().unwrap() {
        return (status, r#"{"error":{"message":"nope"}}"#).into_response();
    }

    let content = upstream.content.lock().unwrap().clone();
    Json(serde_json::json!({
        "id": "cmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    }))
    .into_response()
}

async fn translate_tts(
    State(upstream): State<Arc<Upstream>>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let idx: u8 = query.get("idx").and_then(|i| i.parse().ok()).unwrap_or(0);
    upstream.queries.lock().unwrap().push(query);
    ([(header::CONTENT_TYPE, "audio/mpeg")], vec![0xFF, 0xFB, idx]).into_response()
}

async fn stalled_tts() -> Response {
    tokio::time::sleep(Duration::from_secs(30)).await;
    ([(header::CONTENT_TYPE, "audio/mpeg")], vec![0xFF, 0xFB]).into_response()
}

/// Start the stand-in upstream on an ephemeral port
async fn spawn_upstream() -> (String, Arc<Upstream>) {
    let upstream = Arc::new(Upstream::default());
    upstream.reply_with(Some("Hello from upstream"));

    let app = Router::new()
        .route("/v1/chat/completions", post(completions))
        .route("/translate_tts", get(translate_tts))
        .route("/stalled_tts", get(stalled_tts))
        .with_state(Arc::clone(&upstream));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), upstream)
}

fn llm_config(base: &str, api_key: Option<&str>) -> LlmConfig {
    LlmConfig {
        base_url: format!("{base}/v1"),
        api_key: api_key.map(String::from),
        model: "test-model".to_string(),
        max_tokens: 64,
        temperature: 0.5,
        timeout_secs: 5,
        max_retries: 0,
    }
}

fn request() -> CompletionRequest {
    CompletionRequest {
        model: "test-model".to_string(),
        messages: vec![ChatMessage::system("be brief"), ChatMessage::user("hi")],
        max_tokens: 64,
        temperature: Some(0.5),
    }
}

#[tokio::test]
async fn test_provider_sends_openai_request() {
    let (base, upstream) = spawn_upstream().await;
    let provider = OpenAiCompatibleProvider::new(&llm_config(&base, Some("test-key"))).unwrap();

    let text = provider.complete(&request()).await.unwrap();
    assert_eq!(text, "Hello from upstream");

    let auth = upstream.authorization.lock().unwrap().clone();
    assert_eq!(auth, [Some("Bearer test-key".to_string())]);

    let body = &upstream.bodies()[0];
    assert_eq!(body["model"], "test-model");
    assert_eq!(body["max_tokens"], 64);
    assert_eq!(body["temperature"], 0.5);
    assert_eq!(body["messages"][0], serde_json::json!({"role": "system", "content": "be brief"}));
    assert_eq!(body["messages"][1], serde_json::json!({"role": "user", "content": "hi"}));
}

#[tokio::test]
async fn test_provider_without_key_sends_no_auth() {
    let (base, upstream) = spawn_upstream().await;
    let provider = OpenAiCompatibleProvider::new(&llm_config(&base, None)).unwrap();

    provider.complete(&request()).await.unwrap();
    assert_eq!(upstream.authorization.lock().unwrap().clone(), [None::<String>]);
}

#[tokio::test]
async fn test_provider_maps_error_status() {
    let (base, upstream) = spawn_upstream().await;
    upstream.fail_with(StatusCode::UNAUTHORIZED);
    let provider = OpenAiCompatibleProvider::new(&llm_config(&base, Some("bad"))).unwrap();

    let err = provider.complete(&request()).await.unwrap_err();
    match &err {
        Error::Upstream { status, body } => {
            assert_eq!(*status, 401);
            assert!(body.contains("nope"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!err.is_recoverable());
}

#[tokio::test]
async fn test_provider_server_error_is_recoverable() {
    let (base, upstream) = spawn_upstream().await;
    upstream.fail_with(StatusCode::SERVICE_UNAVAILABLE);
    let provider = OpenAiCompatibleProvider::new(&llm_config(&base, None)).unwrap();

    let err = provider.complete(&request()).await.unwrap_err();
    assert!(err.is_recoverable());
}

#[tokio::test]
async fn test_provider_rejects_empty_completion() {
    let (base, upstream) = spawn_upstream().await;
    upstream.reply_with(None);
    let provider = OpenAiCompatibleProvider::new(&llm_config(&base, None)).unwrap();

    assert!(matches!(provider.complete(&request()).await, Err(Error::Llm(_))));
}

#[tokio::test]
async fn test_unreachable_upstream_is_recoverable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let provider = OpenAiCompatibleProvider::new(&llm_config(&format!("http://{addr}"), None)).unwrap();
    let err = provider.complete(&request()).await.unwrap_err();
    assert!(matches!(err, Error::Http(_)));
    assert!(err.is_recoverable());
}

#[tokio::test]
async fn test_google_engine_chunks_requests() {
    let (base, upstream) = spawn_upstream().await;
    let engine = GoogleTranslateEngine::with_url(format!("{base}/translate_tts"), Duration::from_secs(5)).unwrap();

    let text = "palabra ".repeat(60);
    let audio = engine.synthesize(text.trim(), "es").await.unwrap();

    let queries = upstream.queries.lock().unwrap().clone();
    assert_eq!(queries.len(), 3);
    for (i, q) in queries.iter().enumerate() {
        assert_eq!(q["tl"], "es");
        assert_eq!(q["client"], "tw-ob");
        assert_eq!(q["ie"], "UTF-8");
        assert_eq!(q["total"], "3");
        assert_eq!(q["idx"], i.to_string());
        assert_eq!(q["textlen"], q["q"].chars().count().to_string());
        assert!(q["q"].chars().count() <= 200);
    }

    // Chunks are concatenated in order
    assert_eq!(audio, [0xFF, 0xFB, 0, 0xFF, 0xFB, 1, 0xFF, 0xFB, 2]);
}

#[tokio::test]
async fn test_google_engine_gives_up_on_stalled_upstream() {
    let (base, _upstream) = spawn_upstream().await;
    let engine = GoogleTranslateEngine::with_url(format!("{base}/stalled_tts"), Duration::from_millis(200)).unwrap();

    let started = Instant::now();
    let err = engine.synthesize("hello", "en").await.unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(10));
    match &err {
        Error::Http(e) => assert!(e.is_timeout(), "{e}"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_full_relay_against_upstream() {
    let (base, upstream) = spawn_upstream().await;

    let mut config = Config::default();
    config.llm = llm_config(&base, Some("test-key"));
    let app = ApiServerBuilder::from_config(&config).unwrap().build().router();

    let response = post_json(&app, "/api/chat", r#"{"message": "Good morning, how are you feeling today?"}"#).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["response"], "Hello from upstream");
    assert_eq!(json["language"], "en");

    // Upstream goes down: fallback reply, still recorded
    upstream.fail_with(StatusCode::INTERNAL_SERVER_ERROR);
    let response = post_json(&app, "/api/chat", r#"{"message": "Are you still there, my friend?"}"#).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["response"], FALLBACK_REPLY);
    assert_eq!(json["degraded"], true);

    // Second upstream call carried the first exchange
    let bodies = upstream.bodies();
    assert_eq!(bodies.len(), 2);
    assert_eq!(bodies[1]["messages"].as_array().unwrap().len(), 4);
    assert_eq!(bodies[1]["messages"][2]["content"], "Hello from upstream");

    // Back up: the model sees the unanswered question and the apology
    upstream.recover();
    let response = post_json(&app, "/api/chat", r#"{"message": "Good, let us try that again then."}"#).await;
    assert_eq!(body_json(response).await["response"], "Hello from upstream");

    let bodies = upstream.bodies();
    let messages = bodies[2]["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 6);
    assert_eq!(messages[3]["content"], "Are you still there, my friend?");
    assert_eq!(messages[4], serde_json::json!({"role": "assistant", "content": FALLBACK_REPLY}));
}
