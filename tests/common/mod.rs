//! Shared test utilities
#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use tower::ServiceExt;

use voice_relay::config::LlmConfig;
use voice_relay::llm::{CompletionProvider, CompletionRequest, DEFAULT_CONTEXT_TURNS, ResponseGenerator, RetryPolicy};
use voice_relay::speech::{SpeechEngine, Synthesizer};
use voice_relay::{ApiServerBuilder, ConversationStore, Error, Result};

/// How the fake model answers
#[derive(Clone, Copy)]
pub enum Behavior {
    /// Reply with `reply to: <last user message>`
    Echo,
    /// Fail with an upstream 401
    Fail,
    /// Panic inside the request
    Panic,
}

/// Completion provider that records every request
pub struct FakeProvider {
    behavior: Behavior,
    delay: Option<Duration>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl FakeProvider {
    pub fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            delay: None,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            behavior: Behavior::Echo,
            delay: Some(delay),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for FakeProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.behavior {
            Behavior::Echo => {
                let last = request.messages.last().map(|m| m.content.clone()).unwrap_or_default();
                Ok(format!("reply to: {last}"))
            }
            Behavior::Fail => Err(Error::Upstream {
                status: 401,
                body: "invalid api key".to_string(),
            }),
            Behavior::Panic => panic!("model exploded"),
        }
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Speech engine returning fixed bytes (or failing) and recording language codes
pub struct FakeEngine {
    audio: Option<Vec<u8>>,
    codes: Mutex<Vec<String>>,
}

impl FakeEngine {
    pub fn new(audio: Option<Vec<u8>>) -> Arc<Self> {
        Arc::new(Self {
            audio,
            codes: Mutex::new(Vec::new()),
        })
    }

    pub fn codes(&self) -> Vec<String> {
        self.codes.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechEngine for FakeEngine {
    async fn synthesize(&self, _text: &str, tts_code: &str) -> Result<Vec<u8>> {
        self.codes.lock().unwrap().push(tts_code.to_string());
        self.audio
            .clone()
            .ok_or_else(|| Error::Tts("engine unavailable".to_string()))
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Sample MP3 frame header bytes
pub const AUDIO: &[u8] = &[0xFF, 0xFB, 0x90, 0x64, 0x00, 0x01, 0x02, 0x03];

/// A router wired to fakes, plus handles to inspect them
pub struct TestApp {
    pub router: Router,
    pub store: Arc<ConversationStore>,
    pub provider: Arc<FakeProvider>,
    pub engine: Arc<FakeEngine>,
    pub temp_dir: tempfile::TempDir,
}

impl TestApp {
    pub fn new(behavior: Behavior) -> Self {
        Self::build(FakeProvider::new(behavior), FakeEngine::new(Some(AUDIO.to_vec())), None)
    }

    pub fn with_engine(engine: Arc<FakeEngine>) -> Self {
        Self::build(FakeProvider::new(Behavior::Echo), engine, None)
    }

    pub fn build(provider: Arc<FakeProvider>, engine: Arc<FakeEngine>, rate_limit: Option<u32>) -> Self {
        let temp_dir = tempfile::tempdir().unwrap();
        let generator = ResponseGenerator::new(provider.clone(), &LlmConfig::default(), DEFAULT_CONTEXT_TURNS)
            .with_retry(RetryPolicy::none());
        let synthesizer = Synthesizer::new(engine.clone()).with_temp_dir(temp_dir.path());
        let store = Arc::new(ConversationStore::default());

        let server = ApiServerBuilder::new(Arc::new(generator), Arc::new(synthesizer))
            .store(Arc::clone(&store))
            .rate_limit(rate_limit)
            .build();

        Self {
            router: server.router(),
            store,
            provider,
            engine,
            temp_dir,
        }
    }

    /// Number of files left in the audio temp directory
    pub fn temp_files(&self) -> usize {
        count_files(self.temp_dir.path())
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        get(&self.router, uri).await
    }

    pub async fn post_json(&self, uri: &str, body: &str) -> Response<Body> {
        post_json(&self.router, uri, body).await
    }
}

pub async fn get(router: &Router, uri: &str) -> Response<Body> {
    router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn post_json(router: &Router, uri: &str, body: &str) -> Response<Body> {
    router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

pub fn count_files(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
