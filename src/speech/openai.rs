//! `OpenAI` speech endpoint

use std::time::Duration;

use async_trait::async_trait;

use super::{SpeechEngine, http_client};
use crate::{Error, Result};

const OPENAI_SPEECH_URL: &str = "https://api.openai.com/v1/audio/speech";

/// Speech engine backed by `OpenAI` TTS
///
/// The model infers pronunciation from the text itself, so the language
/// code only shows up in logs.
pub struct OpenAiSpeechEngine {
    client: reqwest::Client,
    api_key: String,
    voice: String,
    speed: f32,
    model: String,
}

impl OpenAiSpeechEngine {
    /// Create a new `OpenAI` TTS engine
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing or the HTTP client cannot be built
    pub fn new(api_key: String, voice: String, speed: f32, model: String, timeout: Duration) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config("OpenAI API key required for TTS".to_string()));
        }

        Ok(Self {
            client: http_client(timeout)?,
            api_key,
            voice,
            speed,
            model,
        })
    }
}

#[async_trait]
impl SpeechEngine for OpenAiSpeechEngine {
    async fn synthesize(&self, text: &str, tts_code: &str) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct TtsRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
            speed: f32,
            response_format: &'a str,
        }

        let request = TtsRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
            speed: self.speed,
            response_format: "mp3",
        };

        tracing::debug!(language = tts_code, voice = %self.voice, "requesting OpenAI speech");

        let response = self
            .client
            .post(OPENAI_SPEECH_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("OpenAI TTS error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        Ok(audio.to_vec())
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}
