//! Google Translate speech endpoint, keyed by language code

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::USER_AGENT;

use super::{SpeechEngine, http_client};
use crate::{Error, Result};

const GOOGLE_TTS_URL: &str = "https://translate.google.com/translate_tts";

/// The endpoint rejects longer inputs
const MAX_CHUNK_CHARS: usize = 200;

/// Speech engine backed by Google Translate's TTS endpoint
pub struct GoogleTranslateEngine {
    client: Client,
    url: String,
}

impl GoogleTranslateEngine {
    /// Create an engine whose requests give up after `timeout`
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::with_url(GOOGLE_TTS_URL, timeout)
    }

    /// Use a different endpoint URL
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn with_url(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            url: url.into(),
        })
    }
}

#[async_trait]
impl SpeechEngine for GoogleTranslateEngine {
    async fn synthesize(&self, text: &str, tts_code: &str) -> Result<Vec<u8>> {
        let chunks = chunk_text(text, MAX_CHUNK_CHARS);
        let total = chunks.len().to_string();
        let mut audio = Vec::new();

        for (idx, chunk) in chunks.iter().enumerate() {
            let idx = idx.to_string();
            let textlen = chunk.chars().count().to_string();

            let response = self
                .client
                .get(&self.url)
                .header(USER_AGENT, "Mozilla/5.0")
                .query(&[
                    ("ie", "UTF-8"),
                    ("client", "tw-ob"),
                    ("tl", tts_code),
                    ("q", chunk.as_str()),
                    ("total", total.as_str()),
                    ("idx", idx.as_str()),
                    ("textlen", textlen.as_str()),
                ])
                .send()
                .await?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(Error::Tts(format!("Google TTS error {status}: {body}")));
            }

            // MP3 frames concatenate into a playable stream
            audio.extend_from_slice(&response.bytes().await?);
        }

        Ok(audio)
    }

    fn name(&self) -> &'static str {
        "google-translate"
    }
}

/// Split `text` into chunks of at most `max_chars` characters
///
/// Splits on whitespace where possible; words longer than `max_chars` are
/// cut at character boundaries.
#[must_use]
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if word_len > max_chars {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let chars: Vec<char> = word.chars().collect();
            for piece in chars.chunks(max_chars) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }

        let needed = if current.is_empty() { word_len } else { current_len + 1 + word_len };
        if needed > max_chars {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}
