//! Text-to-speech synthesis into temporary audio files
//!
//! Engines return raw MP3 bytes; [`Synthesizer`] validates input, resolves
//! the engine-specific language code and writes the audio to a temporary
//! file owned by an [`AudioArtifact`]. Dropping the artifact removes the file.

mod google;
mod openai;

pub use google::{GoogleTranslateEngine, chunk_text};
pub use openai::OpenAiSpeechEngine;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tempfile::TempPath;

use crate::config::{SpeechConfig, SpeechProvider};
use crate::languages;
use crate::{Error, Result};

/// MIME type of synthesized audio
pub const AUDIO_MIME_TYPE: &str = "audio/mpeg";

/// Remote engine producing MP3 audio
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    /// Synthesize `text` using the engine's language code `tts_code`
    async fn synthesize(&self, text: &str, tts_code: &str) -> Result<Vec<u8>>;

    /// Short engine name for logs
    fn name(&self) -> &'static str;
}

/// Build the engine selected in configuration
///
/// # Errors
///
/// Returns error if the selected engine is missing required settings
pub fn engine_from_config(config: &SpeechConfig) -> Result<Arc<dyn SpeechEngine>> {
    let timeout = Duration::from_secs(config.timeout_secs);
    let engine: Arc<dyn SpeechEngine> = match config.provider {
        SpeechProvider::Google => Arc::new(GoogleTranslateEngine::new(timeout)?),
        SpeechProvider::OpenAi => {
            let api_key = config
                .openai_api_key
                .clone()
                .ok_or_else(|| Error::Config("OPENAI_API_KEY required for openai TTS".to_string()))?;
            Arc::new(OpenAiSpeechEngine::new(
                api_key,
                config.voice.clone(),
                config.speed,
                config.model.clone(),
                timeout,
            )?)
        }
    };
    tracing::info!(engine = engine.name(), timeout_secs = config.timeout_secs, "speech engine ready");
    Ok(engine)
}

/// HTTP client shared by the remote engines; every request is bounded by `timeout`
fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| Error::Config(format!("failed to build TTS HTTP client: {e}")))
}

/// A synthesized audio file that is deleted when dropped
#[derive(Debug)]
pub struct AudioArtifact {
    path: TempPath,
    len: u64,
}

impl AudioArtifact {
    /// Location of the audio file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the audio file in bytes
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Turns text into temporary audio files
pub struct Synthesizer {
    engine: Arc<dyn SpeechEngine>,
    temp_dir: PathBuf,
}

impl Synthesizer {
    /// Create a synthesizer writing into the system temp directory
    #[must_use]
    pub fn new(engine: Arc<dyn SpeechEngine>) -> Self {
        Self {
            engine,
            temp_dir: std::env::temp_dir(),
        }
    }

    /// Build the configured engine, writing into the configured temp directory
    ///
    /// # Errors
    ///
    /// Returns error if the selected engine is missing required settings
    pub fn from_config(config: &SpeechConfig) -> Result<Self> {
        let synthesizer = Self::new(engine_from_config(config)?);
        Ok(match &config.temp_dir {
            Some(dir) => synthesizer.with_temp_dir(dir),
            None => synthesizer,
        })
    }

    /// Write audio files into `dir` instead of the system temp directory
    #[must_use]
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    /// Synthesize `text` in `language` into a temporary MP3 file
    ///
    /// Unknown language codes use the default language's voice.
    ///
    /// # Errors
    ///
    /// Returns error if `text` is empty, the engine fails, or the file
    /// cannot be written. No file is left behind on error.
    pub async fn synthesize(&self, text: &str, language: &str) -> Result<AudioArtifact> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::Tts("no text to synthesize".to_string()));
        }

        let record = languages::lookup_or_default(language);
        tracing::info!(
            engine = self.engine.name(),
            language = record.code,
            chars = text.chars().count(),
            "synthesizing speech"
        );

        let audio = self.engine.synthesize(text, record.tts_code).await?;
        if audio.is_empty() {
            return Err(Error::Tts(format!("{} returned no audio", self.engine.name())));
        }

        let dir = self.temp_dir.clone();
        let artifact = tokio::task::spawn_blocking(move || write_temp_audio(&dir, &audio))
            .await
            .map_err(|e| Error::Tts(format!("audio write task failed: {e}")))??;

        tracing::debug!(path = %artifact.path().display(), bytes = artifact.len(), "audio written");
        Ok(artifact)
    }
}

/// Write `audio` to a new temp file in `dir`; a partial file is removed on failure
fn write_temp_audio(dir: &Path, audio: &[u8]) -> Result<AudioArtifact> {
    let mut file = tempfile::Builder::new()
        .prefix("voice-relay-")
        .suffix(".mp3")
        .tempfile_in(dir)?;
    file.write_all(audio)?;
    file.flush()?;

    Ok(AudioArtifact {
        path: file.into_temp_path(),
        len: audio.len() as u64,
    })
}
