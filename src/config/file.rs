//! TOML configuration file loading
//!
//! Supports `~/.config/voice-relay/config.toml` (or `VOICE_RELAY_CONFIG`) as a
//! persistent config source. All fields are optional; the file is a partial
//! overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerFileConfig,

    /// Upstream language model configuration
    #[serde(default)]
    pub llm: LlmFileConfig,

    /// Conversation history configuration
    #[serde(default)]
    pub conversation: ConversationFileConfig,

    /// Speech synthesis configuration
    #[serde(default)]
    pub speech: SpeechFileConfig,
}

/// Server/runtime configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    /// Global requests-per-minute limit
    pub rate_limit_rpm: Option<u32>,
}

/// LLM-related configuration
#[derive(Debug, Default, Deserialize)]
pub struct LlmFileConfig {
    pub api_key: Option<String>,
    /// OpenAI-compatible base URL (e.g. `https://api.groq.com/openai/v1`)
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
}

/// Conversation history configuration
#[derive(Debug, Default, Deserialize)]
pub struct ConversationFileConfig {
    /// Turns retained per session
    pub max_turns: Option<usize>,
    /// Prior turns sent to the model with each message
    pub context_turns: Option<usize>,
}

/// Speech synthesis configuration
#[derive(Debug, Default, Deserialize)]
pub struct SpeechFileConfig {
    /// "google" or "openai"
    pub provider: Option<String>,
    pub openai_api_key: Option<String>,
    pub model: Option<String>,
    pub voice: Option<String>,
    pub speed: Option<f32>,
    /// Directory for temporary audio files
    pub temp_dir: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Load the TOML config file from `VOICE_RELAY_CONFIG` or the standard path
///
/// Returns `ConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> ConfigFile {
    let path = std::env::var("VOICE_RELAY_CONFIG")
        .ok()
        .map(PathBuf::from)
        .or_else(config_file_path);

    let Some(path) = path else {
        return ConfigFile::default();
    };

    if !path.exists() {
        return ConfigFile::default();
    }

    load_from_path(&path)
}

/// Parse a config file at `path`, falling back to defaults on error
pub fn load_from_path(path: &Path) -> ConfigFile {
    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                ConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            ConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/voice-relay/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("voice-relay").join("config.toml"))
}
