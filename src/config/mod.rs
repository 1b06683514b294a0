//! Configuration management for the voice relay
//!
//! Precedence: environment (including `.env`) > TOML file > defaults.

pub mod file;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::conversation::DEFAULT_MAX_TURNS;
use crate::llm::DEFAULT_CONTEXT_TURNS;
use crate::{Error, Result};

pub use file::ConfigFile;

/// Voice relay configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Upstream language model configuration
    pub llm: LlmConfig,

    /// Conversation history limits
    pub conversation: ConversationConfig,

    /// Speech synthesis configuration
    pub speech: SpeechConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Global requests-per-minute limit (disabled when `None`)
    pub rate_limit_rpm: Option<u32>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            rate_limit_rpm: None,
        }
    }
}

/// Upstream language model configuration
#[derive(Clone)]
pub struct LlmConfig {
    /// Bearer token for the upstream API
    pub api_key: Option<String>,

    /// OpenAI-compatible base URL
    pub base_url: String,

    /// Model identifier
    pub model: String,

    /// Maximum tokens generated per reply
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// HTTP request timeout in seconds
    pub timeout_secs: u64,

    /// Retries for recoverable upstream failures
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.groq.com/openai/v1".to_string(),
            model: "llama-3.2-3b-preview".to_string(),
            max_tokens: 500,
            temperature: 0.7,
            timeout_secs: 30,
            max_retries: 2,
        }
    }
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

/// Conversation history limits
#[derive(Debug, Clone)]
pub struct ConversationConfig {
    /// Turns retained per session
    pub max_turns: usize,

    /// Prior turns sent to the model with each message
    pub context_turns: usize,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_turns: DEFAULT_MAX_TURNS,
            context_turns: DEFAULT_CONTEXT_TURNS,
        }
    }
}

/// Speech synthesis backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SpeechProvider {
    /// Google Translate TTS, keyed by language code
    #[default]
    Google,
    /// `OpenAI` `/audio/speech`
    OpenAi,
}

impl FromStr for SpeechProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "google" | "gtts" => Ok(Self::Google),
            "openai" => Ok(Self::OpenAi),
            other => Err(Error::Config(format!("unknown TTS provider: {other}"))),
        }
    }
}

/// Speech synthesis configuration
#[derive(Clone)]
pub struct SpeechConfig {
    /// Selected backend
    pub provider: SpeechProvider,

    /// `OpenAI` API key (only for the `openai` provider)
    pub openai_api_key: Option<String>,

    /// TTS model for `OpenAI` (e.g. "tts-1")
    pub model: String,

    /// TTS voice identifier for `OpenAI`
    pub voice: String,

    /// TTS speed multiplier (0.25 to 4.0)
    pub speed: f32,

    /// Directory for temporary audio files (system temp dir when `None`)
    pub temp_dir: Option<PathBuf>,

    /// HTTP request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            provider: SpeechProvider::default(),
            openai_api_key: None,
            model: "tts-1".to_string(),
            voice: "alloy".to_string(),
            speed: 1.0,
            temp_dir: None,
            timeout_secs: 30,
        }
    }
}

impl fmt::Debug for SpeechConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpeechConfig")
            .field("provider", &self.provider)
            .field("openai_api_key", &self.openai_api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("voice", &self.voice)
            .field("speed", &self.speed)
            .field("temp_dir", &self.temp_dir)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Config {
    /// Load configuration from `.env`, the process environment and the TOML file
    ///
    /// # Errors
    ///
    /// Returns error if a value is out of range or unrecognized
    pub fn load() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::info!(path = %path.display(), "loaded .env file");
        }

        let fc = file::load_config_file();
        Self::from_sources(|key| std::env::var(key).ok(), fc)
    }

    /// Build configuration from an environment lookup and a parsed config file
    ///
    /// # Errors
    ///
    /// Returns error if a value is out of range or unrecognized
    pub fn from_sources<F>(env: F, fc: ConfigFile) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let server_default = ServerConfig::default();
        let server = ServerConfig {
            host: lookup(&env, &["RELAY_HOST"])
                .or(fc.server.host)
                .unwrap_or(server_default.host),
            port: lookup_parsed(&env, &["RELAY_PORT", "PORT"])
                .or(fc.server.port)
                .unwrap_or(server_default.port),
            rate_limit_rpm: lookup_parsed(&env, &["RELAY_RATE_LIMIT_RPM"])
                .or(fc.server.rate_limit_rpm)
                .filter(|rpm| *rpm > 0),
        };

        let llm_default = LlmConfig::default();
        let llm = LlmConfig {
            api_key: lookup(&env, &["LLM_API_KEY", "GROQ_API_KEY"]).or(fc.llm.api_key),
            base_url: lookup(&env, &["LLM_BASE_URL"])
                .or(fc.llm.base_url)
                .unwrap_or(llm_default.base_url),
            model: lookup(&env, &["LLM_MODEL"])
                .or(fc.llm.model)
                .unwrap_or(llm_default.model),
            max_tokens: lookup_parsed(&env, &["LLM_MAX_TOKENS"])
                .or(fc.llm.max_tokens)
                .unwrap_or(llm_default.max_tokens),
            temperature: lookup_parsed(&env, &["LLM_TEMPERATURE"])
                .or(fc.llm.temperature)
                .unwrap_or(llm_default.temperature),
            timeout_secs: lookup_parsed(&env, &["LLM_TIMEOUT_SECS"])
                .or(fc.llm.timeout_secs)
                .unwrap_or(llm_default.timeout_secs),
            max_retries: lookup_parsed(&env, &["LLM_MAX_RETRIES"])
                .or(fc.llm.max_retries)
                .unwrap_or(llm_default.max_retries),
        };

        let conversation_default = ConversationConfig::default();
        let conversation = ConversationConfig {
            max_turns: lookup_parsed(&env, &["RELAY_MAX_TURNS"])
                .or(fc.conversation.max_turns)
                .unwrap_or(conversation_default.max_turns)
                .max(1),
            context_turns: lookup_parsed(&env, &["RELAY_CONTEXT_TURNS"])
                .or(fc.conversation.context_turns)
                .unwrap_or(conversation_default.context_turns),
        };

        let speech_default = SpeechConfig::default();
        let provider = match lookup(&env, &["TTS_PROVIDER"]).or(fc.speech.provider) {
            Some(name) => name.parse()?,
            None => speech_default.provider,
        };
        let speech = SpeechConfig {
            provider,
            openai_api_key: lookup(&env, &["OPENAI_API_KEY"]).or(fc.speech.openai_api_key),
            model: lookup(&env, &["TTS_MODEL"])
                .or(fc.speech.model)
                .unwrap_or(speech_default.model),
            voice: lookup(&env, &["TTS_VOICE"])
                .or(fc.speech.voice)
                .unwrap_or(speech_default.voice),
            speed: lookup_parsed(&env, &["TTS_SPEED"])
                .or(fc.speech.speed)
                .unwrap_or(speech_default.speed),
            temp_dir: lookup(&env, &["TTS_TEMP_DIR"])
                .or(fc.speech.temp_dir)
                .map(PathBuf::from),
            timeout_secs: lookup_parsed(&env, &["TTS_TIMEOUT_SECS"])
                .or(fc.speech.timeout_secs)
                .unwrap_or(speech_default.timeout_secs),
        };

        let config = Self {
            server,
            llm,
            conversation,
            speech,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    ///
    /// # Errors
    ///
    /// Returns error describing the first invalid value
    pub fn validate(&self) -> Result<()> {
        if self.llm.max_tokens == 0 {
            return Err(Error::Config("max_tokens must be greater than 0".to_string()));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(Error::Config(format!(
                "temperature must be between 0 and 2, got {}",
                self.llm.temperature
            )));
        }
        if !(0.25..=4.0).contains(&self.speech.speed) {
            return Err(Error::Config(format!(
                "TTS speed must be between 0.25 and 4.0, got {}",
                self.speech.speed
            )));
        }
        if self.speech.timeout_secs == 0 {
            return Err(Error::Config("TTS timeout must be greater than 0".to_string()));
        }
        if self.llm.base_url.trim().is_empty() {
            return Err(Error::Config("LLM base URL must not be empty".to_string()));
        }
        Ok(())
    }

    /// Socket address string to bind the server to
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// First non-empty value among `keys`
fn lookup<F>(env: &F, keys: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    keys.iter().find_map(|k| env(k).filter(|v| !v.trim().is_empty()))
}

/// First non-empty value among `keys`, parsed; unparsable values yield `None`
fn lookup_parsed<T, F>(env: &F, keys: &[&str]) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(env, keys).and_then(|v| v.trim().parse().ok())
}
