//! Voice Relay - multilingual conversational voice backend
//!
//! This library provides the core functionality for the relay:
//! - Language detection over a fixed set of supported languages
//! - Per-session conversation history
//! - Reply generation through an OpenAI-compatible chat endpoint
//! - Speech synthesis into short-lived MP3 files
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    HTTP API                          │
//! │   chat  │  speak  │  reset  │  health  │  languages  │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                  Voice Relay                         │
//! │   Detector  │  Conversation Store  │  Synthesizer   │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                 Upstreams                            │
//! │   Chat completions  │  Google TTS  │  OpenAI TTS     │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod config;
pub mod conversation;
pub mod detect;
pub mod error;
pub mod languages;
pub mod llm;
pub mod speech;

pub use api::{ApiServer, ApiServerBuilder};
pub use config::Config;
pub use conversation::{Conversation, ConversationStore, Role, Turn};
pub use detect::LanguageDetector;
pub use error::{Error, Result};
pub use languages::{LanguageRecord, SUPPORTED_LANGUAGES};
pub use llm::{CompletionProvider, Reply, ResponseGenerator};
pub use speech::{AudioArtifact, SpeechEngine, Synthesizer};
