//! Response generation through a remote language model
//!
//! The [`ResponseGenerator`] owns prompt construction, the context window
//! and the degrade-gracefully policy. Transport lives behind
//! [`CompletionProvider`] so tests and alternative backends can plug in.

mod openai;
pub mod prompt;
pub mod retry;

pub use openai::OpenAiCompatibleProvider;
pub use retry::RetryPolicy;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::Result;
use crate::config::LlmConfig;
use crate::conversation::Turn;
use crate::detect::LanguageDetector;

/// Text returned to the user when the upstream model cannot answer
pub const FALLBACK_REPLY: &str = "Sorry, I'm having trouble right now.";

/// Default number of prior turns sent with each request
pub const DEFAULT_CONTEXT_TURNS: usize = 6;

/// A chat message in provider wire format
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }
}

impl From<&Turn> for ChatMessage {
    fn from(turn: &Turn) -> Self {
        Self {
            role: turn.role.as_str(),
            content: turn.content.clone(),
        }
    }
}

/// Request sent to a completion provider
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Backend able to turn a message list into generated text
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Run a completion and return the generated text
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;

    /// Short provider name for logs
    fn name(&self) -> &'static str;
}

/// Outcome of a generation attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// The model produced an answer
    Generated(String),
    /// The upstream call failed; `text` is the user-facing fallback
    Degraded { text: String, reason: String },
}

impl Reply {
    /// Text to show the user
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Generated(text) | Self::Degraded { text, .. } => text,
        }
    }

    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    fn degraded(reason: impl Into<String>) -> Self {
        Self::Degraded {
            text: FALLBACK_REPLY.to_string(),
            reason: reason.into(),
        }
    }
}

/// Builds prompts, calls the provider, and degrades on failure
pub struct ResponseGenerator {
    provider: Arc<dyn CompletionProvider>,
    model: String,
    max_tokens: u32,
    temperature: f32,
    context_turns: usize,
    retry: RetryPolicy,
}

impl ResponseGenerator {
    /// Create a generator using the given provider and configuration
    #[must_use]
    pub fn new(provider: Arc<dyn CompletionProvider>, config: &LlmConfig, context_turns: usize) -> Self {
        Self {
            provider,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            context_turns,
            retry: RetryPolicy {
                max_retries: config.max_retries,
                ..RetryPolicy::default()
            },
        }
    }

    /// Override the retry policy
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Message list for `query`: system prompt, recent context, new user turn
    #[must_use]
    pub fn build_messages(&self, query: &str, language: &str, context: &[Turn]) -> Vec<ChatMessage> {
        let language_name = LanguageDetector::display_name(language);
        let window = &context[context.len().saturating_sub(self.context_turns)..];

        let mut messages = Vec::with_capacity(window.len() + 2);
        messages.push(ChatMessage::system(prompt::build_system_prompt(language_name)));
        messages.extend(window.iter().map(ChatMessage::from));
        messages.push(ChatMessage::user(query));
        messages
    }

    /// Generate a reply to `query` in `language`
    ///
    /// Upstream failures never escape: they come back as [`Reply::Degraded`].
    pub async fn generate(&self, query: &str, language: &str, context: &[Turn]) -> Reply {
        let request = CompletionRequest {
            model: self.model.clone(),
            messages: self.build_messages(query, language, context),
            max_tokens: self.max_tokens,
            temperature: Some(self.temperature),
        };

        tracing::info!(
            provider = self.provider.name(),
            model = %self.model,
            language,
            context_turns = request.messages.len() - 2,
            "querying model"
        );

        match self.retry.run(|| self.provider.complete(&request)).await {
            Ok(text) => {
                tracing::info!(chars = text.len(), "got model response");
                Reply::Generated(text)
            }
            Err(e) => {
                tracing::error!(provider = self.provider.name(), error = %e, "model request failed");
                Reply::degraded(e.to_string())
            }
        }
    }

    /// Probe the upstream with a minimal request
    pub async fn check_connectivity(&self) -> bool {
        let request = CompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::user("Hi")],
            max_tokens: 5,
            temperature: None,
        };

        match self.provider.complete(&request).await {
            Ok(_) => {
                tracing::info!(provider = self.provider.name(), model = %self.model, "upstream connected");
                true
            }
            Err(e) => {
                tracing::error!(provider = self.provider.name(), error = %e, "upstream connection failed");
                false
            }
        }
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}
