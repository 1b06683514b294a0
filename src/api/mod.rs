//! HTTP API server for the voice relay

pub mod chat;
pub mod error;
pub mod health;
pub mod rate_limit;
pub mod speech;

pub use error::ApiError;

use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::Result;
use crate::config::Config;
use crate::conversation::ConversationStore;
use crate::detect::LanguageDetector;
use crate::llm::{OpenAiCompatibleProvider, ResponseGenerator};
use crate::speech::Synthesizer;

/// Shared state for API handlers
pub struct ApiState {
    pub detector: LanguageDetector,
    pub store: Arc<ConversationStore>,
    pub generator: Arc<ResponseGenerator>,
    pub synthesizer: Arc<Synthesizer>,
    pub rate_limiter: Option<rate_limit::SharedLimiter>,
}

/// Configuration for building an API server
pub struct ApiServerBuilder {
    generator: Arc<ResponseGenerator>,
    synthesizer: Arc<Synthesizer>,
    store: Option<Arc<ConversationStore>>,
    rate_limit_rpm: Option<u32>,
    addr: String,
}

impl ApiServerBuilder {
    /// Create a new API server builder
    #[must_use]
    pub fn new(generator: Arc<ResponseGenerator>, synthesizer: Arc<Synthesizer>) -> Self {
        Self {
            generator,
            synthesizer,
            store: None,
            rate_limit_rpm: None,
            addr: Config::default().bind_addr(),
        }
    }

    /// Wire up every collaborator from configuration
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client or speech engine cannot be built
    pub fn from_config(config: &Config) -> Result<Self> {
        let provider = OpenAiCompatibleProvider::new(&config.llm)?;
        let generator = ResponseGenerator::new(Arc::new(provider), &config.llm, config.conversation.context_turns);

        let synthesizer = Synthesizer::from_config(&config.speech)?;

        Ok(Self::new(Arc::new(generator), Arc::new(synthesizer))
            .store(Arc::new(ConversationStore::new(config.conversation.max_turns)))
            .rate_limit(config.server.rate_limit_rpm)
            .addr(config.bind_addr()))
    }

    /// Use an existing conversation store
    #[must_use]
    pub fn store(mut self, store: Arc<ConversationStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Limit total requests per minute
    #[must_use]
    pub const fn rate_limit(mut self, rpm: Option<u32>) -> Self {
        self.rate_limit_rpm = rpm;
        self
    }

    /// Set the listen address (`host:port`)
    #[must_use]
    pub fn addr(mut self, addr: impl Into<String>) -> Self {
        self.addr = addr.into();
        self
    }

    /// Build the API server
    #[must_use]
    pub fn build(self) -> ApiServer {
        let state = Arc::new(ApiState {
            detector: LanguageDetector::new(),
            store: self.store.unwrap_or_default(),
            generator: self.generator,
            synthesizer: self.synthesizer,
            rate_limiter: self.rate_limit_rpm.map(rate_limit::create_limiter),
        });

        ApiServer {
            state,
            addr: self.addr,
        }
    }
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    addr: String,
}

impl ApiServer {
    /// Shared handler state
    #[must_use]
    pub fn state(&self) -> &Arc<ApiState> {
        &self.state
    }

    /// Build the router with all routes
    #[must_use]
    pub fn router(&self) -> Router {
        let router = Router::new()
            .merge(health::router(self.state.clone()))
            .merge(chat::router(self.state.clone()))
            .merge(speech::router(self.state.clone()));

        let router = router.layer(axum::middleware::from_fn_with_state(
            self.state.clone(),
            rate_limit::rate_limit_middleware,
        ));

        // Any origin may call the API
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        router
            .layer(CatchPanicLayer::custom(error::panic_response))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    /// Run the API server until ctrl-c
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let listener = TcpListener::bind(&self.addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind API server on {}: {e}", self.addr)))?;

        if self.state.rate_limiter.is_some() {
            tracing::info!("rate limiting active");
        }
        tracing::info!(addr = %self.addr, "API server listening");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| crate::Error::Config(format!("API server error: {e}")))?;

        tracing::info!("API server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("shutdown signal received");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_config_listens_on_configured_address() {
        let mut config = Config::default();
        config.server.host = "0.0.0.0".to_string();
        config.server.port = 8089;

        let server = ApiServerBuilder::from_config(&config).unwrap().build();
        assert_eq!(server.addr, "0.0.0.0:8089");
    }

    #[test]
    fn from_config_defaults_to_local_port_5000() {
        let server = ApiServerBuilder::from_config(&Config::default()).unwrap().build();
        assert_eq!(server.addr, "127.0.0.1:5000");
    }
}
