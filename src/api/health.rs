//! Health and language table endpoints

use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use super::ApiState;
use crate::languages::LanguageTable;

/// Liveness response
#[derive(Serialize)]
pub struct LivenessResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Health response including upstream reachability
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub upstream_connected: bool,
    pub supported_languages: LanguageTable,
}

/// Supported languages response
#[derive(Serialize)]
pub struct LanguagesResponse {
    pub languages: LanguageTable,
}

/// Liveness probe - is the service running?
async fn liveness() -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Health check that probes the upstream model
async fn health(State(state): State<Arc<ApiState>>) -> Json<HealthResponse> {
    let upstream_connected = state.generator.check_connectivity().await;

    Json(HealthResponse {
        status: "ok",
        upstream_connected,
        supported_languages: LanguageTable,
    })
}

/// List supported languages
async fn languages() -> Json<LanguagesResponse> {
    Json(LanguagesResponse {
        languages: LanguageTable,
    })
}

/// Build health router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(liveness))
        .route("/api/health", get(health))
        .route("/api/languages", get(languages))
        .with_state(state)
}
