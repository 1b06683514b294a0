//! Text-to-speech endpoint
//!
//! Audio is streamed from a temporary file. The file handle and its
//! [`AudioArtifact`] travel with the response body, so the file is removed
//! once the body is fully sent, dropped early, or never built.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::{State, rejection::JsonRejection},
    http::header,
    response::{IntoResponse, Response},
    routing::post,
};
use futures::Stream;
use serde::Deserialize;
use tokio_util::io::ReaderStream;

use super::{ApiState, error::ApiError};
use crate::languages::DEFAULT_LANGUAGE;
use crate::speech::{AUDIO_MIME_TYPE, AudioArtifact};

/// Speak request body
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpeakRequest {
    pub text: Option<String>,
    pub language: Option<String>,
}

/// Audio file stream that owns the temp file it reads
struct ArtifactStream {
    inner: ReaderStream<tokio::fs::File>,
    _artifact: AudioArtifact,
}

impl Stream for ArtifactStream {
    type Item = std::io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().inner).poll_next(cx)
    }
}

/// Synthesize speech and stream it back as MP3
async fn speak(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<SpeakRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;

    let text = request
        .text
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("No text provided"))?;
    let language = request
        .language
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());

    let artifact = state
        .synthesizer
        .synthesize(&text, &language)
        .await
        .map_err(|e| {
            tracing::error!(language = %language, error = %e, "speech synthesis failed");
            ApiError::SynthesisFailed(e.to_string())
        })?;

    let file = tokio::fs::File::open(artifact.path()).await.map_err(|e| {
        tracing::error!(path = %artifact.path().display(), error = %e, "failed to open audio file");
        ApiError::Internal(format!("Failed to read audio: {e}"))
    })?;

    let len = artifact.len();
    let stream = ArtifactStream {
        inner: ReaderStream::new(file),
        _artifact: artifact,
    };

    Ok((
        [
            (header::CONTENT_TYPE, AUDIO_MIME_TYPE.to_string()),
            (header::CONTENT_LENGTH, len.to_string()),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}

/// Build speech router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new().route("/api/speak", post(speak)).with_state(state)
}
