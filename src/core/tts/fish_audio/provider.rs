//! Fish Audio request builder and provider implementation.
//!
//! # Request Format
//!
//! **URL**: `{base_url}/v1/tts`
//! **Method**: POST
//!
//! | Header | Value | Purpose |
//! |--------|-------|---------|
//! | Authorization | Bearer {api_key} | Authentication |
//! | model | {model} | Synthesis model selection |
//! | Content-Type | application/json | Request body format |
//!
//! A 2xx response carries the WAV bytes as its body. Any other status is
//! reported as [`ProviderError::Http`] with the status line and response
//! text so the caller can classify it.

use std::error::Error as StdError;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use tracing::debug;

use super::MAX_ERROR_BODY_CHARS;
use super::config::{FishAudioConfig, FishTtsBody};
use crate::core::tts::base::{AudioPayload, ProviderError, SpeechProvider, SynthesisRequest};

/// Fish Audio speech provider.
///
/// Holds one pooled HTTP client that is shared by all concurrent requests.
#[derive(Debug, Clone)]
pub struct FishAudioTts {
    client: reqwest::Client,
    endpoint: String,
}

impl FishAudioTts {
    /// Creates a provider for the endpoint described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Other`] if the HTTP client cannot be built
    /// (for example when no TLS backend is available).
    pub fn new(config: &FishAudioConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| ProviderError::Other(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.tts_url(),
        })
    }

    #[inline]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn build_http_request(&self, request: &SynthesisRequest) -> reqwest::RequestBuilder {
        debug!(
            "Building Fish Audio TTS request: reference_id={}, model={}, latency={}, text_len={}",
            request.reference_id(),
            request.model(),
            request.latency(),
            request.text().len()
        );

        self.client
            .post(&self.endpoint)
            .header(AUTHORIZATION, format!("Bearer {}", request.api_key()))
            .header("model", request.model())
            .json(&FishTtsBody::from_request(request))
    }
}

#[async_trait]
impl SpeechProvider for FishAudioTts {
    fn name(&self) -> &'static str {
        "fish_audio"
    }

    async fn convert(&self, request: &SynthesisRequest) -> Result<AudioPayload, ProviderError> {
        let response = self
            .build_http_request(request)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(describe_transport_error(e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Http {
                status,
                body: truncate_chars(&body, MAX_ERROR_BODY_CHARS),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        if let Some(content_type) = content_type.filter(|ct| is_textual(ct)) {
            return Ok(AudioPayload::Unsupported(content_type));
        }

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| ProviderError::Transport(describe_transport_error(e))))
            .boxed();
        Ok(AudioPayload::Stream(stream))
    }
}

/// Renders a reqwest error together with its full source chain.
///
/// The request URL is left out. Timeouts and connect failures get a
/// recognizable prefix so they can be told apart from other transport errors.
fn describe_transport_error(err: reqwest::Error) -> String {
    let err = err.without_url();
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }

    if err.is_timeout() {
        format!("request timed out: {message}")
    } else if err.is_connect() {
        format!("connection failed: {message}")
    } else {
        message
    }
}

fn is_textual(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence.starts_with("text/") || essence == "application/json" || essence.ends_with("+json")
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
