//! Core synthesis types shared by the adapter, the request processor and
//! speech providers.
//!
//! A [`SynthesisPayload`] is the loosely-typed wire form of a request body.
//! It is promoted to a validated [`SynthesisRequest`] before any provider
//! is contacted, and providers answer with an [`AudioPayload`] that the
//! adapter normalizes into [`SynthesizedAudio`].

use std::fmt;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures_util::stream::{BoxStream, StreamExt};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::Zeroize;

// =============================================================================
// Request Defaults
// =============================================================================

/// Default synthesis model.
pub const DEFAULT_MODEL: &str = "s1";

/// Default speaking rate multiplier.
pub const DEFAULT_SPEED: f32 = 1.0;

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.9;

/// Default nucleus sampling threshold.
pub const DEFAULT_TOP_P: f32 = 0.9;

// =============================================================================
// Latency Mode
// =============================================================================

/// Provider latency/quality trade-off.
///
/// Only the modes below are accepted. Any other `latency` string fails
/// request deserialization and is answered as a generic 400 error without
/// contacting the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LatencyMode {
    /// Best quality (default).
    #[default]
    Normal,
    /// Lower latency at a small quality cost.
    Balanced,
}

impl LatencyMode {
    /// Returns the wire string for this mode.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Balanced => "balanced",
        }
    }
}

impl fmt::Display for LatencyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Synthesis Payload (wire form)
// =============================================================================

/// Request body as received from the host application.
///
/// Every field is optional here; required fields are enforced by
/// [`SynthesisRequest::from_payload`]. Unknown fields are ignored.
#[derive(Default, Deserialize)]
pub struct SynthesisPayload {
    pub api_key: Option<String>,
    pub text: Option<String>,
    pub reference_id: Option<String>,
    pub model: Option<String>,
    pub latency: Option<LatencyMode>,
    pub speed: Option<f32>,
    pub normalize: Option<bool>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
}

impl Drop for SynthesisPayload {
    fn drop(&mut self) {
        if let Some(key) = self.api_key.as_mut() {
            key.zeroize();
        }
    }
}

// =============================================================================
// Synthesis Request
// =============================================================================

/// A validated synthesis request with defaults applied.
///
/// The API key is wiped from memory when the request is dropped and is never
/// printed by the `Debug` implementation.
#[derive(Clone)]
pub struct SynthesisRequest {
    api_key: String,
    text: String,
    reference_id: String,
    model: String,
    latency: LatencyMode,
    speed: f32,
    normalize: bool,
    temperature: f32,
    top_p: f32,
}

impl SynthesisRequest {
    /// Creates a request with all optional parameters at their defaults.
    pub fn new(
        api_key: impl Into<String>,
        text: impl Into<String>,
        reference_id: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            text: text.into(),
            reference_id: reference_id.into(),
            model: DEFAULT_MODEL.to_string(),
            latency: LatencyMode::default(),
            speed: DEFAULT_SPEED,
            normalize: false,
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
        }
    }

    /// Promotes a wire payload into a validated request.
    ///
    /// # Errors
    ///
    /// Returns [`TTSError::MissingParameters`] when `api_key`, `text` or
    /// `reference_id` is absent or empty.
    pub fn from_payload(mut payload: SynthesisPayload) -> TTSResult<Self> {
        let api_key = take_non_empty(&mut payload.api_key);
        let text = take_non_empty(&mut payload.text);
        let reference_id = take_non_empty(&mut payload.reference_id);

        let (Some(api_key), Some(text), Some(reference_id)) = (api_key, text, reference_id) else {
            return Err(TTSError::MissingParameters);
        };

        let mut request = Self::new(api_key, text, reference_id);
        if let Some(model) = payload.model.take().filter(|m| !m.is_empty()) {
            request.model = model;
        }
        request.latency = payload.latency.unwrap_or_default();
        request.speed = payload.speed.unwrap_or(DEFAULT_SPEED);
        request.normalize = payload.normalize.unwrap_or(false);
        request.temperature = payload.temperature.unwrap_or(DEFAULT_TEMPERATURE);
        request.top_p = payload.top_p.unwrap_or(DEFAULT_TOP_P);
        Ok(request)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_latency(mut self, latency: LatencyMode) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    #[inline]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[inline]
    pub fn reference_id(&self) -> &str {
        &self.reference_id
    }

    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[inline]
    pub fn latency(&self) -> LatencyMode {
        self.latency
    }

    #[inline]
    pub fn speed(&self) -> f32 {
        self.speed
    }

    #[inline]
    pub fn normalize(&self) -> bool {
        self.normalize
    }

    #[inline]
    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    #[inline]
    pub fn top_p(&self) -> f32 {
        self.top_p
    }
}

fn take_non_empty(field: &mut Option<String>) -> Option<String> {
    field.take().filter(|value| !value.is_empty())
}

impl Drop for SynthesisRequest {
    fn drop(&mut self) {
        self.api_key.zeroize();
    }
}

impl fmt::Debug for SynthesisRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SynthesisRequest")
            .field("api_key", &"[REDACTED]")
            .field("text_len", &self.text.len())
            .field("reference_id", &self.reference_id)
            .field("model", &self.model)
            .field("latency", &self.latency)
            .field("speed", &self.speed)
            .field("normalize", &self.normalize)
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .finish()
    }
}

// =============================================================================
// Synthesized Audio
// =============================================================================

/// Complete, non-empty audio produced by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedAudio {
    bytes: Bytes,
}

impl SynthesizedAudio {
    /// Wraps `bytes`, returning `None` when there is no audio.
    pub fn new(bytes: impl Into<Bytes>) -> Option<Self> {
        let bytes = bytes.into();
        (!bytes.is_empty()).then_some(Self { bytes })
    }

    #[inline]
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Byte length of the raw (un-encoded) audio.
    #[inline]
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }
}

// =============================================================================
// Provider Output
// =============================================================================

/// Raw result shapes a provider may hand back.
pub enum AudioPayload {
    /// One contiguous buffer.
    Bytes(Bytes),
    /// Pre-split chunks, concatenated in order.
    Chunks(Vec<Bytes>),
    /// Chunks arriving over time, drained to completion.
    Stream(BoxStream<'static, Result<Bytes, ProviderError>>),
    /// A result that is not audio, described by its type.
    Unsupported(String),
}

impl AudioPayload {
    /// Drains the payload into one contiguous buffer.
    ///
    /// # Errors
    ///
    /// [`TTSError::InvalidResponseType`] for [`AudioPayload::Unsupported`],
    /// or the provider error raised mid-stream.
    pub async fn collect(self) -> TTSResult<Bytes> {
        match self {
            Self::Bytes(bytes) => Ok(bytes),
            Self::Chunks(chunks) => {
                let total = chunks.iter().map(Bytes::len).sum();
                let mut buffer = BytesMut::with_capacity(total);
                for chunk in chunks {
                    buffer.extend_from_slice(&chunk);
                }
                Ok(buffer.freeze())
            }
            Self::Stream(mut stream) => {
                let mut buffer = BytesMut::new();
                while let Some(chunk) = stream.next().await {
                    buffer.extend_from_slice(&chunk?);
                }
                Ok(buffer.freeze())
            }
            Self::Unsupported(kind) => Err(TTSError::InvalidResponseType(kind)),
        }
    }
}

impl fmt::Debug for AudioPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Self::Chunks(chunks) => f.debug_tuple("Chunks").field(&chunks.len()).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
            Self::Unsupported(kind) => f.debug_tuple("Unsupported").field(kind).finish(),
        }
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Unclassified failure reported by a speech provider.
///
/// The display text is what gets classified, so HTTP failures render as
/// `"<code> <reason>: <body>"`.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{status}: {body}")]
    Http { status: StatusCode, body: String },

    #[error("{0}")]
    Transport(String),

    #[error("{0}")]
    Other(String),
}

/// Synthesis failure surfaced to the host application.
///
/// The `Display` text of each variant is the exact user-facing message.
#[derive(Debug, Error)]
pub enum TTSError {
    #[error("Missing required parameters: api_key, text, or reference_id")]
    MissingParameters,

    #[error(
        "TTS generation timed out after {seconds} seconds. This may be due to slow network or Fish Audio API issues."
    )]
    Timeout { seconds: f64 },

    #[error("Invalid API key. Please check your Fish Audio API key.")]
    Unauthorized,

    #[error("Access forbidden. Your API key may not have permission to use this feature.")]
    Forbidden,

    #[error("Reference voice ID '{0}' not found. Please check the voice ID.")]
    NotFound(String),

    #[error("Rate limit exceeded. Please wait a moment and try again.")]
    RateLimited,

    #[error("Network timeout: {0}. Check your internet connection.")]
    NetworkTimeout(String),

    #[error("Connection error: {0}. Check your internet connection and firewall.")]
    ConnectionError(String),

    #[error("Invalid audio data type: {0}")]
    InvalidResponseType(String),

    #[error("Audio data is empty")]
    EmptyAudio,

    /// The request body was not valid JSON.
    #[error("{message}")]
    ParseError { message: String, trace: String },

    /// Anything the other categories do not describe.
    #[error("{message}")]
    Generic { message: String, trace: String },

    /// A fault inside the bridge itself (panicked task, malformed body shape).
    #[error("{message}")]
    Internal { message: String, trace: String },

    /// Raw provider failure awaiting classification.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl TTSError {
    /// HTTP status used when this error is reported to the host.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ParseError { .. } | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Diagnostic trace, present only for uncategorized failures.
    pub fn trace(&self) -> Option<&str> {
        match self {
            Self::ParseError { trace, .. }
            | Self::Generic { trace, .. }
            | Self::Internal { trace, .. } => Some(trace),
            _ => None,
        }
    }

    /// Short machine-readable category name, used in logs.
    pub const fn category(&self) -> &'static str {
        match self {
            Self::MissingParameters => "missing_parameters",
            Self::Timeout { .. } => "timeout",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::RateLimited => "rate_limited",
            Self::NetworkTimeout(_) => "network_timeout",
            Self::ConnectionError(_) => "connection_error",
            Self::InvalidResponseType(_) => "invalid_response_type",
            Self::EmptyAudio => "empty_audio",
            Self::ParseError { .. } => "parse_error",
            Self::Generic { .. } => "generic",
            Self::Internal { .. } => "internal",
            Self::Provider(_) => "provider",
        }
    }
}

/// Result type for synthesis operations.
pub type TTSResult<T> = Result<T, TTSError>;

// =============================================================================
// Provider Trait
// =============================================================================

/// A remote speech-synthesis service.
///
/// Implementations perform exactly one attempt per call and report failures
/// unclassified; retries and categorization belong to the caller.
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    /// Stable provider name used in logs and diagnostics.
    fn name(&self) -> &'static str;

    /// Requests audio for `request`.
    async fn convert(&self, request: &SynthesisRequest) -> Result<AudioPayload, ProviderError>;
}
