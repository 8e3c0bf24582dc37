//! Fish Audio configuration and request body types.

use std::time::Duration;

use serde::Serialize;

use super::{
    DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_VOLUME, FISH_AUDIO_BASE_URL, OUTPUT_FORMAT, TTS_PATH,
};
use crate::core::tts::base::{LatencyMode, SynthesisRequest};

// =============================================================================
// Provider Configuration
// =============================================================================

/// Connection settings for the Fish Audio API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FishAudioConfig {
    /// API base URL without a trailing slash.
    pub base_url: String,

    /// TCP connect timeout for API calls.
    pub connect_timeout: Duration,
}

impl Default for FishAudioConfig {
    fn default() -> Self {
        Self {
            base_url: FISH_AUDIO_BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }
}

impl FishAudioConfig {
    /// Full URL of the synthesis endpoint.
    pub fn tts_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), TTS_PATH)
    }
}

// =============================================================================
// Request Body
// =============================================================================

/// Prosody controls nested in the request body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prosody {
    pub speed: f32,
    pub volume: f32,
}

/// JSON body of `POST /v1/tts`.
///
/// ```json
/// {
///   "text": "Hello",
///   "reference_id": "voice-model-id",
///   "format": "wav",
///   "latency": "normal",
///   "normalize": false,
///   "temperature": 0.9,
///   "top_p": 0.9,
///   "prosody": { "speed": 1.0, "volume": 0.0 }
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct FishTtsBody<'a> {
    pub text: &'a str,
    pub reference_id: &'a str,
    pub format: &'static str,
    pub latency: LatencyMode,
    pub normalize: bool,
    pub temperature: f32,
    pub top_p: f32,
    pub prosody: Prosody,
}

impl<'a> FishTtsBody<'a> {
    pub fn from_request(request: &'a SynthesisRequest) -> Self {
        Self {
            text: request.text(),
            reference_id: request.reference_id(),
            format: OUTPUT_FORMAT,
            latency: request.latency(),
            normalize: request.normalize(),
            temperature: request.temperature(),
            top_p: request.top_p(),
            prosody: Prosody {
                speed: request.speed(),
                volume: DEFAULT_VOLUME,
            },
        }
    }
}
