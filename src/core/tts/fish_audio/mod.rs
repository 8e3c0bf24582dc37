//! Fish Audio TTS provider implementation.
//!
//! One HTTP POST per synthesis request, with the complete audio returned in
//! the response body.
//!
//! # Example
//!
//! ```rust,ignore
//! use tts_bridge::core::tts::fish_audio::{FishAudioConfig, FishAudioTts};
//! use tts_bridge::core::tts::{SpeechProvider, SynthesisRequest};
//!
//! let provider = FishAudioTts::new(&FishAudioConfig::default())?;
//! let request = SynthesisRequest::new("your-fish-audio-key", "Hello!", "voice-model-id");
//! let audio = provider.convert(&request).await?.collect().await?;
//! ```
//!
//! # API Reference
//!
//! - Synthesis: `POST https://api.fish.audio/v1/tts`
//!
//! # Authentication
//!
//! Fish Audio uses bearer authentication via the `Authorization` header. The
//! synthesis model is selected with a separate `model` header.

pub mod config;
pub mod provider;

pub use config::{FishAudioConfig, FishTtsBody, Prosody};
pub use provider::FishAudioTts;

// =============================================================================
// API Constants
// =============================================================================

/// Fish Audio API base URL.
pub const FISH_AUDIO_BASE_URL: &str = "https://api.fish.audio";

/// Path of the synthesis endpoint, relative to the base URL.
pub const TTS_PATH: &str = "/v1/tts";

/// Output container requested from the API.
pub const OUTPUT_FORMAT: &str = "wav";

/// Volume adjustment sent with every request (no change).
pub const DEFAULT_VOLUME: f32 = 0.0;

/// Default TCP connect timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Maximum number of error-body characters kept in provider errors.
pub const MAX_ERROR_BODY_CHARS: usize = 512;
