mod adapter;
mod base;
pub mod fish_audio;

pub use adapter::SynthesisAdapter;
pub use base::{
    AudioPayload, DEFAULT_MODEL, DEFAULT_SPEED, DEFAULT_TEMPERATURE, DEFAULT_TOP_P, LatencyMode,
    ProviderError, SpeechProvider, SynthesisPayload, SynthesisRequest, SynthesizedAudio, TTSError,
    TTSResult,
};
pub use fish_audio::{FISH_AUDIO_BASE_URL, FishAudioConfig, FishAudioTts};
