pub mod lifecycle;
pub mod processor;
pub mod tts;

// Re-export commonly used types for convenience
pub use lifecycle::{
    LifecycleState, ParentWatch, ProbeError, ProcessProbe, ServerLifecycle, ShutdownReason,
    SystemProbe,
};
pub use processor::{BridgeResponse, ProcessOutcome, RequestProcessor};
pub use tts::{
    AudioPayload, FishAudioConfig, FishAudioTts, LatencyMode, ProviderError, SpeechProvider,
    SynthesisAdapter, SynthesisRequest, SynthesizedAudio, TTSError, TTSResult,
};
