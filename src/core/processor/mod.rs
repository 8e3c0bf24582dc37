//! Turns one raw request body into one response.
//!
//! The processor owns no per-request state, so any number of requests can be
//! processed concurrently. Every outcome is expressed as a [`ProcessOutcome`];
//! nothing here returns an error to the HTTP layer.

mod classify;

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};

pub use classify::{classify, classify_provider_error};
pub(crate) use classify::diagnostic_trace;

use crate::core::lifecycle::{ServerLifecycle, ShutdownReason};
use crate::core::tts::{
    SynthesisAdapter, SynthesisPayload, SynthesisRequest, SynthesizedAudio, TTSError, TTSResult,
};

/// Value of the `command` field that stops the server.
pub const SHUTDOWN_COMMAND: &str = "shutdown";

// =============================================================================
// Response Types
// =============================================================================

/// JSON body returned for every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Base64 (standard alphabet, padded) encoded audio.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
    /// Byte length of the audio before encoding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traceback: Option<String>,
}

impl BridgeResponse {
    pub fn audio(audio: &SynthesizedAudio) -> Self {
        Self {
            success: true,
            message: None,
            audio: Some(STANDARD.encode(audio.bytes())),
            size: Some(audio.size()),
            error: None,
            traceback: None,
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            audio: None,
            size: None,
            error: None,
            traceback: None,
        }
    }

    /// Failure without a category, for requests the bridge never processes.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            audio: None,
            size: None,
            error: Some(message.into()),
            traceback: None,
        }
    }

    pub fn error(error: &TTSError) -> Self {
        Self {
            success: false,
            message: None,
            audio: None,
            size: None,
            error: Some(error.to_string()),
            traceback: error.trace().map(str::to_owned),
        }
    }
}

/// Status code plus body for one processed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutcome {
    pub status: StatusCode,
    pub body: BridgeResponse,
}

impl ProcessOutcome {
    fn ok(body: BridgeResponse) -> Self {
        Self {
            status: StatusCode::OK,
            body,
        }
    }

    fn failure(error: &TTSError) -> Self {
        Self {
            status: error.status_code(),
            body: BridgeResponse::error(error),
        }
    }
}

// =============================================================================
// Request Processor
// =============================================================================

/// Parses, dispatches and answers bridge requests.
pub struct RequestProcessor {
    adapter: SynthesisAdapter,
    deadline: Duration,
    lifecycle: Arc<ServerLifecycle>,
}

impl RequestProcessor {
    pub fn new(
        adapter: SynthesisAdapter,
        deadline: Duration,
        lifecycle: Arc<ServerLifecycle>,
    ) -> Self {
        Self {
            adapter,
            deadline,
            lifecycle,
        }
    }

    /// Per-request synthesis deadline.
    #[inline]
    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Processes one raw request body.
    ///
    /// - Invalid JSON: 500 with `traceback`.
    /// - `{"command": "shutdown"}`: 200, and a shutdown is scheduled that
    ///   does not block this response.
    /// - Anything else is a synthesis request: 200 with audio, or 400 with
    ///   a categorized error.
    pub async fn process(&self, raw_body: &[u8]) -> ProcessOutcome {
        let body: Value = match serde_json::from_slice(raw_body) {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "Rejected request with invalid JSON body");
                let message = e.to_string();
                let trace = diagnostic_trace(
                    anyhow::Error::new(e).context("Failed to parse request body as JSON"),
                );
                return ProcessOutcome::failure(&TTSError::ParseError { message, trace });
            }
        };

        let Some(fields) = body.as_object() else {
            let message = format!("Request body must be a JSON object, got {}", json_kind(&body));
            let trace = diagnostic_trace(anyhow::anyhow!(message.clone()));
            return ProcessOutcome::failure(&TTSError::Internal { message, trace });
        };

        if fields.get("command").and_then(Value::as_str) == Some(SHUTDOWN_COMMAND) {
            info!("Shutdown command received");
            self.lifecycle.schedule_shutdown(ShutdownReason::Command);
            return ProcessOutcome::ok(BridgeResponse::message("Shutting down"));
        }

        match self.synthesize(body).await {
            Ok(audio) => {
                debug!(size = audio.size(), "Synthesis succeeded");
                ProcessOutcome::ok(BridgeResponse::audio(&audio))
            }
            Err(e) => {
                warn!(category = e.category(), error = %e, "Synthesis failed");
                ProcessOutcome::failure(&e)
            }
        }
    }

    async fn synthesize(&self, body: Value) -> TTSResult<SynthesizedAudio> {
        let payload: SynthesisPayload = serde_json::from_value(body).map_err(|e| {
            let message = e.to_string();
            let trace = diagnostic_trace(anyhow::Error::new(e).context("Invalid synthesis request"));
            TTSError::Generic { message, trace }
        })?;
        let request = SynthesisRequest::from_payload(payload)?;

        debug!(request = ?request, "Processing synthesis request");

        let reference_id = request.reference_id().to_string();
        let provider = self.adapter.provider_name();
        let adapter = self.adapter.clone();
        let deadline = self.deadline;

        // Runs on its own task so a panicking provider fails only this request.
        let task = tokio::spawn(async move { adapter.synthesize(&request, deadline).await });

        match task.await {
            Ok(result) => result.map_err(|e| classify(e, &reference_id, provider)),
            Err(join_error) if join_error.is_panic() => {
                let message = panic_message(join_error.into_panic().as_ref());
                error!(provider, panic = %message, "Synthesis task panicked");
                let trace = diagnostic_trace(
                    anyhow::anyhow!(message.clone()).context("Synthesis task panicked"),
                );
                Err(TTSError::Internal { message, trace })
            }
            Err(join_error) => {
                let message = join_error.to_string();
                let trace = diagnostic_trace(anyhow::Error::new(join_error));
                Err(TTSError::Internal { message, trace })
            }
        }
    }
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::lifecycle::LifecycleState;
    use crate::core::tts::{AudioPayload, ProviderError, SpeechProvider};
    use async_trait::async_trait;
    use bytes::Bytes;

    struct FixedProvider {
        result: fn() -> Result<AudioPayload, ProviderError>,
    }

    #[async_trait]
    impl SpeechProvider for FixedProvider {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn convert(&self, _request: &SynthesisRequest) -> Result<AudioPayload, ProviderError> {
            (self.result)()
        }
    }

    struct PanickingProvider;

    #[async_trait]
    impl SpeechProvider for PanickingProvider {
        fn name(&self) -> &'static str {
            "panicking"
        }

        async fn convert(&self, _request: &SynthesisRequest) -> Result<AudioPayload, ProviderError> {
            panic!("provider exploded");
        }
    }

    fn processor_with(provider: Arc<dyn SpeechProvider>) -> (RequestProcessor, Arc<ServerLifecycle>) {
        let lifecycle = Arc::new(ServerLifecycle::new());
        lifecycle.mark_ready();
        let processor = RequestProcessor::new(
            SynthesisAdapter::new(provider),
            Duration::from_secs(5),
            Arc::clone(&lifecycle),
        );
        (processor, lifecycle)
    }

    fn fixed(result: fn() -> Result<AudioPayload, ProviderError>) -> (RequestProcessor, Arc<ServerLifecycle>) {
        processor_with(Arc::new(FixedProvider { result }))
    }

    const VALID: &[u8] = br#"{"api_key":"k","text":"Hello","reference_id":"voice-1"}"#;

    #[tokio::test]
    async fn test_process_success_encodes_audio() {
        let (processor, _) = fixed(|| Ok(AudioPayload::Bytes(Bytes::from_static(b"RIFFWAVE"))));
        let outcome = processor.process(VALID).await;

        assert_eq!(outcome.status, StatusCode::OK);
        assert!(outcome.body.success);
        assert_eq!(outcome.body.size, Some(8));
        let decoded = STANDARD.decode(outcome.body.audio.unwrap()).unwrap();
        assert_eq!(decoded, b"RIFFWAVE");
    }

    #[tokio::test]
    async fn test_process_invalid_json_is_server_error() {
        let (processor, _) = fixed(|| Ok(AudioPayload::Bytes(Bytes::from_static(b"x"))));
        let outcome = processor.process(b"{not json").await;

        assert_eq!(outcome.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!outcome.body.success);
        assert!(outcome.body.error.is_some());
        assert!(outcome.body.traceback.is_some());
    }

    #[tokio::test]
    async fn test_process_non_object_is_server_error() {
        let (processor, _) = fixed(|| Ok(AudioPayload::Bytes(Bytes::from_static(b"x"))));
        let outcome = processor.process(b"[1, 2, 3]").await;

        assert_eq!(outcome.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            outcome.body.error.as_deref(),
            Some("Request body must be a JSON object, got an array")
        );
    }

    #[tokio::test]
    async fn test_process_missing_parameters() {
        let (processor, _) = fixed(|| Ok(AudioPayload::Bytes(Bytes::from_static(b"x"))));
        let outcome = processor
            .process(br#"{"api_key":"k","text":"","reference_id":"voice-1"}"#)
            .await;

        assert_eq!(outcome.status, StatusCode::BAD_REQUEST);
        assert_eq!(
            outcome.body.error.as_deref(),
            Some("Missing required parameters: api_key, text, or reference_id")
        );
        assert!(outcome.body.traceback.is_none());
    }

    #[tokio::test]
    async fn test_process_wrong_field_type_is_generic() {
        let (processor, _) = fixed(|| Ok(AudioPayload::Bytes(Bytes::from_static(b"x"))));
        let outcome = processor
            .process(br#"{"api_key":"k","text":"t","reference_id":"r","speed":"fast"}"#)
            .await;

        assert_eq!(outcome.status, StatusCode::BAD_REQUEST);
        assert!(outcome.body.traceback.is_some());
    }

    #[tokio::test]
    async fn test_process_unknown_latency_is_generic() {
        let (processor, _) = fixed(|| panic!("provider must not be called"));
        let outcome = processor
            .process(br#"{"api_key":"k","text":"t","reference_id":"r","latency":"turbo"}"#)
            .await;

        assert_eq!(outcome.status, StatusCode::BAD_REQUEST);
        assert!(!outcome.body.success);
        assert!(
            outcome
                .body
                .error
                .as_deref()
                .is_some_and(|e| e.contains("unknown variant `turbo`"))
        );
        assert!(outcome.body.traceback.is_some());
    }

    #[tokio::test]
    async fn test_process_classifies_provider_error() {
        let (processor, _) = fixed(|| {
            Err(ProviderError::Http {
                status: StatusCode::UNAUTHORIZED,
                body: "{\"message\":\"invalid token\"}".to_string(),
            })
        });
        let outcome = processor.process(VALID).await;

        assert_eq!(outcome.status, StatusCode::BAD_REQUEST);
        assert_eq!(
            outcome.body.error.as_deref(),
            Some("Invalid API key. Please check your Fish Audio API key.")
        );
    }

    #[tokio::test]
    async fn test_process_empty_audio() {
        let (processor, _) = fixed(|| Ok(AudioPayload::Bytes(Bytes::new())));
        let outcome = processor.process(VALID).await;

        assert_eq!(outcome.status, StatusCode::BAD_REQUEST);
        assert_eq!(outcome.body.error.as_deref(), Some("Audio data is empty"));
    }

    #[tokio::test]
    async fn test_process_provider_panic_is_contained() {
        let (processor, lifecycle) = processor_with(Arc::new(PanickingProvider));
        let outcome = processor.process(VALID).await;

        assert_eq!(outcome.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(outcome.body.error.as_deref(), Some("provider exploded"));
        assert_eq!(lifecycle.state(), LifecycleState::Ready);
    }

    #[tokio::test]
    async fn test_process_shutdown_command() {
        let (processor, lifecycle) = fixed(|| Ok(AudioPayload::Bytes(Bytes::from_static(b"x"))));
        let outcome = processor.process(br#"{"command":"shutdown"}"#).await;

        assert_eq!(outcome.status, StatusCode::OK);
        assert_eq!(
            serde_json::to_value(&outcome.body).unwrap(),
            serde_json::json!({"success": true, "message": "Shutting down"})
        );

        lifecycle.cancelled().await;
        assert_eq!(lifecycle.state(), LifecycleState::ShuttingDown);
        assert_eq!(lifecycle.shutdown_reason(), Some(&ShutdownReason::Command));
    }

    #[tokio::test]
    async fn test_process_other_command_is_synthesis() {
        let (processor, lifecycle) = fixed(|| Ok(AudioPayload::Bytes(Bytes::from_static(b"x"))));
        let outcome = processor.process(br#"{"command":"restart"}"#).await;

        assert_eq!(outcome.status, StatusCode::BAD_REQUEST);
        assert_eq!(lifecycle.state(), LifecycleState::Ready);
    }

    #[test]
    fn test_success_body_shape() {
        let audio = SynthesizedAudio::new(Bytes::from_static(b"abc")).unwrap();
        let value = serde_json::to_value(BridgeResponse::audio(&audio)).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"success": true, "audio": "YWJj", "size": 3})
        );
    }
}
