//! Bounded, single-attempt synthesis on top of a [`SpeechProvider`].

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::debug;

use super::base::{SpeechProvider, SynthesisRequest, SynthesizedAudio, TTSError, TTSResult};

/// Runs one provider call per request under a hard deadline.
///
/// The deadline covers the whole call including body transfer. On expiry the
/// in-flight call is dropped and [`TTSError::Timeout`] is returned. There are
/// no retries.
#[derive(Clone)]
pub struct SynthesisAdapter {
    provider: Arc<dyn SpeechProvider>,
}

impl SynthesisAdapter {
    pub fn new(provider: Arc<dyn SpeechProvider>) -> Self {
        Self { provider }
    }

    #[inline]
    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Synthesizes `request`, giving up after `deadline`.
    ///
    /// Provider failures are returned as [`TTSError::Provider`] for the caller
    /// to classify.
    pub async fn synthesize(
        &self,
        request: &SynthesisRequest,
        deadline: Duration,
    ) -> TTSResult<SynthesizedAudio> {
        let attempt = async {
            let payload = self.provider.convert(request).await?;
            payload.collect().await
        };

        let bytes = match timeout(deadline, attempt).await {
            Ok(result) => result?,
            Err(_) => {
                debug!(
                    provider = self.provider.name(),
                    deadline_ms = deadline.as_millis() as u64,
                    "Synthesis deadline elapsed"
                );
                return Err(TTSError::Timeout {
                    seconds: deadline.as_secs_f64(),
                });
            }
        };

        SynthesizedAudio::new(bytes).ok_or(TTSError::EmptyAudio)
    }
}
