use std::sync::Arc;

use crate::config::ServerConfig;
use crate::core::lifecycle::ServerLifecycle;
use crate::core::processor::RequestProcessor;
use crate::core::tts::{SpeechProvider, SynthesisAdapter};

/// Application state shared by all request handlers.
pub struct AppState {
    pub config: ServerConfig,
    pub processor: RequestProcessor,
    pub lifecycle: Arc<ServerLifecycle>,
}

impl AppState {
    pub fn new(
        config: ServerConfig,
        provider: Arc<dyn SpeechProvider>,
        lifecycle: Arc<ServerLifecycle>,
    ) -> Arc<Self> {
        let processor = RequestProcessor::new(
            SynthesisAdapter::new(provider),
            config.synthesis_timeout,
            Arc::clone(&lifecycle),
        );

        Arc::new(Self {
            config,
            processor,
            lifecycle,
        })
    }
}
