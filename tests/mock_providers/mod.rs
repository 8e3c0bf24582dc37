//! Scripted speech provider for integration tests.
//!
//! The request text drives the behaviour:
//! - `"panic"` panics inside the provider
//! - `"error:<message>"` fails with `ProviderError::Other(<message>)`
//! - `"empty"` returns zero bytes
//! - anything else returns `RIFF` followed by the text bytes
//!
//! An optional delay function lets tests hold individual requests open.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use tts_bridge::core::tts::{AudioPayload, ProviderError, SpeechProvider, SynthesisRequest};
use tts_bridge::{BoundServer, ServerConfig};

pub struct ScriptedProvider {
    delay_for: fn(&str) -> Duration,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::with_delays(|_| Duration::ZERO)
    }

    pub fn with_delays(delay_for: fn(&str) -> Duration) -> Self {
        Self {
            delay_for,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn convert(&self, request: &SynthesisRequest) -> Result<AudioPayload, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let delay = (self.delay_for)(request.text());
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match request.text() {
            "panic" => panic!("scripted provider panic"),
            "empty" => Ok(AudioPayload::Bytes(Bytes::new())),
            text => match text.strip_prefix("error:") {
                Some(message) => Err(ProviderError::Other(message.to_string())),
                None => Ok(AudioPayload::Bytes(Bytes::from(expected_audio(text)))),
            },
        }
    }
}

/// Audio bytes the scripted provider returns for `text`.
pub fn expected_audio(text: &str) -> Vec<u8> {
    let mut audio = b"RIFF".to_vec();
    audio.extend_from_slice(text.as_bytes());
    audio
}

/// Loopback config on an ephemeral port with short lifecycle timings.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        port: 0,
        parent_poll_interval: Duration::from_millis(50),
        shutdown_grace: Duration::from_secs(10),
        synthesis_timeout: Duration::from_secs(5),
        ..Default::default()
    }
}

/// Synthesis request body for `text`.
pub fn synthesis_body(text: &str) -> serde_json::Value {
    serde_json::json!({
        "api_key": "test-key",
        "text": text,
        "reference_id": "voice-1",
    })
}

/// HTTP client that never routes loopback traffic through a proxy.
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .build()
        .expect("build test client")
}

pub fn bridge_url(addr: SocketAddr) -> String {
    format!("http://{addr}/")
}

/// Bind a server around `provider` and start serving it in the background.
pub async fn spawn_server(
    config: ServerConfig,
    provider: Arc<dyn SpeechProvider>,
) -> (SocketAddr, Arc<tts_bridge::ServerLifecycle>, tokio::task::JoinHandle<tts_bridge::AppResult<()>>) {
    let server = BoundServer::bind(config, provider)
        .await
        .expect("bind test server");
    let addr = server.local_addr();
    let lifecycle = server.lifecycle();
    let handle = tokio::spawn(server.serve());
    (addr, lifecycle, handle)
}
