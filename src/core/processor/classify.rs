//! Maps raw provider failures onto user-facing error categories.
//!
//! Classification is by substring on the provider's rendered error text and
//! the first matching rule wins:
//!
//! | Match | Category |
//! |-------|----------|
//! | `401` or `Unauthorized` | [`TTSError::Unauthorized`] |
//! | `403` or `Forbidden` | [`TTSError::Forbidden`] |
//! | `404` or `Not Found` | [`TTSError::NotFound`] |
//! | `429` or `Too Many Requests` | [`TTSError::RateLimited`] |
//! | `timeout` or `timed out` (case-insensitive) | [`TTSError::NetworkTimeout`] |
//! | `connection` (case-insensitive) | [`TTSError::ConnectionError`] |
//! | anything else | [`TTSError::Generic`] with a diagnostic trace |

use crate::core::tts::{ProviderError, TTSError};

/// Classifies `error` if it is still a raw provider failure.
///
/// Already-categorized errors are returned unchanged.
pub fn classify(error: TTSError, reference_id: &str, provider: &str) -> TTSError {
    match error {
        TTSError::Provider(raw) => classify_provider_error(raw, reference_id, provider),
        other => other,
    }
}

pub fn classify_provider_error(raw: ProviderError, reference_id: &str, provider: &str) -> TTSError {
    let message = raw.to_string();
    let lowered = message.to_lowercase();

    if message.contains("401") || message.contains("Unauthorized") {
        TTSError::Unauthorized
    } else if message.contains("403") || message.contains("Forbidden") {
        TTSError::Forbidden
    } else if message.contains("404") || message.contains("Not Found") {
        TTSError::NotFound(reference_id.to_string())
    } else if message.contains("429") || message.contains("Too Many Requests") {
        TTSError::RateLimited
    } else if lowered.contains("timeout") || lowered.contains("timed out") {
        TTSError::NetworkTimeout(message)
    } else if lowered.contains("connection") {
        TTSError::ConnectionError(message)
    } else {
        let trace = diagnostic_trace(
            anyhow::Error::new(raw).context(format!("{provider} synthesis request failed")),
        );
        TTSError::Generic { message, trace }
    }
}

/// Renders an error and its cause chain for the `traceback` response field.
pub(crate) fn diagnostic_trace(error: anyhow::Error) -> String {
    format!("{error:?}")
}
