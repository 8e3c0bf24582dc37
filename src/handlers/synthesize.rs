use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{State, rejection::BytesRejection},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::core::processor::{BridgeResponse, diagnostic_trace};
use crate::core::tts::TTSError;
use crate::state::AppState;

/// Bridge endpoint: `POST /`.
///
/// The body is read raw and handed to the request processor, which answers
/// every input (including malformed JSON) with a JSON body. A body that
/// cannot be read at all is reported as a 500 fault in the same shape.
pub async fn synthesize_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            warn!(error = %rejection, "Failed to read request body");
            let fault = TTSError::Internal {
                message: rejection.body_text(),
                trace: diagnostic_trace(
                    anyhow::Error::new(rejection).context("Failed to read request body"),
                ),
            };
            return (fault.status_code(), Json(BridgeResponse::error(&fault))).into_response();
        }
    };

    let outcome = state.processor.process(&body).await;
    (outcome.status, Json(outcome.body)).into_response()
}

/// Catch-all for unmatched paths and methods.
///
/// `POST` on any path is a bridge request. Other methods get a 405 in the
/// bridge's JSON error shape.
pub async fn fallback_handler(
    method: Method,
    state: State<Arc<AppState>>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    if method == Method::POST {
        return synthesize_handler(state, body).await;
    }

    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(BridgeResponse::rejected(format!("Unsupported method: {method}"))),
    )
        .into_response()
}
