use std::any::Any;
use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use crate::core::processor::{BridgeResponse, panic_message};
use crate::core::tts::TTSError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub state: &'static str,
}

/// Liveness probe: `GET /`.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        state: state.lifecycle.state().as_str(),
    })
}

/// Converts a panic escaping a handler into the bridge's 500 error shape.
pub fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let message = panic_message(payload.as_ref());
    error!(panic = %message, "Request handler panicked");

    let fault = TTSError::Internal {
        trace: format!("Request handler panicked: {message}"),
        message,
    };
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(BridgeResponse::error(&fault)),
    )
        .into_response()
}
