use axum::{Router, extract::DefaultBodyLimit, routing::post};
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;

use crate::handlers::{api, synthesize};
use crate::state::AppState;

/// Create the bridge router
///
/// Both endpoints live at `/`: `POST` for synthesis and commands, `GET` for
/// liveness. `POST` to any other path is handled the same way; other
/// unmatched requests get a JSON 405. No request logging layer is installed.
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/",
            post(synthesize::synthesize_handler).get(api::health_check),
        )
        .fallback(synthesize::fallback_handler)
        .method_not_allowed_fallback(synthesize::fallback_handler)
}

/// Build the complete application with state and panic recovery applied.
///
/// Request bodies are not size-limited; the only clients are local.
pub fn create_app(state: Arc<AppState>) -> Router {
    create_api_router()
        .layer(DefaultBodyLimit::disable())
        .with_state(state)
        .layer(CatchPanicLayer::custom(api::panic_response))
}
