//! HTTP request handlers
//!
//! - `api` - Health check endpoint and panic fallback
//! - `synthesize` - Synthesis and shutdown-command endpoint, plus the catch-all

pub mod api;
pub mod synthesize;

pub use api::health_check;
pub use synthesize::{fallback_handler, synthesize_handler};
