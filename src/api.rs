//! HTTP API for the guessing game
//!
//! Session-based endpoints to start a game, answer questions, read the
//! engine's guess and give feedback on it.

mod handlers;
mod types;


pub use handlers::create_router;

use crate::game::GameService;
use axum::http::{HeaderValue, Method};
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub games: Arc<GameService>,
}

impl AppState {
    pub fn new(games: Arc<GameService>) -> Self {
        Self { games }
    }
}

/// CORS restricted to an origin allow-list, with credentials
///
/// Wildcard headers cannot be combined with credentials, so request headers
/// are mirrored instead.
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}
