//! Web server module for job submission.
//!
//! This module provides a thin HTTP layer that:
//! - Authorizes and validates bulk messaging requests
//! - Stores uploaded attachments until the dispatcher reads them
//! - Hands jobs to the dispatch queue and returns immediately

pub mod auth;
pub mod handlers;
pub mod upload_store;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::Config;

pub use auth::{verify_api_key, AuthorizationError};
pub use handlers::{health, send_message, AppState, HealthResponse, SendMessageRequest, SendMessageResponse};

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/send-message", post(send_message))
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .layer(cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::PUT,
            Method::PATCH,
            Method::POST,
            Method::DELETE,
        ])
        .allow_headers(Any);

    match &config.cors_allowed_origins {
        Some(origins) if !origins.is_empty() => {
            let origins: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|o| HeaderValue::from_str(o).ok())
                .collect();
            layer.allow_origin(AllowOrigin::list(origins))
        }
        _ => layer.allow_origin(Any),
    }
}
