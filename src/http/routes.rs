//! Axum router configuration

use axum::{
    http::{header, Method},
    routing::get,
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

use super::handlers::{cache_stats, captions, health_check, version_check};

/// Create the Axum router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    let router = Router::new()
        .route("/captions", get(captions))
        // Health and version endpoints
        .route("/health", get(health_check))
        .route("/version", get(version_check))
        // Debug endpoints
        .route("/debug/cache", get(cache_stats))
        .layer(TraceLayer::new_for_http());

    let router = if state.config.cors_enabled {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::OPTIONS, Method::HEAD])
            .allow_headers([header::ACCEPT, header::CONTENT_TYPE, header::ORIGIN])
            .expose_headers([super::handlers::X_CACHE])
            .max_age(Duration::from_secs(3600));
        router.layer(cors)
    } else {
        router
    };

    router.with_state(state)
}
