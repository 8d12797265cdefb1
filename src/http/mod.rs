//! HTTP server module
//!
//! - `GET /captions` transcript endpoint
//! - Health, version and cache debug endpoints
//! - CORS and request tracing middleware

pub mod handlers;
pub mod routes;

pub use routes::create_router;
