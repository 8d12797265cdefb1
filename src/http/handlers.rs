//! HTTP request handlers

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::captions::CaptionRequest;
use crate::error::CaptionError;
use crate::state::AppState;

/// Response header reporting cache participation
pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/// Language used when the request names none
pub const DEFAULT_LANG: &str = "en";

/// HTTP error type
#[derive(Debug)]
pub enum HttpError {
    BadRequest(String),
    InternalError(String),
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            HttpError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            HttpError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<CaptionError> for HttpError {
    fn from(err: CaptionError) -> Self {
        if err.is_client_error() {
            HttpError::BadRequest(err.to_string())
        } else {
            HttpError::InternalError(err.to_string())
        }
    }
}

/// Raw `/captions` query. Everything is optional so that a missing `video`
/// becomes our own 400 rather than an extractor rejection.
#[derive(Debug, Default, Deserialize)]
pub struct CaptionQuery {
    pub video: Option<String>,
    pub lang: Option<String>,
    pub screenshot: Option<String>,
    pub nocache: Option<String>,
}

impl CaptionQuery {
    pub fn into_request(self) -> Result<CaptionRequest, HttpError> {
        let video_id = self
            .video
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| HttpError::BadRequest("video query parameter is required".to_string()))?;
        let lang = self
            .lang
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| DEFAULT_LANG.to_string());

        Ok(CaptionRequest {
            video_id,
            lang,
            screenshot: flag(self.screenshot.as_deref()),
            bypass_cache: flag(self.nocache.as_deref()),
        })
    }
}

/// `true` and `1` are on, anything else is off
fn flag(value: Option<&str>) -> bool {
    matches!(value, Some("true") | Some("1"))
}

/// Caption transcript endpoint
/// GET /captions?video=<id>&lang=<code>&screenshot=<bool>&nocache=<bool>
pub async fn captions(
    State(state): State<Arc<AppState>>,
    query: Result<Query<CaptionQuery>, QueryRejection>,
) -> Result<Response, HttpError> {
    let Query(query) = query.map_err(|e| HttpError::BadRequest(e.body_text()))?;
    let request = query.into_request()?;

    let (result, status) = state.service.get_transcript(&request).await.map_err(|e| {
        tracing::error!(video_id = %request.video_id, error = %e, "transcript request failed");
        HttpError::from(e)
    })?;

    let mut response = Json(result).into_response();
    response
        .headers_mut()
        .insert(X_CACHE, HeaderValue::from_static(status.as_str()));
    Ok(response)
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "OK"
}

/// Version endpoint
pub async fn version_check() -> &'static str {
    concat!("caption-server v", env!("CARGO_PKG_VERSION"))
}

/// Cache and browser session statistics
pub async fn cache_stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let stats = state.cache_stats();
    Json(json!({
        "entry_count": stats.entry_count,
        "live_count": stats.live_count,
        "ttl_secs": stats.ttl_secs,
        "browser_sessions": state.engine.live_sessions(),
    }))
}
