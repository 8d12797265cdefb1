//! End-to-end tests through the HTTP router

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use serde_json::Value;
use std::sync::Arc;
use tower::util::ServiceExt;

use crate::browser::fake::FakeEngine;
use crate::cache::TranscriptCache;
use crate::captions::{CaptionTrack, Screenshotter};
use crate::config::ServerConfig;
use crate::http::create_router;
use crate::integration::fixtures::{
    json3_payload, xml_payload, FailingScreenshotter, MockTrackSource, ScriptedFetcher,
    StubScreenshotter,
};
use crate::state::AppState;

const EN_XML: &str = "https://www.youtube.com/api/timedtext?v=abc123&lang=en";
const EN_JSON: &str = "https://www.youtube.com/api/timedtext?v=abc123&lang=en&fmt=json3";

struct Harness {
    state: Arc<AppState>,
    tracks: Arc<MockTrackSource>,
}

impl Harness {
    fn new(
        tracks: Arc<MockTrackSource>,
        fetcher: ScriptedFetcher,
        screenshots: Arc<dyn Screenshotter>,
    ) -> Self {
        let state = Arc::new(AppState::with_components(
            ServerConfig::default(),
            FakeEngine::new(),
            Arc::new(TranscriptCache::new()),
            tracks.clone(),
            Arc::new(fetcher),
            screenshots,
        ));
        Self { state, tracks }
    }

    /// One English XML track with three entries
    fn english() -> Self {
        Self::new(
            MockTrackSource::with_tracks(vec![CaptionTrack::new(EN_XML, "en")]),
            ScriptedFetcher::new().respond(EN_XML, &xml_payload(&["one", "two", "three"])),
            Arc::new(StubScreenshotter::default()),
        )
    }

    async fn get(&self, uri: &str) -> Response {
        create_router(self.state.clone())
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }
}

async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn x_cache(response: &Response) -> &str {
    response
        .headers()
        .get("x-cache")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

#[tokio::test]
async fn test_transcript_served_and_cached() {
    let harness = Harness::english();

    let response = harness.get("/captions?video=abc123&lang=en").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(x_cache(&response), "MISS");
    let body = body_json(response).await;
    assert_eq!(body["video"], "abc123");
    assert_eq!(body["lang"], "en");
    let captions = body["captions"].as_array().unwrap();
    assert_eq!(captions.len(), 3);
    assert_eq!(captions[0]["text"], "one");
    assert_eq!(captions[1]["start"], 2.0);
    assert_eq!(captions[2]["dur"], 2.0);
    assert!(body.get("screenshot").is_none());
    assert!(harness.state.cache.contains("abc123", "en"));
}

#[tokio::test]
async fn test_repeat_request_served_from_cache() {
    let harness = Harness::english();

    let first = body_json(harness.get("/captions?video=abc123&lang=en").await).await;
    let response = harness.get("/captions?video=abc123&lang=en").await;

    assert_eq!(x_cache(&response), "HIT");
    assert_eq!(body_json(response).await, first);
    assert_eq!(harness.tracks.calls(), 1);
}

#[tokio::test]
async fn test_no_matching_language_is_empty_success() {
    let harness = Harness::english();

    let response = harness.get("/captions?video=abc123&lang=xx").await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["lang"], "xx");
    assert_eq!(body["captions"], Value::Array(Vec::new()));
}

#[tokio::test]
async fn test_missing_video_is_bad_request() {
    let harness = Harness::english();

    for uri in ["/captions", "/captions?lang=en", "/captions?video="] {
        let response = harness.get(uri).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("video"));
    }
    assert_eq!(harness.tracks.calls(), 0);
}

#[tokio::test]
async fn test_malformed_query_is_json_bad_request() {
    let harness = Harness::english();

    let response = harness.get("/captions?video=a&video=b").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/json"
    );
    let body = body_json(response).await;
    assert!(body["error"].is_string());
    assert_eq!(harness.tracks.calls(), 0);
}

#[tokio::test]
async fn test_screenshot_failure_keeps_captions() {
    let harness = Harness::new(
        MockTrackSource::with_tracks(vec![CaptionTrack::new(EN_XML, "en")]),
        ScriptedFetcher::new().respond(EN_XML, &xml_payload(&["one", "two", "three"])),
        Arc::new(FailingScreenshotter),
    );

    let response = harness
        .get("/captions?video=abc123&lang=en&screenshot=true")
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["captions"].as_array().unwrap().len(), 3);
    assert!(body.get("screenshot").is_none());
}

#[tokio::test]
async fn test_screenshot_path_reported() {
    let screenshots = Arc::new(StubScreenshotter::default());
    let harness = Harness::new(
        MockTrackSource::with_tracks(vec![CaptionTrack::new(EN_XML, "en")]),
        ScriptedFetcher::new().respond(EN_XML, &xml_payload(&["one"])),
        screenshots.clone(),
    );

    let body = body_json(harness.get("/captions?video=abc123&screenshot=1").await).await;

    assert_eq!(body["screenshot"], "screenshots/abc123_en.png");
    assert_eq!(screenshots.captures(), 1);
}

#[tokio::test]
async fn test_fallback_to_second_track() {
    let harness = Harness::new(
        MockTrackSource::with_tracks(vec![
            CaptionTrack::new(EN_XML, "en"),
            CaptionTrack::new(EN_JSON, "en"),
        ]),
        ScriptedFetcher::new()
            .fail(EN_XML)
            .respond(EN_JSON, &json3_payload(&["from json"])),
        Arc::new(StubScreenshotter::default()),
    );

    let body = body_json(harness.get("/captions?video=abc123").await).await;

    assert_eq!(body["captions"][0]["text"], "from json");
}

#[tokio::test]
async fn test_nocache_bypasses_both_ways() {
    let harness = Harness::english();

    let response = harness.get("/captions?video=abc123&nocache=true").await;
    assert_eq!(x_cache(&response), "BYPASS");
    assert!(!harness.state.cache.contains("abc123", "en"));

    harness.get("/captions?video=abc123").await;
    let response = harness.get("/captions?video=abc123&nocache=1").await;
    assert_eq!(x_cache(&response), "BYPASS");
    assert_eq!(harness.tracks.calls(), 3);
}

#[tokio::test]
async fn test_navigation_failure_is_server_error() {
    let harness = Harness::new(
        MockTrackSource::failing(),
        ScriptedFetcher::new(),
        Arc::new(StubScreenshotter::default()),
    );

    let response = harness.get("/captions?video=abc123").await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("Navigation"));
    assert!(harness.state.cache.is_empty());
}

#[tokio::test]
async fn test_debug_cache_reports_entries() {
    let harness = Harness::english();
    harness.get("/captions?video=abc123").await;

    let body = body_json(harness.get("/debug/cache").await).await;

    assert_eq!(body["entry_count"], 1);
    assert_eq!(body["live_count"], 1);
    assert_eq!(body["ttl_secs"], 3600);
    assert_eq!(body["browser_sessions"], 0);
}
