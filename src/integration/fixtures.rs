//! Test fixtures for integration tests
//!
//! Scripted implementations of the pipeline seams plus caption payload
//! builders, so tests run without a browser or network.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::captions::select::FetchedPayload;
use crate::captions::{CaptionTrack, PayloadFetcher, Screenshotter, TrackSource};
use crate::error::{CaptionError, Result};

/// Timed-text XML with one two-second entry per line
pub fn xml_payload(lines: &[&str]) -> String {
    let body: String = lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            format!(
                r#"<text start="{}.0" dur="2.0">{}</text>"#,
                i * 2,
                html_escape::encode_text(line)
            )
        })
        .collect();
    format!(r#"<?xml version="1.0" encoding="utf-8" ?><transcript>{}</transcript>"#, body)
}

/// JSON event document with one two-second event per line
pub fn json3_payload(lines: &[&str]) -> String {
    let events: Vec<serde_json::Value> = lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            serde_json::json!({
                "tStartMs": i * 2000,
                "dDurationMs": 2000,
                "segs": [{"utf8": line}]
            })
        })
        .collect();
    serde_json::json!({ "wireMagic": "pb3", "events": events }).to_string()
}

/// Fetcher answering from a fixed URL table and recording every attempt.
/// Unscripted URLs fail like an unreachable host.
#[derive(Default)]
pub struct ScriptedFetcher {
    responses: HashMap<String, Option<String>>,
    attempts: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, url: &str, body: &str) -> Self {
        self.responses.insert(url.to_string(), Some(body.to_string()));
        self
    }

    pub fn fail(mut self, url: &str) -> Self {
        self.responses.insert(url.to_string(), None);
        self
    }

    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().clone()
    }
}

#[async_trait]
impl PayloadFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str, _timeout: Duration) -> Result<FetchedPayload> {
        self.attempts.lock().push(url.to_string());
        match self.responses.get(url) {
            Some(Some(body)) => Ok(FetchedPayload {
                body: body.clone(),
                content_type: None,
            }),
            Some(None) => Err(CaptionError::Fetch(format!("HTTP 404 Not Found for {}", url))),
            None => Err(CaptionError::Fetch(format!("connection refused: {}", url))),
        }
    }
}

/// Track source with a fixed answer and a call counter
pub struct MockTrackSource {
    tracks: Option<Vec<CaptionTrack>>,
    calls: AtomicUsize,
}

impl MockTrackSource {
    pub fn with_tracks(tracks: Vec<CaptionTrack>) -> Arc<Self> {
        Arc::new(Self {
            tracks: Some(tracks),
            calls: AtomicUsize::new(0),
        })
    }

    /// Every resolution fails as a navigation timeout would
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            tracks: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TrackSource for MockTrackSource {
    async fn resolve_tracks(&self, video_id: &str) -> Result<Vec<CaptionTrack>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.tracks.clone().ok_or_else(|| {
            CaptionError::Navigation(format!("timed out loading watch page for {}", video_id))
        })
    }
}

/// Screenshotter that pretends to write under `screenshots/`
#[derive(Default)]
pub struct StubScreenshotter {
    captures: AtomicUsize,
}

impl StubScreenshotter {
    pub fn captures(&self) -> usize {
        self.captures.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Screenshotter for StubScreenshotter {
    async fn capture(&self, video_id: &str, lang: &str) -> Result<PathBuf> {
        self.captures.fetch_add(1, Ordering::SeqCst);
        Ok(PathBuf::from(format!("screenshots/{}_{}.png", video_id, lang)))
    }
}

/// Screenshotter that always fails
pub struct FailingScreenshotter;

#[async_trait]
impl Screenshotter for FailingScreenshotter {
    async fn capture(&self, _video_id: &str, _lang: &str) -> Result<PathBuf> {
        Err(CaptionError::Screenshot("renderer crashed".to_string()))
    }
}
