//! Caption track resolution
//!
//! Track metadata only exists in the player state the video platform injects
//! into the page at runtime, so resolution drives a real browser session to
//! the watch page and reads that state instead of parsing markup.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use super::types::CaptionTrack;
use crate::browser::{BrowserEngine, SessionGuard};
use crate::config::BrowserConfig;
use crate::error::{CaptionError, Result};

/// Reads the caption track list out of the player response. Throws when the
/// player state is missing, which the resolver treats as "no tracks".
const EXTRACT_TRACKS_SCRIPT: &str = r#"
const player = document.querySelector('#movie_player');
const response = window.ytInitialPlayerResponse
    || (player && typeof player.getPlayerResponse === 'function' ? player.getPlayerResponse() : null);
if (!response) {
    throw new Error('player response not found');
}
const renderer = response.captions && response.captions.playerCaptionsTracklistRenderer;
return (renderer && renderer.captionTracks) || [];
"#;

/// Source of caption track candidates for a video
#[async_trait]
pub trait TrackSource: Send + Sync {
    /// Candidate tracks in player order. An empty list means the page
    /// loaded but exposed no caption metadata.
    async fn resolve_tracks(&self, video_id: &str) -> Result<Vec<CaptionTrack>>;
}

/// Browser-driven track resolver
pub struct TrackResolver {
    engine: Arc<dyn BrowserEngine>,
    config: BrowserConfig,
}

impl TrackResolver {
    pub fn new(engine: Arc<dyn BrowserEngine>, config: BrowserConfig) -> Self {
        Self { engine, config }
    }

    fn jitter(&self) -> Duration {
        let (min, max) = (self.config.jitter_min_ms, self.config.jitter_max_ms);
        Duration::from_millis(fastrand::u64(min..=max.max(min)))
    }
}

#[async_trait]
impl TrackSource for TrackResolver {
    async fn resolve_tracks(&self, video_id: &str) -> Result<Vec<CaptionTrack>> {
        let url = watch_url(&self.config.watch_url, video_id)?;
        let mut guard = SessionGuard::acquire(&self.engine).await?;

        let delay = self.jitter();
        tracing::debug!(video_id, delay_ms = delay.as_millis() as u64, "pre-navigation delay");
        tokio::time::sleep(delay).await;

        if let Err(e) = guard.session().navigate(url.as_str()).await {
            guard.release().await;
            return Err(e);
        }

        let tracks = match guard.session().evaluate(EXTRACT_TRACKS_SCRIPT).await {
            Ok(value) => extract_tracks(&value, &url),
            Err(e) => {
                tracing::warn!(video_id, error = %e, "caption track extraction failed");
                Vec::new()
            }
        };
        guard.release().await;

        tracing::info!(video_id, tracks = tracks.len(), "resolved caption tracks");
        Ok(tracks)
    }
}

/// Canonical watch page URL for a video
pub fn watch_url(base: &str, video_id: &str) -> Result<Url> {
    let mut url = Url::parse(base)
        .map_err(|e| CaptionError::Config(format!("invalid watch_url {}: {}", base, e)))?;
    url.query_pairs_mut().append_pair("v", video_id);
    Ok(url)
}

/// Convert the raw `captionTracks` array into candidates, skipping
/// descriptors without a locator. Relative locators resolve against the
/// watch page.
pub fn extract_tracks(value: &Value, page: &Url) -> Vec<CaptionTrack> {
    let Some(raw) = value.as_array() else {
        return Vec::new();
    };

    raw.iter()
        .filter_map(|track| {
            let base_url = track.get("baseUrl").and_then(Value::as_str)?;
            let source_url = match Url::parse(base_url) {
                Ok(url) => url.to_string(),
                Err(_) => page.join(base_url).ok()?.to_string(),
            };
            let language_code = track
                .get("languageCode")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let name = track
                .pointer("/name/simpleText")
                .or_else(|| track.pointer("/name/runs/0/text"))
                .and_then(Value::as_str)
                .map(str::to_string);
            let auto_generated = track.get("kind").and_then(Value::as_str) == Some("asr");

            Some(CaptionTrack {
                source_url,
                language_code: language_code.to_string(),
                name,
                auto_generated,
            })
        })
        .collect()
}
