//! Request orchestration
//!
//! cache lookup, track resolution, selection, optional screenshot, cache write

use std::sync::Arc;
use std::time::Duration;

use super::resolver::TrackSource;
use super::screenshot::Screenshotter;
use super::select::{select_transcript, PayloadFetcher};
use super::types::TranscriptResult;
use crate::cache::TranscriptCache;
use crate::error::{CaptionError, Result};

/// Parameters of one transcript request
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionRequest {
    pub video_id: String,
    pub lang: String,
    pub screenshot: bool,
    pub bypass_cache: bool,
}

impl CaptionRequest {
    #[cfg(test)]
    pub fn new(video_id: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            video_id: video_id.into(),
            lang: lang.into(),
            screenshot: false,
            bypass_cache: false,
        }
    }
}

/// How the cache took part in a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
    Bypass,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
            CacheStatus::Bypass => "BYPASS",
        }
    }
}

/// Transcript service shared by all requests
pub struct CaptionService {
    cache: Arc<TranscriptCache>,
    tracks: Arc<dyn TrackSource>,
    fetcher: Arc<dyn PayloadFetcher>,
    screenshots: Arc<dyn Screenshotter>,
    fetch_timeout: Duration,
}

impl CaptionService {
    pub fn new(
        cache: Arc<TranscriptCache>,
        tracks: Arc<dyn TrackSource>,
        fetcher: Arc<dyn PayloadFetcher>,
        screenshots: Arc<dyn Screenshotter>,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            cache,
            tracks,
            fetcher,
            screenshots,
            fetch_timeout,
        }
    }

    pub fn cache(&self) -> &Arc<TranscriptCache> {
        &self.cache
    }

    /// Produce the transcript for a request.
    ///
    /// Navigation and session failures are errors. Everything after a
    /// successful page load degrades to an empty transcript, and a failed
    /// screenshot only drops the screenshot.
    pub async fn get_transcript(
        &self,
        request: &CaptionRequest,
    ) -> Result<(TranscriptResult, CacheStatus)> {
        if request.video_id.is_empty() {
            return Err(CaptionError::Validation("video is required".to_string()));
        }

        let cache = self.cache.scoped(request.bypass_cache);
        if let Some(hit) = cache.get(&request.video_id, &request.lang) {
            tracing::debug!(video_id = %request.video_id, lang = %request.lang, "cache hit");
            return Ok((hit, CacheStatus::Hit));
        }

        let tracks = self.tracks.resolve_tracks(&request.video_id).await?;
        let selection =
            select_transcript(self.fetcher.as_ref(), &tracks, &request.lang, self.fetch_timeout)
                .await;

        let mut result =
            TranscriptResult::new(&request.video_id, &request.lang, selection.captions);

        if request.screenshot {
            match self
                .screenshots
                .capture(&request.video_id, &request.lang)
                .await
            {
                Ok(path) => result.screenshot_path = Some(path.to_string_lossy().into_owned()),
                Err(e) => {
                    tracing::warn!(video_id = %request.video_id, error = %e, "screenshot failed")
                }
            }
        }

        cache.put(result.clone());

        let status = if cache.is_bypass() {
            CacheStatus::Bypass
        } else {
            CacheStatus::Miss
        };
        tracing::info!(
            video_id = %request.video_id,
            lang = %request.lang,
            entries = result.captions.len(),
            cache = status.as_str(),
            "transcript served"
        );
        Ok((result, status))
    }
}
