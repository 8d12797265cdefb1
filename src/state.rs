//! Application state management
//!
//! AppState holds what every handler shares:
//! - Transcript service
//! - Transcript cache
//! - Browser engine handle
//! - Server configuration

use std::sync::Arc;

use crate::browser::BrowserEngine;
use crate::cache::{CacheStats, TranscriptCache};
use crate::captions::{
    CaptionService, HttpPayloadFetcher, PayloadFetcher, ScreenshotCapture, Screenshotter,
    TrackResolver, TrackSource,
};
use crate::config::ServerConfig;
use crate::error::Result;

/// Application state shared across all handlers
pub struct AppState {
    pub service: CaptionService,
    pub cache: Arc<TranscriptCache>,
    pub engine: Arc<dyn BrowserEngine>,
    pub config: ServerConfig,
}

impl AppState {
    /// Wire the production pipeline on top of a browser engine
    pub fn new(config: ServerConfig, engine: Arc<dyn BrowserEngine>) -> Result<Self> {
        let tracks = Arc::new(TrackResolver::new(
            Arc::clone(&engine),
            config.browser.clone(),
        ));
        let screenshots = Arc::new(ScreenshotCapture::new(
            Arc::clone(&engine),
            config.browser.clone(),
            config.screenshot.clone(),
        ));
        let fetcher = Arc::new(HttpPayloadFetcher::new()?);
        Ok(Self::with_components(
            config,
            engine,
            Arc::new(TranscriptCache::new()),
            tracks,
            fetcher,
            screenshots,
        ))
    }

    /// Assemble state from explicit parts
    pub fn with_components(
        config: ServerConfig,
        engine: Arc<dyn BrowserEngine>,
        cache: Arc<TranscriptCache>,
        tracks: Arc<dyn TrackSource>,
        fetcher: Arc<dyn PayloadFetcher>,
        screenshots: Arc<dyn Screenshotter>,
    ) -> Self {
        let service = CaptionService::new(
            Arc::clone(&cache),
            tracks,
            fetcher,
            screenshots,
            config.fetch.timeout(),
        );
        Self {
            service,
            cache,
            engine,
            config,
        }
    }

    /// Get cache statistics
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Remove expired transcripts, returning how many went
    pub fn cleanup_expired(&self) -> usize {
        self.cache.purge_expired()
    }
}
