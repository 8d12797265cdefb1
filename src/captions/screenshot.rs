//! Best-effort visual confirmation of the watch page

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use super::resolver::watch_url;
use crate::browser::{BrowserEngine, SessionGuard};
use crate::config::{BrowserConfig, ScreenshotConfig};
use crate::error::{CaptionError, Result};

/// Produces a screenshot of a video's watch page
#[async_trait]
pub trait Screenshotter: Send + Sync {
    /// Capture and store a screenshot, returning where it was written
    async fn capture(&self, video_id: &str, lang: &str) -> Result<PathBuf>;
}

/// Browser-driven screenshot capture
pub struct ScreenshotCapture {
    engine: Arc<dyn BrowserEngine>,
    browser: BrowserConfig,
    config: ScreenshotConfig,
}

impl ScreenshotCapture {
    pub fn new(
        engine: Arc<dyn BrowserEngine>,
        browser: BrowserConfig,
        config: ScreenshotConfig,
    ) -> Self {
        Self {
            engine,
            browser,
            config,
        }
    }
}

#[async_trait]
impl Screenshotter for ScreenshotCapture {
    async fn capture(&self, video_id: &str, lang: &str) -> Result<PathBuf> {
        let url = watch_url(&self.browser.watch_url, video_id)?;
        let mut guard = SessionGuard::acquire(&self.engine).await?;

        let png = grab(&mut guard, url.as_str(), &self.config).await;
        guard.release().await;
        let png = png?;

        tokio::fs::create_dir_all(&self.config.dir).await?;
        let path = screenshot_path(&self.config.dir, video_id, lang, Utc::now());
        tokio::fs::write(&path, png).await?;

        tracing::info!(video_id, lang, path = %path.display(), "screenshot saved");
        Ok(path)
    }
}

async fn grab(guard: &mut SessionGuard, url: &str, config: &ScreenshotConfig) -> Result<Vec<u8>> {
    let session = guard.session();
    session.navigate(url).await?;

    match session.click_if_present(&config.overlay_selector).await {
        Ok(true) => tracing::debug!("play overlay dismissed"),
        Ok(false) => {}
        Err(e) => tracing::debug!(error = %e, "play overlay click failed"),
    }
    tokio::time::sleep(Duration::from_millis(config.settle_ms)).await;

    session
        .screenshot()
        .await
        .map_err(|e| CaptionError::Screenshot(e.to_string()))
}

/// `<dir>/<video>_<lang>_<UTC timestamp with millis>.png`. The identifiers
/// are escaped so `_` only ever appears as the separator and the name stays
/// a single path component.
pub fn screenshot_path(dir: &Path, video_id: &str, lang: &str, at: DateTime<Utc>) -> PathBuf {
    let file = format!(
        "{}_{}_{}.png",
        escape(video_id),
        escape(lang),
        at.format("%Y%m%dT%H%M%S%.3fZ")
    );
    dir.join(file)
}

/// Keep `[A-Za-z0-9-]`, write every other byte as `%XX`
fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        if b.is_ascii_alphanumeric() || b == b'-' {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
    }
    out
}
