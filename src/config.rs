//! Server configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{CaptionError, Result};

/// Headless browser configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// WebDriver endpoint of the shared browser engine
    pub webdriver_url: String,

    /// Run the browser without a visible window
    pub headless: bool,

    /// Canonical watch page; the video id is appended as the `v` query parameter
    pub watch_url: String,

    /// Upper bound for loading a page and waiting for it to go idle
    pub navigation_timeout_ms: u64,

    /// How long the resource count must stay unchanged to count as network idle
    pub idle_window_ms: u64,

    /// Randomized pre-navigation delay bounds
    pub jitter_min_ms: u64,
    pub jitter_max_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".to_string(),
            headless: true,
            watch_url: "https://www.youtube.com/watch".to_string(),
            navigation_timeout_ms: 30_000,
            idle_window_ms: 500,
            jitter_min_ms: 500,
            jitter_max_ms: 1500,
        }
    }
}

impl BrowserConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn idle_window(&self) -> Duration {
        Duration::from_millis(self.idle_window_ms)
    }
}

/// Caption payload fetch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Per-candidate payload fetch bound
    pub timeout_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { timeout_ms: 10_000 }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Screenshot capture configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenshotConfig {
    /// Directory screenshots are written to
    pub dir: PathBuf,

    /// Delay after dismissing the play overlay before capturing
    pub settle_ms: u64,

    /// CSS selector of the play overlay
    pub overlay_selector: String,
}

impl Default for ScreenshotConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("screenshots"),
            settle_ms: 1500,
            overlay_selector: ".ytp-large-play-button".to_string(),
        }
    }
}

/// Cache maintenance configuration.
///
/// The TTL itself is fixed, see [`crate::cache::CACHE_TTL`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Interval of the expired-entry sweep in seconds, 0 disables it
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: 600,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Output format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Enable CORS
    pub cors_enabled: bool,

    pub browser: BrowserConfig,
    pub fetch: FetchConfig,
    pub screenshot: ScreenshotConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            cors_enabled: true,
            browser: BrowserConfig::default(),
            fetch: FetchConfig::default(),
            screenshot: ScreenshotConfig::default(),
            cache: CacheConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Repair inconsistent settings, returning a description of each change
    /// so it can be logged once logging is up.
    pub fn normalize(&mut self) -> Vec<String> {
        let mut adjustments = Vec::new();
        let b = &mut self.browser;
        if b.jitter_max_ms < b.jitter_min_ms {
            adjustments.push(format!(
                "jitter_max_ms {} below jitter_min_ms {}, clamping",
                b.jitter_max_ms, b.jitter_min_ms
            ));
            b.jitter_max_ms = b.jitter_min_ms;
        }
        adjustments
    }

    /// Apply overrides from the process environment
    pub fn apply_env(self) -> Result<Self> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_env_with<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.port = port
                .trim()
                .parse()
                .map_err(|_| CaptionError::Config(format!("invalid PORT value: {}", port)))?;
        }
        if let Some(host) = lookup("HOST") {
            self.host = host;
        }
        if let Some(url) = lookup("WEBDRIVER_URL") {
            self.browser.webdriver_url = url;
        }
        if let Some(dir) = lookup("SCREENSHOT_DIR") {
            self.screenshot.dir = PathBuf::from(dir);
        }
        Ok(self)
    }
}
