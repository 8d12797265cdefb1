//! Configuration file support
//!
//! Loads server configuration from TOML files. Every section and every
//! field is optional; anything left out keeps its built-in default.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::ServerConfig;

/// Configuration file format
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Server settings
    pub server: Option<ServerSettings>,
    /// Headless browser settings
    pub browser: Option<BrowserSettings>,
    /// Payload fetch settings
    pub fetch: Option<FetchSettings>,
    /// Screenshot settings
    pub screenshot: Option<ScreenshotSettings>,
    /// Cache maintenance settings
    pub cache: Option<CacheSettings>,
    /// Logging settings
    pub logging: Option<LoggingSettings>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub cors_enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrowserSettings {
    pub webdriver_url: Option<String>,
    pub headless: Option<bool>,
    pub watch_url: Option<String>,
    pub navigation_timeout_ms: Option<u64>,
    pub idle_window_ms: Option<u64>,
    pub jitter_min_ms: Option<u64>,
    pub jitter_max_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FetchSettings {
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScreenshotSettings {
    pub dir: Option<PathBuf>,
    pub settle_ms: Option<u64>,
    pub overlay_selector: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Expired-entry sweep interval in seconds, 0 disables it
    pub sweep_interval_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    pub level: Option<String>,
    /// Output format (json, pretty)
    pub format: Option<String>,
}

impl ConfigFile {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: ConfigFile = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Generate a fully populated configuration file from the defaults
    pub fn default_config() -> Self {
        let d = ServerConfig::default();
        Self {
            server: Some(ServerSettings {
                host: Some(d.host),
                port: Some(d.port),
                cors_enabled: Some(d.cors_enabled),
            }),
            browser: Some(BrowserSettings {
                webdriver_url: Some(d.browser.webdriver_url),
                headless: Some(d.browser.headless),
                watch_url: Some(d.browser.watch_url),
                navigation_timeout_ms: Some(d.browser.navigation_timeout_ms),
                idle_window_ms: Some(d.browser.idle_window_ms),
                jitter_min_ms: Some(d.browser.jitter_min_ms),
                jitter_max_ms: Some(d.browser.jitter_max_ms),
            }),
            fetch: Some(FetchSettings {
                timeout_ms: Some(d.fetch.timeout_ms),
            }),
            screenshot: Some(ScreenshotSettings {
                dir: Some(d.screenshot.dir),
                settle_ms: Some(d.screenshot.settle_ms),
                overlay_selector: Some(d.screenshot.overlay_selector),
            }),
            cache: Some(CacheSettings {
                sweep_interval_secs: Some(d.cache.sweep_interval_secs),
            }),
            logging: Some(LoggingSettings {
                level: Some(d.logging.level),
                format: Some(d.logging.format),
            }),
        }
    }

    /// Convert to ServerConfig, filling gaps with defaults
    pub fn into_server_config(self) -> ServerConfig {
        let mut config = ServerConfig::default();

        if let Some(server) = self.server {
            config.host = server.host.unwrap_or(config.host);
            config.port = server.port.unwrap_or(config.port);
            config.cors_enabled = server.cors_enabled.unwrap_or(config.cors_enabled);
        }

        if let Some(browser) = self.browser {
            let b = &mut config.browser;
            if let Some(v) = browser.webdriver_url {
                b.webdriver_url = v;
            }
            if let Some(v) = browser.watch_url {
                b.watch_url = v;
            }
            b.headless = browser.headless.unwrap_or(b.headless);
            b.navigation_timeout_ms = browser
                .navigation_timeout_ms
                .unwrap_or(b.navigation_timeout_ms);
            b.idle_window_ms = browser.idle_window_ms.unwrap_or(b.idle_window_ms);
            b.jitter_min_ms = browser.jitter_min_ms.unwrap_or(b.jitter_min_ms);
            b.jitter_max_ms = browser.jitter_max_ms.unwrap_or(b.jitter_max_ms);
        }

        if let Some(fetch) = self.fetch {
            config.fetch.timeout_ms = fetch.timeout_ms.unwrap_or(config.fetch.timeout_ms);
        }

        if let Some(shot) = self.screenshot {
            let s = &mut config.screenshot;
            if let Some(dir) = shot.dir {
                s.dir = dir;
            }
            if let Some(sel) = shot.overlay_selector {
                s.overlay_selector = sel;
            }
            s.settle_ms = shot.settle_ms.unwrap_or(s.settle_ms);
        }

        if let Some(cache) = self.cache {
            config.cache.sweep_interval_secs = cache
                .sweep_interval_secs
                .unwrap_or(config.cache.sweep_interval_secs);
        }

        if let Some(logging) = self.logging {
            if let Some(level) = logging.level {
                config.logging.level = level;
            }
            if let Some(format) = logging.format {
                config.logging.format = format;
            }
        }

        config
    }
}

/// Generate default configuration file at the specified path
pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<(), Box<dyn std::error::Error>> {
    let config = ConfigFile::default_config();
    config.to_file(path)?;
    Ok(())
}
