//! WebDriver-backed browser engine
//!
//! The engine is a long-lived handle on a WebDriver endpoint (chromedriver,
//! geckodriver, a Selenium grid). Every session is a separate WebDriver
//! session, which the driver backs with a fresh browser profile, so cookies
//! and storage never leak between requests.

use async_trait::async_trait;
use fantoccini::wd::TimeoutConfiguration;
use fantoccini::{Client, ClientBuilder, Locator};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use super::{BrowserEngine, BrowserSession};
use crate::config::BrowserConfig;
use crate::error::{CaptionError, Result};

/// Interval between network-idle probes
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Document readiness plus number of fetched resources so far
const IDLE_PROBE_SCRIPT: &str =
    "return [document.readyState, performance.getEntriesByType('resource').length];";

type Registry = Arc<Mutex<HashMap<u64, Client>>>;

/// Shared WebDriver engine handle
pub struct WebDriverEngine {
    config: BrowserConfig,
    next_id: AtomicU64,
    /// Live sessions, kept so shutdown can close stragglers
    sessions: Registry,
}

impl WebDriverEngine {
    pub fn new(config: BrowserConfig) -> Self {
        Self {
            config,
            next_id: AtomicU64::new(1),
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn capabilities(&self) -> serde_json::Map<String, Value> {
        let mut chrome_args = vec![
            "--no-sandbox",
            "--disable-dev-shm-usage",
            "--mute-audio",
            "--window-size=1280,720",
        ];
        let mut firefox_args = vec!["--width=1280", "--height=720"];
        if self.config.headless {
            chrome_args.push("--headless=new");
            firefox_args.push("-headless");
        }

        let mut caps = serde_json::Map::new();
        caps.insert("pageLoadStrategy".to_string(), json!("normal"));
        caps.insert("goog:chromeOptions".to_string(), json!({ "args": chrome_args }));
        caps.insert("moz:firefoxOptions".to_string(), json!({ "args": firefox_args }));
        caps
    }
}

#[async_trait]
impl BrowserEngine for WebDriverEngine {
    async fn open_session(&self) -> Result<Box<dyn BrowserSession>> {
        let client = ClientBuilder::native()
            .capabilities(self.capabilities())
            .connect(&self.config.webdriver_url)
            .await
            .map_err(|e| {
                CaptionError::Browser(format!(
                    "failed to open session on {}: {}",
                    self.config.webdriver_url, e
                ))
            })?;

        let timeouts = TimeoutConfiguration::new(
            Some(self.config.navigation_timeout()),
            Some(self.config.navigation_timeout()),
            Some(Duration::ZERO),
        );
        if let Err(e) = client.update_timeouts(timeouts).await {
            tracing::warn!(error = %e, "failed to set session timeouts");
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.sessions.lock().insert(id, client.clone());
        tracing::debug!(session = id, live = self.live_sessions(), "browser session opened");

        Ok(Box::new(WebDriverSession {
            id,
            client,
            registry: Arc::clone(&self.sessions),
            navigation_timeout: self.config.navigation_timeout(),
            idle_window: self.config.idle_window(),
        }))
    }

    fn live_sessions(&self) -> usize {
        self.sessions.lock().len()
    }

    async fn shutdown(&self) {
        let stragglers: Vec<(u64, Client)> = self.sessions.lock().drain().collect();
        for (id, client) in stragglers {
            tracing::info!(session = id, "closing browser session at shutdown");
            if let Err(e) = client.close().await {
                tracing::warn!(session = id, error = %e, "failed to close browser session");
            }
        }
    }
}

struct WebDriverSession {
    id: u64,
    client: Client,
    registry: Registry,
    navigation_timeout: Duration,
    idle_window: Duration,
}

impl WebDriverSession {
    /// Poll until the document is complete and no new resources were
    /// fetched for a whole idle window. Running out of time is logged,
    /// not fatal: pages that stream media never go fully quiet.
    async fn wait_for_network_idle(&mut self, deadline: Instant) {
        let mut last_count: Option<u64> = None;
        let mut stable_since = Instant::now();

        while Instant::now() < deadline {
            match self.client.execute(IDLE_PROBE_SCRIPT, vec![]).await {
                Ok(Value::Array(probe)) => {
                    let complete = probe.first().and_then(Value::as_str) == Some("complete");
                    let count = probe.get(1).and_then(Value::as_u64);
                    if !complete || count != last_count {
                        last_count = count;
                        stable_since = Instant::now();
                    } else if stable_since.elapsed() >= self.idle_window {
                        return;
                    }
                }
                Ok(other) => {
                    tracing::debug!(session = self.id, probe = %other, "unexpected idle probe result");
                }
                Err(e) => {
                    tracing::debug!(session = self.id, error = %e, "idle probe failed");
                }
            }
            tokio::time::sleep(IDLE_POLL_INTERVAL).await;
        }

        tracing::debug!(session = self.id, "network did not go idle before the deadline");
    }
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        let deadline = Instant::now() + self.navigation_timeout;

        match tokio::time::timeout(self.navigation_timeout, self.client.goto(url)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(CaptionError::Navigation(format!("failed to load {}: {}", url, e)))
            }
            Err(_) => {
                return Err(CaptionError::Navigation(format!(
                    "timed out after {:?} loading {}",
                    self.navigation_timeout, url
                )))
            }
        }

        self.wait_for_network_idle(deadline).await;
        Ok(())
    }

    async fn evaluate(&mut self, script: &str) -> Result<Value> {
        self.client
            .execute(script, vec![])
            .await
            .map_err(|e| CaptionError::Browser(format!("script evaluation failed: {}", e)))
    }

    async fn click_if_present(&mut self, selector: &str) -> Result<bool> {
        let elements = self
            .client
            .find_all(Locator::Css(selector))
            .await
            .map_err(|e| CaptionError::Browser(format!("lookup of {} failed: {}", selector, e)))?;

        let Some(element) = elements.into_iter().next() else {
            return Ok(false);
        };
        element
            .click()
            .await
            .map_err(|e| CaptionError::Browser(format!("click on {} failed: {}", selector, e)))?;
        Ok(true)
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>> {
        self.client
            .screenshot()
            .await
            .map_err(|e| CaptionError::Browser(format!("screenshot failed: {}", e)))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.registry.lock().remove(&self.id);
        tracing::debug!(session = self.id, "browser session closed");
        self.client
            .close()
            .await
            .map_err(|e| CaptionError::Browser(format!("failed to end session: {}", e)))
    }
}
