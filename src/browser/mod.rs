//! Headless browser capability
//!
//! This module models the browser engine as an explicit resource:
//! - [`BrowserEngine`]: one long-lived handle shared by every request
//! - [`BrowserSession`]: an isolated context (own cookies and storage) per call
//! - [`SessionGuard`]: scoped ownership of a session that is always released
//!
//! The production engine talks WebDriver, see [`webdriver`].

pub mod webdriver;

#[cfg(test)]
pub mod fake;

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::{CaptionError, Result};

pub use webdriver::WebDriverEngine;

/// A browser engine able to hand out isolated sessions
#[async_trait]
pub trait BrowserEngine: Send + Sync {
    /// Open a fresh session that shares no state with any other session
    async fn open_session(&self) -> Result<Box<dyn BrowserSession>>;

    /// Number of sessions opened and not yet closed
    fn live_sessions(&self) -> usize;

    /// Release every engine resource; called once at process shutdown
    async fn shutdown(&self);
}

/// One isolated browsing context
#[async_trait]
pub trait BrowserSession: Send {
    /// Load `url` and wait until network activity has settled
    async fn navigate(&mut self, url: &str) -> Result<()>;

    /// Evaluate a script body in page scope and return its JSON result
    async fn evaluate(&mut self, script: &str) -> Result<serde_json::Value>;

    /// Click the first element matching `selector`; `false` if there is none
    async fn click_if_present(&mut self, selector: &str) -> Result<bool>;

    /// Capture the viewport as PNG
    async fn screenshot(&mut self) -> Result<Vec<u8>>;

    /// End the session
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Scoped session ownership.
///
/// [`SessionGuard::release`] closes the session. A guard dropped without
/// release (the request future was cancelled, or a panic unwound through
/// it) hands the session to a background task that closes it.
pub struct SessionGuard {
    session: Box<dyn BrowserSession>,
    released: bool,
}

impl SessionGuard {
    /// Open a session on `engine`
    pub async fn acquire(engine: &Arc<dyn BrowserEngine>) -> Result<Self> {
        let session = engine.open_session().await?;
        Ok(Self {
            session,
            released: false,
        })
    }

    /// Access the guarded session
    pub fn session(&mut self) -> &mut dyn BrowserSession {
        self.session.as_mut()
    }

    /// Close the session now
    pub async fn release(mut self) {
        if let Some(session) = self.take() {
            if let Err(e) = session.close().await {
                tracing::warn!(error = %e, "failed to close browser session");
            }
        }
    }

    /// Move the live session out, leaving a closed placeholder behind
    fn take(&mut self) -> Option<Box<dyn BrowserSession>> {
        if self.released {
            return None;
        }
        self.released = true;
        Some(std::mem::replace(&mut self.session, Box::new(ReleasedSession)))
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let Some(session) = self.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::debug!("browser session dropped without release, closing in background");
                handle.spawn(async move {
                    if let Err(e) = session.close().await {
                        tracing::warn!(error = %e, "failed to close abandoned browser session");
                    }
                });
            }
            Err(_) => {
                tracing::warn!("browser session dropped outside a runtime, leaking it");
            }
        }
    }
}

/// Stands in for a session that has already been handed off for closing
struct ReleasedSession;

impl ReleasedSession {
    fn closed<T>() -> Result<T> {
        Err(CaptionError::Browser("browser session already released".to_string()))
    }
}

#[async_trait]
impl BrowserSession for ReleasedSession {
    async fn navigate(&mut self, _url: &str) -> Result<()> {
        Self::closed()
    }

    async fn evaluate(&mut self, _script: &str) -> Result<serde_json::Value> {
        Self::closed()
    }

    async fn click_if_present(&mut self, _selector: &str) -> Result<bool> {
        Self::closed()
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>> {
        Self::closed()
    }

    async fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
