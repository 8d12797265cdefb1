//! Scripted in-memory browser engine for tests

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::{BrowserEngine, BrowserSession};
use crate::error::{CaptionError, Result};

#[derive(Debug, Clone, Default)]
struct Behavior {
    refuse_sessions: bool,
    fail_navigation: bool,
    evaluate: Option<std::result::Result<Value, String>>,
    overlay_present: bool,
    fail_screenshot: bool,
}

/// Engine whose sessions follow a fixed script and record what they did
pub struct FakeEngine {
    behavior: Mutex<Behavior>,
    opened: AtomicUsize,
    live: Arc<AtomicUsize>,
    navigations: Arc<Mutex<Vec<String>>>,
    clicks: Arc<AtomicUsize>,
}

impl FakeEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            behavior: Mutex::new(Behavior::default()),
            opened: AtomicUsize::new(0),
            live: Arc::new(AtomicUsize::new(0)),
            navigations: Arc::new(Mutex::new(Vec::new())),
            clicks: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn refuse_sessions(self: Arc<Self>) -> Arc<Self> {
        self.behavior.lock().refuse_sessions = true;
        self
    }

    pub fn fail_navigation(self: Arc<Self>) -> Arc<Self> {
        self.behavior.lock().fail_navigation = true;
        self
    }

    /// Value every `evaluate` call returns
    pub fn evaluate_returns(self: Arc<Self>, value: Value) -> Arc<Self> {
        self.behavior.lock().evaluate = Some(Ok(value));
        self
    }

    /// Make every `evaluate` call fail, as a page script that throws would
    pub fn evaluate_throws(self: Arc<Self>, message: &str) -> Arc<Self> {
        self.behavior.lock().evaluate = Some(Err(message.to_string()));
        self
    }

    pub fn with_overlay(self: Arc<Self>) -> Arc<Self> {
        self.behavior.lock().overlay_present = true;
        self
    }

    pub fn fail_screenshot(self: Arc<Self>) -> Arc<Self> {
        self.behavior.lock().fail_screenshot = true;
        self
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn navigations(&self) -> Vec<String> {
        self.navigations.lock().clone()
    }

    pub fn clicks(&self) -> usize {
        self.clicks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowserEngine for FakeEngine {
    async fn open_session(&self) -> Result<Box<dyn BrowserSession>> {
        let behavior = self.behavior.lock().clone();
        if behavior.refuse_sessions {
            return Err(CaptionError::Browser("session refused".to_string()));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        self.live.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            behavior,
            live: Arc::clone(&self.live),
            navigations: Arc::clone(&self.navigations),
            clicks: Arc::clone(&self.clicks),
        }))
    }

    fn live_sessions(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    async fn shutdown(&self) {}
}

struct FakeSession {
    behavior: Behavior,
    live: Arc<AtomicUsize>,
    navigations: Arc<Mutex<Vec<String>>>,
    clicks: Arc<AtomicUsize>,
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.navigations.lock().push(url.to_string());
        if self.behavior.fail_navigation {
            return Err(CaptionError::Navigation(format!("timed out loading {}", url)));
        }
        Ok(())
    }

    async fn evaluate(&mut self, _script: &str) -> Result<Value> {
        match &self.behavior.evaluate {
            Some(Ok(value)) => Ok(value.clone()),
            Some(Err(message)) => Err(CaptionError::Browser(message.clone())),
            None => Ok(Value::Null),
        }
    }

    async fn click_if_present(&mut self, _selector: &str) -> Result<bool> {
        if self.behavior.overlay_present {
            self.clicks.fetch_add(1, Ordering::SeqCst);
        }
        Ok(self.behavior.overlay_present)
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>> {
        if self.behavior.fail_screenshot {
            return Err(CaptionError::Browser("screenshot failed".to_string()));
        }
        Ok(b"\x89PNG\r\n\x1a\nfake".to_vec())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.live.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}
