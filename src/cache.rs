//! Transcript cache
//!
//! Results are kept per `(video, language)` for a fixed hour. An entry is
//! served while its age is strictly below the TTL. Empty transcripts are
//! cached like any other result.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::captions::TranscriptResult;

/// Lifetime of a cached transcript
pub const CACHE_TTL: Duration = Duration::from_secs(3600);

/// Time source for entry ages
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Cache entry with write time
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: TranscriptResult,
    pub written_at: DateTime<Utc>,
}

impl CacheEntry {
    fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        match chrono::Duration::from_std(ttl) {
            Ok(ttl) => now.signed_duration_since(self.written_at) < ttl,
            Err(_) => true,
        }
    }
}

/// Snapshot for `/debug/cache`
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub entry_count: usize,
    pub live_count: usize,
    pub ttl_secs: u64,
}

/// `(video_id, lang)`
type CacheKey = (String, String);

/// Concurrent TTL map of transcripts
pub struct TranscriptCache {
    entries: DashMap<CacheKey, CacheEntry>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl TranscriptCache {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
            ttl: CACHE_TTL,
        }
    }

    fn make_key(video_id: &str, lang: &str) -> CacheKey {
        (video_id.to_string(), lang.to_string())
    }

    /// Fresh entry for the pair, if any
    pub fn get(&self, video_id: &str, lang: &str) -> Option<TranscriptResult> {
        let key = Self::make_key(video_id, lang);
        let now = self.clock.now();
        self.entries
            .get(&key)
            .filter(|entry| entry.is_fresh(now, self.ttl))
            .map(|entry| entry.value.clone())
    }

    /// Store a result, replacing any previous entry for the pair
    pub fn put(&self, value: TranscriptResult) {
        let key = Self::make_key(&value.video_id, &value.language_requested);
        let entry = CacheEntry {
            value,
            written_at: self.clock.now(),
        };
        self.entries.insert(key, entry);
    }

    #[cfg(test)]
    pub fn contains(&self, video_id: &str, lang: &str) -> bool {
        self.entries.contains_key(&Self::make_key(video_id, lang))
    }

    /// Drop expired entries, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_fresh(now, self.ttl));
        before.saturating_sub(self.entries.len())
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now();
        CacheStats {
            entry_count: self.entries.len(),
            live_count: self
                .entries
                .iter()
                .filter(|entry| entry.is_fresh(now, self.ttl))
                .count(),
            ttl_secs: self.ttl.as_secs(),
        }
    }

    /// Request-scoped view. With `bypass` set, reads miss and writes are dropped.
    pub fn scoped(&self, bypass: bool) -> CacheView<'_> {
        CacheView {
            cache: self,
            bypass,
        }
    }
}

impl Default for TranscriptCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache access for a single request
pub struct CacheView<'a> {
    cache: &'a TranscriptCache,
    bypass: bool,
}

impl CacheView<'_> {
    pub fn get(&self, video_id: &str, lang: &str) -> Option<TranscriptResult> {
        if self.bypass {
            return None;
        }
        self.cache.get(video_id, lang)
    }

    pub fn put(&self, value: TranscriptResult) {
        if !self.bypass {
            self.cache.put(value);
        }
    }

    pub fn is_bypass(&self) -> bool {
        self.bypass
    }
}

/// Clock that only moves when told to
#[cfg(test)]
pub(crate) struct ManualClock {
    now: parking_lot::Mutex<DateTime<Utc>>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            now: parking_lot::Mutex::new(Utc::now()),
        })
    }

    pub fn advance(&self, by: Duration) {
        let by = chrono::Duration::from_std(by).unwrap();
        *self.now.lock() += by;
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}
