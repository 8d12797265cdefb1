//! Fetch-and-select: the fallback core
//!
//! Candidates are tried strictly in resolver order. The first one whose
//! payload parses to at least one entry wins; fetch failures and empty
//! parses are both just "this candidate did not yield a transcript".

use async_trait::async_trait;
use std::time::Duration;

use super::parser::{parse_payload, PayloadFormat};
use super::types::{CaptionEntry, CaptionTrack};
use crate::error::{CaptionError, Result};

/// A retrieved caption payload
#[derive(Debug, Clone)]
pub struct FetchedPayload {
    pub body: String,
    pub content_type: Option<String>,
}

/// Plain HTTP retrieval of caption payloads
#[async_trait]
pub trait PayloadFetcher: Send + Sync {
    /// Fetch `url`, failing if it takes longer than `timeout`
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchedPayload>;
}

/// [`PayloadFetcher`] backed by a shared `reqwest` client
pub struct HttpPayloadFetcher {
    client: reqwest::Client,
}

impl HttpPayloadFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| CaptionError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PayloadFetcher for HttpPayloadFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchedPayload> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| CaptionError::Fetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CaptionError::Fetch(format!("HTTP {}", status)));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .text()
            .await
            .map_err(|e| CaptionError::Fetch(e.to_string()))?;

        Ok(FetchedPayload { body, content_type })
    }
}

/// What a single candidate produced
#[derive(Debug)]
pub enum CandidateOutcome {
    Transcript(Vec<CaptionEntry>),
    Empty,
    Failed(CaptionError),
}

/// Result of the fallback loop
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub captions: Vec<CaptionEntry>,
    pub chosen: Option<CaptionTrack>,
}

/// Fetch and parse one candidate
pub async fn try_candidate(
    fetcher: &dyn PayloadFetcher,
    track: &CaptionTrack,
    timeout: Duration,
) -> CandidateOutcome {
    let payload = match fetcher.fetch(&track.source_url, timeout).await {
        Ok(p) => p,
        Err(e) => return CandidateOutcome::Failed(e),
    };

    let format = PayloadFormat::detect(
        &track.source_url,
        payload.content_type.as_deref(),
        &payload.body,
    );
    let entries = parse_payload(&payload.body, format);
    if entries.is_empty() {
        CandidateOutcome::Empty
    } else {
        CandidateOutcome::Transcript(entries)
    }
}

/// Walk the language-matching candidates in order until one yields entries.
///
/// Exhausting every candidate is a successful, empty selection.
pub async fn select_transcript(
    fetcher: &dyn PayloadFetcher,
    tracks: &[CaptionTrack],
    lang: &str,
    timeout: Duration,
) -> Selection {
    for track in tracks.iter().filter(|t| t.matches_language(lang)) {
        match try_candidate(fetcher, track, timeout).await {
            CandidateOutcome::Transcript(captions) => {
                tracing::info!(
                    lang = %track.language_code,
                    name = track.name.as_deref().unwrap_or_default(),
                    auto_generated = track.auto_generated,
                    entries = captions.len(),
                    "caption track selected"
                );
                return Selection {
                    captions,
                    chosen: Some(track.clone()),
                };
            }
            CandidateOutcome::Empty => {
                tracing::warn!(url = %track.source_url, "caption payload parsed to nothing, trying next track");
            }
            CandidateOutcome::Failed(e) => {
                tracing::warn!(url = %track.source_url, error = %e, "caption fetch failed, trying next track");
            }
        }
    }

    tracing::info!(lang, "no caption track yielded a transcript");
    Selection::default()
}
