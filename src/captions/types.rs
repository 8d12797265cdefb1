//! Caption data model

use serde::{Deserialize, Serialize};

/// One subtitle line.
///
/// Entries keep the order of the source payload and are only built by the
/// parsers in [`super::parser`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionEntry {
    /// Start offset in seconds
    pub start: f64,
    /// Duration in seconds
    pub dur: f64,
    /// Trimmed caption text, possibly empty
    pub text: String,
}

impl CaptionEntry {
    pub(crate) fn new(start: f64, dur: f64, text: &str) -> Self {
        Self {
            start,
            dur,
            text: text.trim().to_string(),
        }
    }
}

/// A candidate caption source extracted from the player state of a watch page
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionTrack {
    /// Fetchable payload locator
    pub source_url: String,
    /// Language code such as `en` or `en-US`
    pub language_code: String,
    /// Display name shown by the player, if any
    pub name: Option<String>,
    /// Speech-recognition track (`kind == "asr"`)
    pub auto_generated: bool,
}

impl CaptionTrack {
    pub fn new(source_url: impl Into<String>, language_code: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            language_code: language_code.into(),
            name: None,
            auto_generated: false,
        }
    }

    /// Exact match, or the requested code is a prefix (`en` matches `en-US`)
    pub fn matches_language(&self, lang: &str) -> bool {
        self.language_code == lang || self.language_code.starts_with(lang)
    }
}

/// Resolved transcript for one (video, language) pair.
///
/// Serializes to the response body of `GET /captions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptResult {
    #[serde(rename = "video")]
    pub video_id: String,
    #[serde(rename = "lang")]
    pub language_requested: String,
    pub captions: Vec<CaptionEntry>,
    #[serde(rename = "screenshot", skip_serializing_if = "Option::is_none", default)]
    pub screenshot_path: Option<String>,
}

impl TranscriptResult {
    pub fn new(video_id: &str, lang: &str, captions: Vec<CaptionEntry>) -> Self {
        Self {
            video_id: video_id.to_string(),
            language_requested: lang.to_string(),
            captions,
            screenshot_path: None,
        }
    }
}
