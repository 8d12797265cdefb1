//! Caption transcript pipeline
//!
//! - Track resolution through a browser session on the watch page
//! - Fetch-and-select over the candidate tracks with fallback
//! - Timed-text XML and JSON event payload parsing
//! - Optional watch page screenshot
//! - Orchestration with the transcript cache

pub mod parser;
pub mod resolver;
pub mod screenshot;
pub mod select;
pub mod service;
pub mod types;

pub use resolver::{TrackResolver, TrackSource};
pub use screenshot::{ScreenshotCapture, Screenshotter};
pub use select::{HttpPayloadFetcher, PayloadFetcher};
pub use service::{CacheStatus, CaptionRequest, CaptionService};
pub use types::{CaptionEntry, CaptionTrack, TranscriptResult};
