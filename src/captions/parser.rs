//! Caption payload parsers
//!
//! Two payload encodings are understood:
//! - timed-text XML: `<transcript><text start=".." dur="..">..</text>..</transcript>`
//!   in seconds, and the `<timedtext><body><p t=".." d="..">` variant in milliseconds
//! - JSON events: `{"events": [{"tStartMs": .., "dDurationMs": .., "segs": [{"utf8": ..}]}]}`
//!
//! Parsing never fails. Unusable numbers become `0`, missing text becomes an
//! empty string, and a payload without usable nodes yields an empty list.

use serde_json::Value;
use std::borrow::Cow;

use super::types::CaptionEntry;

// helper.
macro_rules! regex {
    ($re:literal $(,)?) => {{
        static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
        RE.get_or_init(|| regex::Regex::new($re).unwrap())
    }};
}

/// Declared encoding of a caption payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadFormat {
    TimedTextXml,
    JsonEvents,
}

impl PayloadFormat {
    /// Format declared by the `fmt` query parameter of a track locator
    pub fn from_locator(locator: &str) -> Option<Self> {
        let url = url::Url::parse(locator).ok()?;
        let fmt = url
            .query_pairs()
            .find(|(k, _)| k == "fmt")
            .map(|(_, v)| v.into_owned())?;
        match fmt.as_str() {
            "json3" => Some(PayloadFormat::JsonEvents),
            _ => Some(PayloadFormat::TimedTextXml),
        }
    }

    /// Pick a format from the locator, falling back to the response
    /// content type and finally to the first byte of the body.
    pub fn detect(locator: &str, content_type: Option<&str>, body: &str) -> Self {
        if let Some(format) = Self::from_locator(locator) {
            return format;
        }
        if content_type.is_some_and(|ct| ct.contains("json")) {
            return PayloadFormat::JsonEvents;
        }
        if body.trim_start().starts_with('{') {
            PayloadFormat::JsonEvents
        } else {
            PayloadFormat::TimedTextXml
        }
    }
}

/// One record of a JSON events payload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawEvent {
    pub t_start_ms: f64,
    pub d_duration_ms: f64,
    /// Segment texts; `None` when the record has no `segs` field
    pub segs: Option<Vec<String>>,
}

impl RawEvent {
    /// Lenient conversion from a JSON value
    pub fn from_value(value: &Value) -> Self {
        let segs = value.get("segs").and_then(Value::as_array).map(|segs| {
            segs.iter()
                .map(|seg| {
                    seg.get("utf8")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string()
                })
                .collect()
        });

        Self {
            t_start_ms: number_or_zero(value.get("tStartMs")),
            d_duration_ms: number_or_zero(value.get("dDurationMs")),
            segs,
        }
    }
}

/// Dispatch on the payload format
pub fn parse_payload(raw: &str, format: PayloadFormat) -> Vec<CaptionEntry> {
    match format {
        PayloadFormat::TimedTextXml => parse_xml_payload(raw),
        PayloadFormat::JsonEvents => parse_json_document(raw),
    }
}

/// Parse a timed-text XML document
pub fn parse_xml_payload(raw: &str) -> Vec<CaptionEntry> {
    let entries: Vec<CaptionEntry> = regex!(r"(?s)<text\b([^>]*?)(?:/>|>(.*?)</text>)")
        .captures_iter(raw)
        .map(|cap| {
            let attrs = cap.get(1).map_or("", |m| m.as_str());
            let start = seconds_or_zero(attribute(attrs, "start").as_deref());
            let dur = seconds_or_zero(attribute(attrs, "dur").as_deref());
            let text = cap.get(2).map_or(Cow::Borrowed(""), |m| inner_text(m.as_str()));
            CaptionEntry::new(start, dur, &text)
        })
        .collect();

    if !entries.is_empty() || !raw.contains("<timedtext") {
        return entries;
    }

    regex!(r"(?s)<p\b([^>]*?)(?:/>|>(.*?)</p>)")
        .captures_iter(raw)
        .map(|cap| {
            let attrs = cap.get(1).map_or("", |m| m.as_str());
            let start = seconds_or_zero(attribute(attrs, "t").as_deref()) / 1000.0;
            let dur = seconds_or_zero(attribute(attrs, "d").as_deref()) / 1000.0;
            let text = cap.get(2).map_or(Cow::Borrowed(""), |m| inner_text(m.as_str()));
            CaptionEntry::new(start, dur, &text)
        })
        .collect()
}

/// Parse a JSON events document
pub fn parse_json_document(raw: &str) -> Vec<CaptionEntry> {
    let doc: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!(error = %e, "caption payload is not valid JSON");
            return Vec::new();
        }
    };

    let events = match &doc {
        Value::Array(events) => events.as_slice(),
        _ => doc
            .get("events")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default(),
    };

    let events: Vec<RawEvent> = events.iter().map(RawEvent::from_value).collect();
    parse_json_events_payload(&events)
}

/// Convert JSON event records, dropping records without segments
pub fn parse_json_events_payload(events: &[RawEvent]) -> Vec<CaptionEntry> {
    events
        .iter()
        .filter_map(|event| {
            let segs = event.segs.as_ref()?;
            let text: String = segs.concat();
            Some(CaptionEntry::new(
                non_negative(event.t_start_ms / 1000.0),
                non_negative(event.d_duration_ms / 1000.0),
                &text,
            ))
        })
        .collect()
}

fn attribute(attrs: &str, name: &str) -> Option<String> {
    regex!(r#"([A-Za-z_:][-\w:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .captures_iter(attrs)
        .find(|cap| &cap[1] == name)
        .and_then(|cap| cap.get(2).or_else(|| cap.get(3)))
        .map(|m| m.as_str().to_string())
}

/// Inner text is escaped twice: once for the XML document and once more for
/// the HTML the player renders. Markup exposed by the first pass is dropped.
fn inner_text(raw: &str) -> Cow<'_, str> {
    let decoded = html_escape::decode_html_entities(raw);
    if !decoded.contains('&') && !decoded.contains('<') {
        return decoded;
    }
    let stripped = regex!(r"<[^>]*>").replace_all(&decoded, "");
    Cow::Owned(html_escape::decode_html_entities(&stripped).into_owned())
}

fn seconds_or_zero(value: Option<&str>) -> f64 {
    value
        .and_then(|v| v.trim().parse::<f64>().ok())
        .map(non_negative)
        .unwrap_or(0.0)
}

fn number_or_zero(value: Option<&Value>) -> f64 {
    let n = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    n.map(non_negative).unwrap_or(0.0)
}

fn non_negative(n: f64) -> f64 {
    if n.is_finite() && n > 0.0 {
        n
    } else {
        0.0
    }
}
