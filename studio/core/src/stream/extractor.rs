//! Event-to-Delta Extraction
//!
//! Interprets each decoded event record as a JSON envelope `{"text": "..."}`
//! and yields the text fragment it carries. A record that fails to parse is
//! logged and skipped; it never aborts the stream.
//!
//! A scalar `text` (number, boolean) is appended as its JSON text, the way
//! string concatenation in the generator's web client treats it. Absent or
//! null yields an empty fragment; arrays and objects are malformed.

use serde::Deserialize;
use serde_json::Value;

use super::decoder::SseEvent;

/// Longest data preview included in malformed-record logs
const PREVIEW_CHARS: usize = 80;

/// JSON envelope carried in each data record
#[derive(Debug, Deserialize)]
struct DeltaEnvelope {
    #[serde(default)]
    text: Value,
}

impl DeltaEnvelope {
    fn into_fragment(self) -> Option<String> {
        match self.text {
            Value::String(text) => Some(text),
            Value::Null => Some(String::new()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Array(_) | Value::Object(_) => None,
        }
    }
}

/// Extraction counters
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExtractorStats {
    /// Event records seen
    pub events: u64,
    /// Fragments produced
    pub fragments: u64,
    /// Records skipped because their data was not a valid envelope
    pub malformed: u64,
    /// Total fragment bytes produced
    pub bytes: u64,
}

/// Turns decoded frames into text fragments
#[derive(Debug, Default)]
pub struct DeltaExtractor {
    stats: ExtractorStats,
}

impl DeltaExtractor {
    /// Create a new extractor
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Extraction counters
    #[must_use]
    pub fn stats(&self) -> ExtractorStats {
        self.stats
    }

    /// Extract the text fragment from one event record
    ///
    /// Returns `None` for malformed records. A record whose envelope has no
    /// `text` (or a null one) yields an empty fragment.
    pub fn extract(&mut self, event: &SseEvent) -> Option<String> {
        self.stats.events += 1;

        let parsed = serde_json::from_str::<DeltaEnvelope>(&event.data)
            .map_err(|e| e.to_string())
            .and_then(|envelope| {
                envelope
                    .into_fragment()
                    .ok_or_else(|| "text is not a scalar".to_string())
            });

        match parsed {
            Ok(text) => {
                self.stats.fragments += 1;
                self.stats.bytes += text.len() as u64;
                Some(text)
            }
            Err(error) => {
                self.stats.malformed += 1;
                tracing::warn!(
                    %error,
                    event = %event.event,
                    preview = %preview(&event.data),
                    "Skipping malformed event record"
                );
                None
            }
        }
    }
}

fn preview(data: &str) -> String {
    let mut chars = data.chars();
    let mut out: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        out.push('…');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(data: &str) -> SseEvent {
        SseEvent {
            event: "message".to_string(),
            data: data.to_string(),
            id: None,
        }
    }

    #[test]
    fn test_extracts_text() {
        let mut extractor = DeltaExtractor::new();
        assert_eq!(
            extractor.extract(&frame(r#"{"text":"function "}"#)),
            Some("function ".to_string())
        );
        assert_eq!(extractor.stats().fragments, 1);
        assert_eq!(extractor.stats().bytes, 9);
    }

    #[test]
    fn test_missing_or_null_text_is_empty() {
        let mut extractor = DeltaExtractor::new();
        assert_eq!(extractor.extract(&frame(r#"{"other":1}"#)), Some(String::new()));
        assert_eq!(extractor.extract(&frame(r#"{"text":null}"#)), Some(String::new()));
    }

    #[test]
    fn test_malformed_record_skipped() {
        let mut extractor = DeltaExtractor::new();
        assert_eq!(extractor.extract(&frame(r#"{"text":"#)), None);
        assert_eq!(extractor.extract(&frame("not json")), None);
        assert_eq!(extractor.extract(&frame(r#"{"text":"ok"}"#)), Some("ok".to_string()));

        let stats = extractor.stats();
        assert_eq!(stats.events, 3);
        assert_eq!(stats.malformed, 2);
        assert_eq!(stats.fragments, 1);
    }

    #[test]
    fn test_scalar_text_appended_as_written() {
        let mut extractor = DeltaExtractor::new();
        assert_eq!(extractor.extract(&frame(r#"{"text":42}"#)), Some("42".to_string()));
        assert_eq!(extractor.extract(&frame(r#"{"text":true}"#)), Some("true".to_string()));
        assert_eq!(extractor.stats().fragments, 2);
        assert_eq!(extractor.stats().malformed, 0);
    }

    #[test]
    fn test_structured_text_is_malformed() {
        let mut extractor = DeltaExtractor::new();
        assert_eq!(extractor.extract(&frame(r#"{"text":["a"]}"#)), None);
        assert_eq!(extractor.extract(&frame(r#"{"text":{"a":1}}"#)), None);
        assert_eq!(extractor.stats().malformed, 2);
    }

    #[test]
    fn test_preview_truncates() {
        let long = "x".repeat(200);
        let p = preview(&long);
        assert_eq!(p.chars().count(), PREVIEW_CHARS + 1);
        assert!(p.ends_with('…'));
        assert_eq!(preview("short"), "short");
    }
}
