//! Property tests: decoding does not depend on how the body is chunked

use bytes::Bytes;
use futures::stream::{self, StreamExt};
use proptest::prelude::*;

use appstudio_core::stream::{
    sse_events, Accumulator, DeltaExtractor, SseEvent, DEFAULT_MAX_RECORD_BYTES,
};
use appstudio_core::BackendError;

/// Decode `body` split at the given cut points
fn decode(body: &[u8], cuts: &[usize]) -> Vec<SseEvent> {
    let mut chunks = Vec::with_capacity(cuts.len() + 1);
    let mut start = 0;
    for &cut in cuts {
        chunks.push(Ok::<_, BackendError>(Bytes::copy_from_slice(&body[start..cut])));
        start = cut;
    }
    chunks.push(Ok(Bytes::copy_from_slice(&body[start..])));

    let events = sse_events(stream::iter(chunks), DEFAULT_MAX_RECORD_BYTES);
    futures::executor::block_on(events.map(|e| e.unwrap()).collect())
}

fn cut_points(len: usize, raw: Vec<usize>) -> Vec<usize> {
    let mut cuts: Vec<usize> = raw.into_iter().map(|c| c % (len + 1)).collect();
    cuts.sort_unstable();
    cuts.dedup();
    cuts
}

fn fragment() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            Just("a".to_string()),
            Just("<div>".to_string()),
            Just("ñ".to_string()),
            Just("€".to_string()),
            Just("🦙".to_string()),
            Just("\n".to_string()),
            Just("\"".to_string()),
            "[a-z ]{1,6}",
        ],
        0..6,
    )
    .prop_map(|parts| parts.concat())
}

fn line_ending() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("\n"), Just("\r\n"), Just("\r")]
}

proptest! {
    #[test]
    fn prop_chunking_does_not_change_events(
        fragments in prop::collection::vec(fragment(), 0..8),
        eol in line_ending(),
        raw_cuts in prop::collection::vec(any::<usize>(), 0..24),
    ) {
        let mut body = String::new();
        for fragment in &fragments {
            let record = serde_json::json!({ "text": fragment });
            body.push_str(&format!("data: {record}{eol}{eol}"));
        }
        let bytes = body.as_bytes();

        let whole = decode(bytes, &[]);
        let cuts = cut_points(bytes.len(), raw_cuts);
        prop_assert_eq!(decode(bytes, &cuts), whole.clone());

        // One byte at a time
        let every: Vec<usize> = (1..bytes.len()).collect();
        prop_assert_eq!(decode(bytes, &every), whole.clone());

        // Extracted fragments concatenate to the artifact
        let mut extractor = DeltaExtractor::new();
        let mut accumulator = Accumulator::default();
        for event in &whole {
            if let Some(text) = extractor.extract(event) {
                accumulator.append(&text);
            }
        }
        prop_assert_eq!(accumulator.flush(), fragments.concat());
    }
}
