//! Streaming Pipeline
//!
//! The three stages a generation response passes through on its way to the
//! surface:
//!
//! ```text
//!  bytes ──► sse_events ──► SseEvent ──► DeltaExtractor ──► fragment
//!                                                              │
//!                                                              ▼
//!                                   surface ◄── publish ── Accumulator
//! ```
//!
//! - [`sse_events`]: framing only. A byte stream in, event records out.
//! - [`DeltaExtractor`]: reads the `{"text": ...}` envelope, skips bad records.
//! - [`Accumulator`]: append-only artifact buffer with coalesced publishing.
//!
//! Decoding is a stream adapter. Extraction and accumulation are synchronous
//! and own their state; the orchestrator drives them from its async read loop
//! as records arrive.

mod accumulator;
mod decoder;
mod extractor;

pub use accumulator::{Accumulator, AccumulatorStats, CoalescePolicy, DEFAULT_COALESCE_WINDOW};
pub use decoder::{sse_events, SseEvent, SseStream, DEFAULT_EVENT_TYPE, DEFAULT_MAX_RECORD_BYTES};
pub use extractor::{DeltaExtractor, ExtractorStats};
