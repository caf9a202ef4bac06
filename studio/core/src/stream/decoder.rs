//! Server-Sent Events Decoder
//!
//! Turns a `text/event-stream` body into discrete event records. Framing is
//! done by `eventsource-stream`; this module prepares the bytes it sees and
//! filters what it yields.
//!
//! # Wire Format
//!
//! ```text
//! event: delta\n
//! data: {"text":"function "}\n
//! \n
//! ```
//!
//! Records are blank-line terminated. Lines end in `\n`, `\r\n` or a lone `\r`.
//! Lines starting with `:` are comments. Multiple `data` lines are joined with
//! `\n`.
//!
//! # Body Preparation
//!
//! - Invalid UTF-8 becomes U+FFFD instead of failing the stream. A sequence
//!   split across chunks is held back until it completes.
//! - When the body ends right after a line terminator, the pending record is
//!   closed and dispatched. A record cut off mid-line is discarded.
//! - Records with no data, and records larger than `max_record_bytes`, are
//!   dropped.

use bytes::Bytes;
use eventsource_stream::{Event, EventStreamError, Eventsource};
use futures::stream::{self, BoxStream, Stream, StreamExt};

use crate::error::BackendError;

/// Default upper bound for a single record (8 MiB)
pub const DEFAULT_MAX_RECORD_BYTES: usize = 8 * 1024 * 1024;

/// Event type used when a record carries no `event:` field
pub const DEFAULT_EVENT_TYPE: &str = "message";

/// Closes a record whose last line was terminated
const CLOSE_RECORD: &str = "\n\n";

/// One dispatched event record
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SseEvent {
    /// Event type (`"message"` when absent)
    pub event: String,
    /// Data lines joined with `\n`
    pub data: String,
    /// Record id, if one has been set
    pub id: Option<String>,
}

impl From<Event> for SseEvent {
    fn from(event: Event) -> Self {
        Self {
            event: if event.event.is_empty() {
                DEFAULT_EVENT_TYPE.to_string()
            } else {
                event.event
            },
            data: event.data,
            id: (!event.id.is_empty()).then_some(event.id),
        }
    }
}

/// Decoded event records, in arrival order
pub type SseStream<E> = BoxStream<'static, Result<SseEvent, E>>;

/// Decode a body into event records
///
/// Transport errors from `body` pass through unchanged; framing errors become
/// [`BackendError::Stream`].
pub fn sse_events<S, E>(body: S, max_record_bytes: usize) -> SseStream<E>
where
    S: Stream<Item = Result<Bytes, E>> + Send + Unpin + 'static,
    E: From<BackendError> + Send + 'static,
{
    let max_record_bytes = max_record_bytes.max(1);

    prepare(body)
        .eventsource()
        .filter_map(move |item| {
            let accepted = match item {
                Ok(event) => accept(event, max_record_bytes).map(Ok),
                Err(EventStreamError::Transport(e)) => Some(Err(e)),
                Err(EventStreamError::Utf8(e)) => Some(Err(framing_error(&e))),
                Err(EventStreamError::Parser(e)) => Some(Err(framing_error(&e))),
            };
            futures::future::ready(accepted)
        })
        .boxed()
}

fn framing_error<E: From<BackendError>>(error: &dyn std::fmt::Display) -> E {
    E::from(BackendError::Stream(format!("malformed event stream: {error}")))
}

fn accept(event: Event, max_record_bytes: usize) -> Option<SseEvent> {
    if let Some(interval) = event.retry {
        tracing::trace!(?interval, "Ignoring retry directive");
    }
    if event.data.is_empty() {
        return None;
    }
    if event.data.len() > max_record_bytes {
        tracing::warn!(
            limit = max_record_bytes,
            bytes = event.data.len(),
            "Event record exceeds size limit, discarding"
        );
        return None;
    }
    Some(event.into())
}

/// Valid UTF-8 text for the framer, closed off at end of body
fn prepare<S, E>(body: S) -> impl Stream<Item = Result<String, E>> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send + Unpin,
    E: Send,
{
    stream::unfold(Some((body, BodyText::default())), |state| async move {
        let (mut body, mut text) = state?;
        match body.next().await {
            Some(Ok(chunk)) => Some((Ok(text.decode(&chunk)), Some((body, text)))),
            Some(Err(e)) => Some((Err(e), None)),
            None => text.finish().map(|tail| (Ok(tail), None)),
        }
    })
}

/// Byte-level state kept ahead of the framer
#[derive(Debug, Default)]
struct BodyText {
    /// Bytes of an incomplete trailing UTF-8 sequence
    utf8_tail: Vec<u8>,
    /// Last character handed on
    last: Option<char>,
}

impl BodyText {
    /// Decode a chunk, holding back an incomplete trailing sequence
    fn decode(&mut self, chunk: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.utf8_tail);
        bytes.extend_from_slice(chunk);

        let mut out = String::with_capacity(bytes.len());
        let mut rest: &[u8] = &bytes;
        while let Err(e) = std::str::from_utf8(rest) {
            let (valid, after) = rest.split_at(e.valid_up_to());
            out.push_str(&String::from_utf8_lossy(valid));
            match e.error_len() {
                Some(len) => {
                    out.push('\u{FFFD}');
                    rest = &after[len..];
                }
                None => {
                    self.utf8_tail = after.to_vec();
                    rest = &[];
                }
            }
        }
        out.push_str(&String::from_utf8_lossy(rest));

        if let Some(c) = out.chars().next_back() {
            self.last = Some(c);
        }
        out
    }

    /// Text that ends the body: a record close, or nothing
    fn finish(&mut self) -> Option<String> {
        let mid_line =
            !self.utf8_tail.is_empty() || !matches!(self.last, None | Some('\n' | '\r'));
        if mid_line {
            tracing::warn!("Discarding unterminated trailing event record");
            return None;
        }
        self.last.map(|_| CLOSE_RECORD.to_string())
    }
}
