//! Replay Backend
//!
//! Serves recorded event-stream transcripts instead of calling a generator.
//! Each transcript is cut into fixed-size chunks so framing is exercised the
//! way a real network would: records split across chunk boundaries, multi-byte
//! characters split mid-sequence.
//!
//! Every request is recorded so callers can inspect exactly what would have
//! been sent.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;

use super::traits::{ByteStream, GenerationBackend, GenerationRequest};
use crate::error::BackendError;

/// Default chunk size for replayed bodies
pub const DEFAULT_CHUNK_SIZE: usize = 64;

/// How a replayed body ends
#[derive(Clone, Debug, PartialEq, Eq)]
enum Ending {
    /// Body closes normally
    Close,
    /// Body fails with a transport error
    Error(String),
    /// Body stays open without sending anything more
    Stall,
}

/// A recorded response body
#[derive(Clone, Debug)]
pub struct Transcript {
    body: Bytes,
    chunk_size: usize,
    chunk_delay: Duration,
    ending: Ending,
}

impl Transcript {
    /// Transcript that replays `body` and closes
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self {
            body: body.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_delay: Duration::ZERO,
            ending: Ending::Close,
        }
    }

    /// Build a transcript from text fragments, one `data:` record each
    pub fn from_fragments<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut body = String::new();
        for fragment in fragments {
            let record = serde_json::json!({ "text": fragment.as_ref() });
            body.push_str("data: ");
            body.push_str(&record.to_string());
            body.push_str("\n\n");
        }
        Self::new(body)
    }

    /// Chunk size in bytes (minimum 1)
    #[must_use]
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    /// Delay before each chunk
    #[must_use]
    pub fn chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    /// Fail with a transport error after the body
    #[must_use]
    pub fn fail_with(mut self, message: impl Into<String>) -> Self {
        self.ending = Ending::Error(message.into());
        self
    }

    /// Keep the body open after the last chunk
    #[must_use]
    pub fn stall(mut self) -> Self {
        self.ending = Ending::Stall;
        self
    }

    /// Recorded body
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    fn into_stream(self) -> ByteStream {
        let chunks: Vec<Bytes> = (0..self.body.len())
            .step_by(self.chunk_size)
            .map(|start| {
                let end = (start + self.chunk_size).min(self.body.len());
                self.body.slice(start..end)
            })
            .collect();

        let delay = self.chunk_delay;
        let body = stream::iter(chunks).then(move |chunk| async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            Ok::<_, BackendError>(chunk)
        });

        match self.ending {
            Ending::Close => body.boxed(),
            Ending::Error(message) => body
                .chain(stream::once(async move { Err(BackendError::Stream(message)) }))
                .boxed(),
            Ending::Stall => body.chain(stream::pending()).boxed(),
        }
    }
}

/// One scripted answer to a request
#[derive(Clone, Debug)]
pub enum ReplayResponse {
    /// Stream a transcript
    Stream(Transcript),
    /// Refuse with an HTTP-style status before streaming
    Reject {
        /// Status code
        status: u16,
        /// Error body
        body: String,
    },
}

impl From<Transcript> for ReplayResponse {
    fn from(transcript: Transcript) -> Self {
        Self::Stream(transcript)
    }
}

/// Backend that answers from recorded transcripts
///
/// Responses are used in order; once they run out the last one repeats.
#[derive(Debug)]
pub struct ReplayBackend {
    responses: Vec<ReplayResponse>,
    served: Mutex<usize>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ReplayBackend {
    /// Answer every request with `transcript`
    pub fn new(transcript: Transcript) -> Self {
        Self::sequence([ReplayResponse::Stream(transcript)])
    }

    /// Answer requests with `responses` in order
    pub fn sequence(responses: impl IntoIterator<Item = ReplayResponse>) -> Self {
        Self {
            responses: responses.into_iter().collect(),
            served: Mutex::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far
    #[must_use]
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().clone()
    }

    /// Number of requests received
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    fn next_response(&self) -> Option<ReplayResponse> {
        let mut served = self.served.lock();
        let index = (*served).min(self.responses.len().checked_sub(1)?);
        *served += 1;
        self.responses.get(index).cloned()
    }
}

#[async_trait]
impl GenerationBackend for ReplayBackend {
    fn name(&self) -> &'static str {
        "replay"
    }

    async fn open_stream(&self, request: &GenerationRequest) -> Result<ByteStream, BackendError> {
        self.requests.lock().push(request.clone());

        match self.next_response() {
            Some(ReplayResponse::Stream(transcript)) => {
                tracing::debug!(
                    bytes = transcript.body.len(),
                    chunk_size = transcript.chunk_size,
                    "Replaying transcript"
                );
                Ok(transcript.into_stream())
            }
            Some(ReplayResponse::Reject { status, body }) => {
                Err(BackendError::Status { status, body })
            }
            None => Err(BackendError::Network("no replay responses configured".to_string())),
        }
    }
}
