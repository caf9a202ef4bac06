//! Studio - The Request Orchestrator
//!
//! The Studio drives one generation or revision cycle at a time:
//! - asks the session for the outbound request
//! - opens the backend stream
//! - decodes the body into event records and pushes each through the
//!   extractor and accumulator
//! - publishes coalesced artifact updates to the surface
//! - commits or rolls back the session when the stream ends
//!
//! # Design Philosophy
//!
//! The Studio is surface-agnostic. Everything a surface needs arrives as a
//! [`StudioMessage`] on the channel handed to [`Studio::new`]. A surface that
//! wants to cancel a cycle holds a [`CancelHandle`] from
//! [`Studio::cancel_handle`].
//!
//! # Failure Path
//!
//! Transport errors, non-success statuses, idle timeouts and cancellation all
//! end the same way: the session rolls back to its previous idle status, the
//! last good artifact is published again, and a `Failed` message follows.
//! No partial assistant message ever reaches the conversation.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::backend::{ByteStream, GenerationBackend, GenerationRequest};
use crate::error::StudioError;
use crate::messages::{NotifyLevel, SessionId, Status, StudioMessage};
use crate::session::{CycleKind, Session, SessionMeta, DEFAULT_MAX_PROMPT_BYTES};
use crate::stream::{
    sse_events, Accumulator, CoalescePolicy, DeltaExtractor, SseEvent, DEFAULT_MAX_RECORD_BYTES,
};

/// Default idle timeout between body chunks
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(120);

/// Studio runtime configuration
#[derive(Clone, Debug)]
pub struct StudioConfig {
    /// How mid-stream artifact updates are coalesced
    pub coalesce: CoalescePolicy,
    /// Longest wait for the next body chunk (`None` = wait forever)
    pub idle_timeout: Option<Duration>,
    /// Largest event record passed on; larger records are dropped
    pub max_record_bytes: usize,
    /// Largest accepted prompt (0 = unlimited)
    pub max_prompt_bytes: usize,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            coalesce: CoalescePolicy::default(),
            idle_timeout: Some(DEFAULT_IDLE_TIMEOUT),
            max_record_bytes: DEFAULT_MAX_RECORD_BYTES,
            max_prompt_bytes: DEFAULT_MAX_PROMPT_BYTES,
        }
    }
}

/// Outcome of a successful cycle
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CycleSummary {
    /// Status after the cycle (`Created` or `Updated`)
    pub status: Status,
    /// Final artifact length in bytes
    pub artifact_len: usize,
    /// Fragments extracted from the stream
    pub fragments: u64,
    /// Malformed records skipped
    pub malformed: u64,
    /// Wall time from request to final publish
    pub elapsed: Duration,
}

/// Cancels whichever cycle is in flight
///
/// Every cycle runs under a fresh token, so a cancel that lands while idle,
/// or after a cycle's body has ended, never reaches a later cycle.
#[derive(Clone, Debug, Default)]
pub struct CancelHandle {
    current: Arc<Mutex<CancellationToken>>,
}

impl CancelHandle {
    /// Cancel the cycle in flight; no effect while idle
    pub fn cancel(&self) {
        self.current.lock().cancel();
    }

    /// Whether the current token has been cancelled
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.current.lock().is_cancelled()
    }

    /// Install and return a fresh token
    fn renew(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *self.current.lock() = token.clone();
        token
    }
}

/// The Studio - headless generation orchestrator
pub struct Studio<B: GenerationBackend> {
    /// Runtime configuration
    config: StudioConfig,
    /// Generation backend
    backend: Arc<B>,
    /// Current session
    session: Session,
    /// Artifact buffer for the cycle in flight
    accumulator: Accumulator,
    /// Channel to the rendering surface
    tx: mpsc::Sender<StudioMessage>,
    /// Cancels the cycle in flight
    cancel: CancelHandle,
}

impl<B: GenerationBackend> Studio<B> {
    /// Create a new Studio with the given backend
    pub fn new(backend: B, config: StudioConfig, tx: mpsc::Sender<StudioMessage>) -> Self {
        Self {
            session: Session::with_max_prompt_bytes(config.max_prompt_bytes),
            accumulator: Accumulator::new(config.coalesce),
            backend: Arc::new(backend),
            config,
            tx,
            cancel: CancelHandle::default(),
        }
    }

    /// Get the backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Get the session
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Get the session ID
    pub fn session_id(&self) -> &SessionId {
        self.session.id()
    }

    /// Get current status
    pub fn status(&self) -> Status {
        self.session.status()
    }

    /// Artifact from the last successful cycle
    pub fn artifact(&self) -> &str {
        self.session.artifact()
    }

    /// Handle that cancels the cycle in flight
    ///
    /// The handle stays valid for the life of the Studio.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Generate a new app from `prompt`
    ///
    /// `model` and `framework` are fixed for the rest of the session.
    ///
    /// # Errors
    ///
    /// `StudioError::Session` if the session refuses (nothing is sent).
    /// Any other error means the cycle failed and the session was rolled back.
    pub async fn start_creation(
        &mut self,
        prompt: impl Into<String>,
        model: impl Into<String>,
        framework: impl Into<String>,
    ) -> Result<CycleSummary, StudioError> {
        let meta = SessionMeta::new(model, framework);
        let request = match self.session.begin_creation(prompt, meta) {
            Ok(request) => request,
            Err(e) => return Err(self.refuse(e.into()).await),
        };
        self.run_cycle(CycleKind::Creation, request).await
    }

    /// Revise the current app with a follow-up instruction
    ///
    /// # Errors
    ///
    /// `StudioError::Session` before the first successful creation or for a
    /// rejected prompt. Any other error means the cycle failed and the
    /// session was rolled back.
    pub async fn start_revision(
        &mut self,
        prompt: impl Into<String>,
    ) -> Result<CycleSummary, StudioError> {
        let request = match self.session.begin_revision(prompt) {
            Ok(request) => request,
            Err(e) => return Err(self.refuse(e.into()).await),
        };
        self.run_cycle(CycleKind::Revision, request).await
    }

    /// Discard the session and start over
    pub async fn reset(&mut self) {
        self.session.reset();
        self.accumulator.reset();
        tracing::info!(session = %self.session.id(), "Session reset");
        self.send(StudioMessage::StatusChanged {
            status: self.session.status(),
        })
        .await;
    }

    async fn run_cycle(
        &mut self,
        kind: CycleKind,
        request: GenerationRequest,
    ) -> Result<CycleSummary, StudioError> {
        let span = tracing::info_span!(
            "cycle",
            kind = %kind,
            session = %self.session.id(),
            backend = self.backend.name(),
        );
        let cancel = self.cancel.renew();
        let result = self.drive(request, cancel).instrument(span).await;
        self.cancel.renew();
        result
    }

    async fn drive(
        &mut self,
        request: GenerationRequest,
        cancel: CancellationToken,
    ) -> Result<CycleSummary, StudioError> {
        let started = Instant::now();

        // Drop anything pending from the previous cycle
        self.accumulator.reset();
        self.send(StudioMessage::StatusChanged {
            status: self.session.status(),
        })
        .await;

        let mut extractor = DeltaExtractor::new();
        let outcome = self.stream_body(&request, &mut extractor, &cancel).await;

        if let Err(error) = outcome {
            return Err(self.fail_cycle(error).await);
        }

        let artifact = self.accumulator.flush();
        let status = self.session.complete(artifact.clone())?;
        let extracted = extractor.stats();
        let summary = CycleSummary {
            status,
            artifact_len: artifact.len(),
            fragments: extracted.fragments,
            malformed: extracted.malformed,
            elapsed: started.elapsed(),
        };

        if artifact.is_empty() {
            self.notify(NotifyLevel::Warning, "The generator returned an empty artifact")
                .await;
        }
        self.send(StudioMessage::Artifact {
            content: artifact,
            status,
            is_final: true,
        })
        .await;
        self.send(StudioMessage::StatusChanged { status }).await;

        tracing::info!(
            status = %status,
            artifact_bytes = summary.artifact_len,
            fragments = summary.fragments,
            malformed = summary.malformed,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Cycle completed"
        );
        Ok(summary)
    }

    /// Read loop: runs until the body ends or something fails
    async fn stream_body(
        &mut self,
        request: &GenerationRequest,
        extractor: &mut DeltaExtractor,
        cancel: &CancellationToken,
    ) -> Result<(), StudioError> {
        let backend = Arc::clone(&self.backend);
        let body = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(StudioError::Cancelled),
            opened = backend.open_stream(request) => opened?,
        };
        let mut events = sse_events(
            with_idle_timeout(body, self.config.idle_timeout),
            self.config.max_record_bytes,
        );

        loop {
            let deadline = self.accumulator.deadline();
            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(StudioError::Cancelled),
                () = publish_due(deadline) => {
                    if let Some(content) = self.accumulator.take_due(Instant::now()) {
                        self.send(StudioMessage::Artifact {
                            content,
                            status: self.session.status(),
                            is_final: false,
                        })
                        .await;
                    }
                }
                event = events.next() => match event.transpose()? {
                    Some(event) => self.ingest(&event, extractor),
                    None => return Ok(()),
                },
            }
        }
    }

    fn ingest(&mut self, event: &SseEvent, extractor: &mut DeltaExtractor) {
        if let Some(fragment) = extractor.extract(event) {
            if !fragment.is_empty() {
                self.accumulator.append(&fragment);
                self.accumulator.request_publish(Instant::now());
            }
        }
    }

    /// Roll back and report; returns the error for the caller
    async fn fail_cycle(&mut self, error: StudioError) -> StudioError {
        self.accumulator.cancel();
        let status = self.session.fail();

        if matches!(error, StudioError::Cancelled) {
            tracing::info!(status = %status, "Cycle cancelled, session rolled back");
        } else {
            tracing::warn!(error = %error, status = %status, "Cycle failed, session rolled back");
        }

        self.send(StudioMessage::Artifact {
            content: self.session.artifact().to_string(),
            status,
            is_final: true,
        })
        .await;
        self.send(StudioMessage::Failed {
            error: error.user_message(),
            status,
        })
        .await;
        self.send(StudioMessage::StatusChanged { status }).await;
        error
    }

    /// Report a request the session refused
    async fn refuse(&self, error: StudioError) -> StudioError {
        tracing::warn!(error = %error, status = %self.session.status(), "Request refused");
        self.notify(NotifyLevel::Warning, &error.user_message()).await;
        error
    }

    /// Send notification
    async fn notify(&self, level: NotifyLevel, text: &str) {
        self.send(StudioMessage::Notice {
            level,
            text: text.to_string(),
        })
        .await;
    }

    /// Send a message to the surface
    async fn send(&self, msg: StudioMessage) {
        if let Err(e) = self.tx.send(msg).await {
            tracing::warn!("Failed to send message to surface: {}", e);
        }
    }
}

/// Resolves when a pending publish is due; never resolves without one
async fn publish_due(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Body chunks, failing once none arrives within the idle timeout
fn with_idle_timeout(
    body: ByteStream,
    idle_timeout: Option<Duration>,
) -> BoxStream<'static, Result<Bytes, StudioError>> {
    let body = body.map_err(StudioError::from);
    match idle_timeout {
        Some(limit) => tokio_stream::StreamExt::timeout(body, limit)
            .map(move |chunk| chunk.unwrap_or_else(|_| Err(StudioError::IdleTimeout(limit))))
            .boxed(),
        None => body.boxed(),
    }
}
