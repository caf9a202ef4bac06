//! Session State Machine
//!
//! A session runs from the first creation request through any number of
//! revisions. It owns the conversation history, the status, and the
//! parameters (model, framework) chosen at creation time.
//!
//! # Transitions
//!
//! ```text
//!  Initial ──create──► Creating ──complete──► Created ──revise──► Updating
//!     ▲                   │                                        │  ▲
//!     └──────fail─────────┘             Created/Updated ◄──fail────┘  │
//!                                       Updated ◄──complete───────────┘
//!                                       Updated ──revise──► Updating
//! ```
//!
//! A failed cycle rolls the conversation back to where it was before the
//! cycle began, so history never holds a user message without its answer.

use serde::{Deserialize, Serialize};

use crate::backend::GenerationRequest;
use crate::error::SessionError;
use crate::messages::{ConversationMessage, SessionId, Status};

/// Default maximum prompt size in bytes (32 KiB)
pub const DEFAULT_MAX_PROMPT_BYTES: usize = 32 * 1024;

/// Parameters fixed for the whole session once creation starts
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMeta {
    /// Backend model identifier
    pub model: String,
    /// Target framework identifier (opaque to the core)
    pub framework: String,
}

impl SessionMeta {
    /// Create session parameters
    pub fn new(model: impl Into<String>, framework: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            framework: framework.into(),
        }
    }
}

/// Which kind of cycle is in flight
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleKind {
    /// First generation
    Creation,
    /// Follow-up modification
    Revision,
}

impl CycleKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Creation => "creation",
            Self::Revision => "revision",
        }
    }
}

impl std::fmt::Display for CycleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bookkeeping for the cycle in flight
#[derive(Clone, Debug)]
struct Cycle {
    kind: CycleKind,
    /// Conversation length before the cycle's user message
    rollback_len: usize,
    /// Status to return to on failure
    prior: Status,
}

/// A generation session
#[derive(Clone, Debug)]
pub struct Session {
    id: SessionId,
    status: Status,
    conversation: Vec<ConversationMessage>,
    meta: Option<SessionMeta>,
    /// Artifact from the last successful cycle
    artifact: String,
    cycle: Option<Cycle>,
    /// Maximum prompt size in bytes (0 = unlimited)
    max_prompt_bytes: usize,
    completed_cycles: u32,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Create a new session with the default prompt limit
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_prompt_bytes(DEFAULT_MAX_PROMPT_BYTES)
    }

    /// Create a new session with a prompt size limit (0 = unlimited)
    #[must_use]
    pub fn with_max_prompt_bytes(max_prompt_bytes: usize) -> Self {
        Self {
            id: SessionId::new(),
            status: Status::Initial,
            conversation: Vec::new(),
            meta: None,
            artifact: String::new(),
            cycle: None,
            max_prompt_bytes,
            completed_cycles: 0,
        }
    }

    /// Session ID
    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Current status
    #[must_use]
    pub fn status(&self) -> Status {
        self.status
    }

    /// Conversation history
    #[must_use]
    pub fn conversation(&self) -> &[ConversationMessage] {
        &self.conversation
    }

    /// Parameters captured at creation, if creation has started
    #[must_use]
    pub fn meta(&self) -> Option<&SessionMeta> {
        self.meta.as_ref()
    }

    /// Artifact from the last successful cycle
    #[must_use]
    pub fn artifact(&self) -> &str {
        &self.artifact
    }

    /// Kind of the cycle in flight, if any
    #[must_use]
    pub fn in_flight(&self) -> Option<CycleKind> {
        self.cycle.as_ref().map(|c| c.kind)
    }

    /// Number of cycles that completed successfully
    #[must_use]
    pub fn completed_cycles(&self) -> u32 {
        self.completed_cycles
    }

    /// Start the first generation
    ///
    /// Records `meta` for the rest of the session, appends the user message
    /// and moves to `Creating`. Returns the request to send.
    ///
    /// # Errors
    ///
    /// `Busy` while a cycle is in flight, `InvalidTransition` once an app
    /// exists (call [`Session::reset`] to start over), or a prompt error.
    pub fn begin_creation(
        &mut self,
        prompt: impl Into<String>,
        meta: SessionMeta,
    ) -> Result<GenerationRequest, SessionError> {
        self.ensure_idle()?;
        if self.status != Status::Initial {
            return Err(SessionError::InvalidTransition {
                from: self.status,
                action: "create",
            });
        }
        let prompt = self.validate_prompt(prompt.into())?;

        self.cycle = Some(Cycle {
            kind: CycleKind::Creation,
            rollback_len: self.conversation.len(),
            prior: self.status,
        });
        self.conversation.push(ConversationMessage::user(prompt));
        self.meta = Some(meta);
        self.status = Status::Creating;

        tracing::debug!(session = %self.id, "Creation started");
        Ok(self.outbound())
    }

    /// Start a revision of the current artifact
    ///
    /// Appends the user message, moves to `Updating`, and returns a request
    /// carrying the whole conversation with the parameters from creation.
    ///
    /// # Errors
    ///
    /// `Busy` while a cycle is in flight, `InvalidTransition` before the
    /// first successful creation, or a prompt error.
    pub fn begin_revision(
        &mut self,
        prompt: impl Into<String>,
    ) -> Result<GenerationRequest, SessionError> {
        self.ensure_idle()?;
        if !self.status.is_idle_with_artifact() || self.meta.is_none() {
            return Err(SessionError::InvalidTransition {
                from: self.status,
                action: "revise",
            });
        }
        let prompt = self.validate_prompt(prompt.into())?;

        self.cycle = Some(Cycle {
            kind: CycleKind::Revision,
            rollback_len: self.conversation.len(),
            prior: self.status,
        });
        self.conversation.push(ConversationMessage::user(prompt));
        self.status = Status::Updating;

        tracing::debug!(
            session = %self.id,
            messages = self.conversation.len(),
            "Revision started"
        );
        Ok(self.outbound())
    }

    /// Finish the cycle in flight with the accumulated artifact
    ///
    /// Appends the assistant message and moves to `Created` or `Updated`.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` if no cycle is in flight.
    pub fn complete(&mut self, artifact: impl Into<String>) -> Result<Status, SessionError> {
        let Some(cycle) = self.cycle.take() else {
            return Err(SessionError::InvalidTransition {
                from: self.status,
                action: "complete",
            });
        };

        let artifact = artifact.into();
        self.conversation
            .push(ConversationMessage::assistant(artifact.clone()));
        self.artifact = artifact;
        self.status = match cycle.kind {
            CycleKind::Creation => Status::Created,
            CycleKind::Revision => Status::Updated,
        };
        self.completed_cycles += 1;

        tracing::debug!(
            session = %self.id,
            status = %self.status,
            artifact_bytes = self.artifact.len(),
            "Cycle completed"
        );
        Ok(self.status)
    }

    /// Abandon the cycle in flight
    ///
    /// Drops the cycle's user message and returns to the idle status that
    /// preceded it. A failed creation also forgets the session parameters.
    /// Without a cycle in flight this is a no-op. Returns the resulting status.
    pub fn fail(&mut self) -> Status {
        if let Some(cycle) = self.cycle.take() {
            self.conversation.truncate(cycle.rollback_len);
            self.status = cycle.prior;
            if cycle.kind == CycleKind::Creation {
                self.meta = None;
            }
            tracing::debug!(
                session = %self.id,
                kind = %cycle.kind,
                status = %self.status,
                "Cycle rolled back"
            );
        }
        self.status
    }

    /// Start over with a fresh session
    ///
    /// The prompt limit is kept; everything else is discarded.
    pub fn reset(&mut self) {
        *self = Self::with_max_prompt_bytes(self.max_prompt_bytes);
    }

    /// Request payload for the current conversation
    fn outbound(&self) -> GenerationRequest {
        let meta = self.meta.clone().unwrap_or_else(|| SessionMeta::new("", ""));
        GenerationRequest::new(self.conversation.clone(), meta.model, meta.framework)
    }

    fn ensure_idle(&self) -> Result<(), SessionError> {
        if self.cycle.is_some() || self.status.is_busy() {
            return Err(SessionError::Busy {
                status: self.status,
            });
        }
        Ok(())
    }

    fn validate_prompt(&self, prompt: String) -> Result<String, SessionError> {
        if prompt.trim().is_empty() {
            return Err(SessionError::EmptyPrompt);
        }
        if self.max_prompt_bytes > 0 && prompt.len() > self.max_prompt_bytes {
            return Err(SessionError::PromptTooLarge {
                len: prompt.len(),
                max: self.max_prompt_bytes,
            });
        }
        Ok(prompt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::MessageRole;

    fn meta() -> SessionMeta {
        SessionMeta::new("M", "react")
    }

    fn created_session() -> Session {
        let mut session = Session::new();
        session
            .begin_creation("Build me a calculator app...", meta())
            .unwrap();
        session.complete("function App(){}").unwrap();
        session
    }

    #[test]
    fn test_session_creation() {
        let session = Session::new();
        assert_eq!(session.status(), Status::Initial);
        assert!(session.conversation().is_empty());
        assert!(session.meta().is_none());
        assert!(session.in_flight().is_none());
    }

    #[test]
    fn test_creation_cycle() {
        let mut session = Session::new();

        let request = session
            .begin_creation("Build me a calculator app...", meta())
            .unwrap();
        assert_eq!(session.status(), Status::Creating);
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.model, "M");
        assert_eq!(request.framework, "react");

        let status = session.complete("function App(){}").unwrap();
        assert_eq!(status, Status::Created);

        let conv = session.conversation();
        assert_eq!(conv.len(), 2);
        assert_eq!(conv[0].role(), MessageRole::User);
        assert_eq!(conv[0].content(), "Build me a calculator app...");
        assert_eq!(conv[1].role(), MessageRole::Assistant);
        assert_eq!(conv[1].content(), "function App(){}");
        assert_eq!(session.artifact(), "function App(){}");
    }

    #[test]
    fn test_revision_carries_full_history() {
        let mut session = created_session();

        let request = session.begin_revision("make it pink").unwrap();
        assert_eq!(session.status(), Status::Updating);
        assert_eq!(request.messages.len(), 3);
        assert_eq!(request.messages[2].content(), "make it pink");
        assert_eq!(request.model, "M");
        assert_eq!(request.framework, "react");

        assert_eq!(session.complete("pink").unwrap(), Status::Updated);
        assert_eq!(session.conversation().len(), 4);

        session.begin_revision("bigger buttons").unwrap();
        assert_eq!(session.complete("big").unwrap(), Status::Updated);
        assert_eq!(session.conversation().len(), 6);
        assert_eq!(session.completed_cycles(), 3);
    }

    #[test]
    fn test_meta_fixed_after_creation() {
        let mut session = created_session();
        session.begin_revision("again").unwrap();
        assert_eq!(session.meta(), Some(&meta()));
    }

    #[test]
    fn test_revision_requires_artifact() {
        let mut session = Session::new();
        assert_eq!(
            session.begin_revision("make it pink"),
            Err(SessionError::InvalidTransition {
                from: Status::Initial,
                action: "revise",
            })
        );
    }

    #[test]
    fn test_creation_only_from_initial() {
        let mut session = created_session();
        assert!(matches!(
            session.begin_creation("another app", meta()),
            Err(SessionError::InvalidTransition {
                from: Status::Created,
                ..
            })
        ));
    }

    #[test]
    fn test_busy_guard() {
        let mut session = created_session();
        session.begin_revision("one").unwrap();
        assert_eq!(
            session.begin_revision("two"),
            Err(SessionError::Busy {
                status: Status::Updating
            })
        );
        assert_eq!(session.conversation().len(), 3);
    }

    #[test]
    fn test_failed_creation_rolls_back_to_initial() {
        let mut session = Session::new();
        session.begin_creation("app", meta()).unwrap();

        assert_eq!(session.fail(), Status::Initial);
        assert!(session.conversation().is_empty());
        assert!(session.meta().is_none());

        // A new creation may pick different parameters
        session
            .begin_creation("app", SessionMeta::new("other", "vue"))
            .unwrap();
        assert_eq!(session.meta().map(|m| m.framework.as_str()), Some("vue"));
    }

    #[test]
    fn test_failed_revision_restores_prior_idle_state() {
        let mut session = created_session();
        session.begin_revision("pink").unwrap();
        session.complete("pink").unwrap();
        session.begin_revision("broken").unwrap();

        assert_eq!(session.fail(), Status::Updated);
        assert_eq!(session.conversation().len(), 4);
        assert_eq!(session.artifact(), "pink");
        assert_eq!(session.meta(), Some(&meta()));
    }

    #[test]
    fn test_fail_without_cycle_is_noop() {
        let mut session = created_session();
        assert_eq!(session.fail(), Status::Created);
        assert_eq!(session.conversation().len(), 2);
    }

    #[test]
    fn test_complete_without_cycle_rejected() {
        let mut session = Session::new();
        assert!(session.complete("x").is_err());
    }

    #[test]
    fn test_prompt_validation() {
        let mut session = Session::with_max_prompt_bytes(8);
        assert_eq!(
            session.begin_creation("   ", meta()),
            Err(SessionError::EmptyPrompt)
        );
        assert_eq!(
            session.begin_creation("way too long", meta()),
            Err(SessionError::PromptTooLarge { len: 12, max: 8 })
        );
        assert_eq!(session.status(), Status::Initial);
        assert!(session.conversation().is_empty());
    }

    #[test]
    fn test_empty_artifact_completes() {
        let mut session = Session::new();
        session.begin_creation("app", meta()).unwrap();
        assert_eq!(session.complete("").unwrap(), Status::Created);
        assert_eq!(session.conversation()[1].content(), "");
    }

    #[test]
    fn test_reset_starts_fresh() {
        let mut session = created_session();
        let old_id = session.id().clone();

        session.reset();

        assert_ne!(session.id(), &old_id);
        assert_eq!(session.status(), Status::Initial);
        assert!(session.conversation().is_empty());
        assert!(session.meta().is_none());
        assert!(session.artifact().is_empty());
    }
}
