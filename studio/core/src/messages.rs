//! Studio Messages
//!
//! Types that cross the boundary between the studio core and whatever surface
//! renders its output (terminal, web view, editor plugin, test harness).
//!
//! # Design Philosophy
//!
//! The core never renders anything. It publishes [`StudioMessage`]s over a
//! channel and the surface decides what to do with them: write the artifact to
//! a file, refresh a preview, toggle a spinner. Surfaces hold no business
//! logic, so the same core drives a CLI today and a GUI tomorrow.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Messages from the studio core to a rendering surface
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StudioMessage {
    /// The session moved to a new status
    StatusChanged {
        /// The status now in effect
        status: Status,
    },

    /// A (coalesced) view of the artifact
    ///
    /// Mid-stream updates are rate limited. Exactly one update per cycle has
    /// `is_final` set, and its content is the complete artifact.
    Artifact {
        /// The artifact text accumulated so far
        content: String,
        /// Status at the time of publishing
        status: Status,
        /// Whether this is the unconditional end-of-stream publish
        is_final: bool,
    },

    /// A generation or revision cycle failed
    ///
    /// The session has already been rolled back to `status`.
    Failed {
        /// Human-readable error description
        error: String,
        /// The idle status the session was restored to
        status: Status,
    },

    /// Non-fatal notice for the user or the logs
    Notice {
        /// Severity
        level: NotifyLevel,
        /// Notice text
        text: String,
    },
}

/// Notification severity
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyLevel {
    /// Informational
    Info,
    /// Warning
    Warning,
    /// Error
    Error,
}

/// Session status
///
/// Exactly one status is active at any time. `Creating` and `Updating` are the
/// busy states; `Created` and `Updated` both mean "idle, artifact available".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// No app yet
    #[default]
    Initial,
    /// First generation in flight
    Creating,
    /// A generation is available
    Created,
    /// A revision is in flight
    Updating,
    /// A revision is available
    Updated,
}

impl Status {
    /// Whether a request is in flight
    #[must_use]
    pub fn is_busy(self) -> bool {
        matches!(self, Self::Creating | Self::Updating)
    }

    /// Whether the session is idle with an artifact that can be revised
    #[must_use]
    pub fn is_idle_with_artifact(self) -> bool {
        matches!(self, Self::Created | Self::Updated)
    }

    /// Lowercase wire name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Creating => "creating",
            Self::Created => "created",
            Self::Updating => "updating",
            Self::Updated => "updated",
        }
    }

    /// Human-readable description for status lines
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::Initial => "Describe an app to get started",
            Self::Creating => "Building your app...",
            Self::Created => "App ready",
            Self::Updating => "Updating your app...",
            Self::Updated => "App updated",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who sent a conversation message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// The person describing the app
    User,
    /// The code-generation backend
    Assistant,
}

impl MessageRole {
    /// Lowercase wire name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One entry in the conversation history
///
/// Immutable once created. Only `role` and `content` are sent to the backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMessage {
    role: MessageRole,
    content: String,
    #[serde(skip_serializing, default = "Utc::now")]
    created_at: DateTime<Utc>,
}

impl ConversationMessage {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    /// Who sent this message
    #[must_use]
    pub fn role(&self) -> MessageRole {
        self.role
    }

    /// Message text
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// When the message was recorded locally
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Session identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    /// Generate a new unique session ID
    #[must_use]
    pub fn new() -> Self {
        Self(format!("session_{}", uuid::Uuid::new_v4().simple()))
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_unique() {
        let id1 = SessionId::new();
        let id2 = SessionId::new();
        assert_ne!(id1, id2);
        assert!(id1.0.starts_with("session_"));
    }

    #[test]
    fn test_status_busy_and_idle() {
        assert!(Status::Creating.is_busy());
        assert!(Status::Updating.is_busy());
        assert!(!Status::Initial.is_busy());
        assert!(Status::Created.is_idle_with_artifact());
        assert!(Status::Updated.is_idle_with_artifact());
        assert!(!Status::Initial.is_idle_with_artifact());
    }

    #[test]
    fn test_conversation_message_wire_shape() {
        let msg = ConversationMessage::user("Build me a calculator app...");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"role": "user", "content": "Build me a calculator app..."})
        );
    }

    #[test]
    fn test_studio_message_tagging() {
        let msg = StudioMessage::StatusChanged {
            status: Status::Updating,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"type":"status_changed","status":"updating"}"#);
    }
}
