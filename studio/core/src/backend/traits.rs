//! Generation Backend Traits
//!
//! The orchestrator talks to the code generator through [`GenerationBackend`].
//! A backend only has to turn a request into a stream of raw body chunks;
//! framing and decoding happen in [`crate::stream`], so every backend gets
//! identical parsing behavior.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::error::BackendError;
use crate::messages::ConversationMessage;

/// Raw response body as it arrives from the backend
pub type ByteStream = BoxStream<'static, Result<Bytes, BackendError>>;

/// Outbound generation request
///
/// Serializes to `{"messages": [{"role", "content"}...], "model", "framework"}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Full conversation, oldest first, ending with the new user message
    pub messages: Vec<ConversationMessage>,
    /// Model identifier
    pub model: String,
    /// Target framework identifier
    pub framework: String,
}

impl GenerationRequest {
    /// Create a request
    pub fn new(
        messages: Vec<ConversationMessage>,
        model: impl Into<String>,
        framework: impl Into<String>,
    ) -> Self {
        Self {
            messages,
            model: model.into(),
            framework: framework.into(),
        }
    }

    /// The most recent user prompt
    #[must_use]
    pub fn prompt(&self) -> Option<&str> {
        self.messages.last().map(ConversationMessage::content)
    }
}

/// Generation backend trait
///
/// Implement this to reach a different code generator. The returned stream
/// ends when the response body ends; a mid-stream transport failure is
/// delivered as an `Err` item.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &str;

    /// Send a request and return the response body as a byte stream
    ///
    /// # Errors
    ///
    /// Fails before any data is returned if the backend cannot be reached
    /// or answers with a non-success status.
    async fn open_stream(&self, request: &GenerationRequest) -> Result<ByteStream, BackendError>;
}
