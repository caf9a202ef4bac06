//! Studio Core - Headless Streaming Generation for appstudio
//!
//! This crate turns a natural-language app description into source code by
//! streaming it from a code generator, and keeps the conversation going so
//! the app can be refined with follow-up instructions. It is independent of
//! any UI: a terminal, an editor plugin or a test harness can drive it.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         Surfaces                                  │
//! │      ┌─────────┐     ┌──────────────┐     ┌──────────────────┐    │
//! │      │   CLI   │     │  Web preview │     │  Tests/Headless  │    │
//! │      └────┬────┘     └──────┬───────┘     └────────┬─────────┘    │
//! │           └─────────────────┴──────────────────────┘              │
//! │                             │                                     │
//! │              start_creation / start_revision (down)               │
//! │                    StudioMessage (up, mpsc)                       │
//! └─────────────────────────────┼─────────────────────────────────────┘
//!                               │
//! ┌─────────────────────────────┼─────────────────────────────────────┐
//! │                        STUDIO CORE                                │
//! │  ┌──────────────────────────┴──────────────────────────────────┐  │
//! │  │                         Studio                               │  │
//! │  │  ┌──────────┐  ┌────────────────────────────┐  ┌──────────┐  │  │
//! │  │  │ Session  │  │ Decoder → Extractor → Acc. │  │ Backend  │  │  │
//! │  │  └──────────┘  └────────────────────────────┘  └──────────┘  │  │
//! │  └─────────────────────────────────────────────────────────────┘  │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`Studio`]: drives one creation or revision cycle at a time
//! - [`StudioMessage`]: messages sent from the Studio to a surface
//! - [`Session`]: status, conversation history and session parameters
//! - [`GenerationBackend`]: where requests go ([`HttpBackend`], [`ReplayBackend`])
//!
//! # Quick Start
//!
//! ```ignore
//! use appstudio_core::{HttpBackend, Studio, StudioConfig, StudioMessage};
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let (tx, mut rx) = mpsc::channel(100);
//!     let mut studio = Studio::new(HttpBackend::local()?, StudioConfig::default(), tx);
//!
//!     tokio::spawn(async move {
//!         while let Some(msg) = rx.recv().await {
//!             if let StudioMessage::Artifact { content, .. } = msg {
//!                 // Render the artifact
//!             }
//!         }
//!     });
//!
//!     studio.start_creation("Build me a calculator app", "model-id", "react").await?;
//!     studio.start_revision("make it pink").await?;
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`backend`]: generation backend abstraction (HTTP, replay)
//! - [`config`]: TOML/environment configuration
//! - [`error`]: error taxonomy
//! - [`messages`]: messages from the Studio to surfaces
//! - [`orchestrator`]: the Studio and its read loop
//! - [`session`]: session state machine
//! - [`stream`]: SSE decoding, delta extraction, artifact accumulation

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod config;
pub mod error;
pub mod messages;
pub mod orchestrator;
pub mod session;
pub mod stream;

// Re-exports for convenience
pub use backend::{
    ByteStream, GenerationBackend, GenerationRequest, HttpBackend, ReplayBackend, ReplayResponse,
    Transcript,
};
pub use error::{BackendError, SessionError, StudioError};
pub use messages::{
    ConversationMessage, MessageRole, NotifyLevel, SessionId, Status, StudioMessage,
};
pub use orchestrator::{CancelHandle, CycleSummary, Studio, StudioConfig};
pub use session::{CycleKind, Session, SessionMeta};
pub use stream::{sse_events, Accumulator, CoalescePolicy, DeltaExtractor, SseEvent, SseStream};

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, ConfigError, ConfigOverrides,
    ConfigSource, StudioConfigFile, StudioToml,
};
