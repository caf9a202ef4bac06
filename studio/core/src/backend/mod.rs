//! Generation Backend Integration
//!
//! Abstracted access to the code generator through a common trait.
//!
//! # Available Backends
//!
//! - **Http**: POSTs to a generation endpoint and streams the SSE body (default)
//! - **Replay**: serves recorded transcripts, for offline runs and tests
//!
//! # Usage
//!
//! ```ignore
//! use appstudio_core::backend::{GenerationBackend, HttpBackend};
//!
//! let backend = HttpBackend::local()?;
//! let body = backend.open_stream(&request).await?;
//! ```

mod http;
mod replay;
mod traits;

pub use http::{HttpBackend, DEFAULT_CONNECT_TIMEOUT, DEFAULT_ENDPOINT};
pub use replay::{ReplayBackend, ReplayResponse, Transcript, DEFAULT_CHUNK_SIZE};
pub use traits::{ByteStream, GenerationBackend, GenerationRequest};
