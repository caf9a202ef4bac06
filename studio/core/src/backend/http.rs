//! HTTP Backend Implementation
//!
//! Posts the generation request as JSON to the code generator endpoint and
//! hands back the streamed response body untouched.
//!
//! # Endpoint
//!
//! `POST {endpoint}` with `Content-Type: application/json`. The response is a
//! server-sent event stream whose data records carry `{"text": "..."}`.
//! A non-success status is reported before any streaming begins.

use std::time::Duration;

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};

use super::traits::{ByteStream, GenerationBackend, GenerationRequest};
use crate::error::BackendError;

/// Default generation endpoint
pub const DEFAULT_ENDPOINT: &str = "http://localhost:3000/api/generateCode";

/// Default connect timeout
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest error body kept in [`BackendError::Status`]
const MAX_ERROR_BODY: usize = 2048;

/// HTTP generation backend
#[derive(Clone, Debug)]
pub struct HttpBackend {
    /// Generation endpoint URL
    endpoint: String,
    /// HTTP client
    http_client: reqwest::Client,
}

impl HttpBackend {
    /// Create a backend for `endpoint`
    ///
    /// Only connecting is bounded by `connect_timeout`; a generation may
    /// stream for as long as the backend keeps sending.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Build` if the HTTP client cannot be created.
    pub fn new(
        endpoint: impl Into<String>,
        connect_timeout: Duration,
    ) -> Result<Self, BackendError> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| BackendError::Build(e.to_string()))?;

        Ok(Self {
            endpoint: endpoint.into(),
            http_client,
        })
    }

    /// Create a backend for the default local endpoint
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Build` if the HTTP client cannot be created.
    pub fn local() -> Result<Self, BackendError> {
        Self::new(DEFAULT_ENDPOINT, DEFAULT_CONNECT_TIMEOUT)
    }

    /// Generation endpoint URL
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl GenerationBackend for HttpBackend {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn open_stream(&self, request: &GenerationRequest) -> Result<ByteStream, BackendError> {
        tracing::debug!(
            endpoint = %self.endpoint,
            model = %request.model,
            framework = %request.framework,
            messages = request.messages.len(),
            "Opening generation stream"
        );

        let response = self
            .http_client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await?;

        // Check for HTTP errors
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            tracing::warn!(status, endpoint = %self.endpoint, "Backend rejected request");
            return Err(BackendError::Status { status, body });
        }

        Ok(response
            .bytes_stream()
            .map_err(|e| BackendError::Stream(e.to_string()))
            .boxed())
    }
}
