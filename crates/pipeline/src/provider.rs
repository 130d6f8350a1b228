//! Generation provider port.
//!
//! [`GenerationProvider`] is the only way stage agents reach a text-generation
//! backend. Infrastructure crates (e.g. `llm`) implement it; tests substitute
//! scripted doubles. Providers never retry internally: the retry policy lives
//! in the orchestrator so test doubles control success and failure per call.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{RetryPolicy, Temperature};

// ---------------------------------------------------------------------------
// Stage tag
// ---------------------------------------------------------------------------

/// The pipeline stage that issued a generation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Research,
    Outline,
    DraftSection,
    Seo,
    VoiceTone,
}

impl Stage {
    /// Human-readable stage name used in error messages and log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Research => "Research",
            Stage::Outline => "Outline",
            Stage::DraftSection => "Draft section",
            Stage::Seo => "SEO",
            Stage::VoiceTone => "Voice/tone",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// A prompt bundle for one provider call. Built fresh per call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    /// Issuing stage. Providers may ignore it.
    pub stage: Stage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<String>,
    pub user_instruction: String,
    pub temperature: Temperature,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl GenerationRequest {
    pub fn new(
        stage: Stage,
        user_instruction: impl Into<String>,
        temperature: Temperature,
    ) -> Self {
        Self {
            stage,
            system_instruction: None,
            user_instruction: user_instruction.into(),
            temperature,
            max_tokens: None,
        }
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures reported by a [`GenerationProvider`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    /// The request never produced an HTTP response (connection, TLS, DNS).
    #[error("Provider request failed: {message}")]
    Transport { message: String },

    /// The backend answered with a non-success status.
    #[error("Provider API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The backend rejected the request because of rate limiting.
    #[error("Provider rate limited the request")]
    RateLimited {
        /// Delay suggested by the backend, if any.
        retry_after: Option<Duration>,
    },

    /// Credentials were missing or rejected.
    #[error("Provider authentication failed: {message}")]
    Authentication { message: String },

    /// The backend answered successfully but without any text.
    #[error("Provider returned an empty response")]
    EmptyResponse,

    /// The response body did not have the backend's documented shape.
    #[error("Provider response was malformed: {message}")]
    MalformedResponse { message: String },
}

impl ProviderError {
    /// Classifies this error for the orchestrator's retry decisions.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            ProviderError::Transport { .. }
            | ProviderError::EmptyResponse
            | ProviderError::MalformedResponse { .. } => RetryPolicy::Retryable { after: None },
            ProviderError::Api { status, .. } if *status >= 500 => {
                RetryPolicy::Retryable { after: None }
            }
            ProviderError::Api { .. } | ProviderError::Authentication { .. } => {
                RetryPolicy::NonRetryable
            }
            ProviderError::RateLimited { retry_after } => RetryPolicy::Retryable {
                after: *retry_after,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Port
// ---------------------------------------------------------------------------

/// A text-generation backend.
///
/// Implementations must be safe to share across concurrent pipeline runs.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Name used in log fields (e.g. `"anthropic"`).
    fn name(&self) -> &str;

    /// Sends one request and returns the raw generated text.
    async fn call(&self, request: GenerationRequest) -> Result<String, ProviderError>;
}
