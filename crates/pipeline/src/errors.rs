//! Error and retry-policy types for the content pipeline.
//!
//! [`StageError`] is what a stage agent returns when its single provider call
//! or its response parsing fails. [`PipelineError`] covers conditions that end
//! a run. Quality-gate failures are neither: they are verdict data.
//!
//! [`RetryPolicy`] is a cross-cutting concern: any error type that takes part
//! in retry decisions must be able to produce a [`RetryPolicy`].

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{ProviderError, Stage};

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether an error condition is safe to retry and, if so, after what delay.
///
/// - `Retryable` errors: transport failures, server errors, rate limits,
///   unparseable model output.
/// - `NonRetryable` errors: rejected credentials, client errors, cancellation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// The operation may be retried.
    Retryable {
        /// Minimum back-off before the next attempt. `None` means retry
        /// immediately or apply the caller's own back-off schedule.
        after: Option<Duration>,
    },
    /// The operation must not be retried.
    NonRetryable,
}

impl RetryPolicy {
    /// The backend-requested minimum delay, if any.
    pub fn min_delay(&self) -> Option<Duration> {
        match self {
            RetryPolicy::Retryable { after } => *after,
            RetryPolicy::NonRetryable => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Stage-level errors
// ---------------------------------------------------------------------------

/// Failure of one stage agent invocation.
///
/// Returned as a value from every agent; never propagated past the
/// orchestrator, which decides per stage whether it is fatal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StageError {
    /// The provider call itself failed.
    #[error("{stage} provider call failed: {source}")]
    Provider {
        stage: Stage,
        #[source]
        source: ProviderError,
    },

    /// The provider answered but the text did not match the stage's schema.
    #[error("{stage} response could not be parsed: {message}")]
    Parse { stage: Stage, message: String },

    /// The provider call did not finish within the configured timeout.
    #[error("{stage} provider call timed out after {}ms", timeout.as_millis())]
    Timeout { stage: Stage, timeout: Duration },

    /// The run was cancelled while the call was in flight.
    #[error("{stage} provider call cancelled")]
    Cancelled { stage: Stage },
}

impl StageError {
    pub fn stage(&self) -> Stage {
        match self {
            StageError::Provider { stage, .. }
            | StageError::Parse { stage, .. }
            | StageError::Timeout { stage, .. }
            | StageError::Cancelled { stage } => *stage,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, StageError::Cancelled { .. })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            StageError::Provider { source, .. } => source.retry_policy(),
            StageError::Parse { .. } | StageError::Timeout { .. } => {
                RetryPolicy::Retryable { after: None }
            }
            StageError::Cancelled { .. } => RetryPolicy::NonRetryable,
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline-level errors
// ---------------------------------------------------------------------------

/// Conditions that end a pipeline run with `success: false`.
///
/// The `Display` text is what callers see in `PipelineResult::error`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    /// The research stage failed; nothing downstream can run.
    #[error("Research failed: {source}")]
    ResearchFailed {
        #[source]
        source: StageError,
    },

    /// Every permitted outline attempt failed generation or validation.
    #[error("Outline quality gate failed after max retries")]
    OutlineGateExhausted {
        attempts: u32,
        /// Issues (or the stage error) from the final attempt.
        last_issues: Vec<String>,
    },

    /// The inbound contract was violated.
    #[error("Invalid pipeline input: {message}")]
    InvalidInput { message: String },

    /// The run's cancellation token fired.
    #[error("Pipeline cancelled")]
    Cancelled,

    /// The pipeline configuration is invalid.
    ///
    /// Produced at load time; a run never starts with an invalid config.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// A stage or provider panicked; the run was abandoned at that point.
    #[error("Pipeline panicked: {message}")]
    Panicked { message: String },
}

impl PipelineError {
    /// Builds [`PipelineError::Panicked`] from a caught panic payload.
    pub fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());
        PipelineError::Panicked { message }
    }
}
