//! LLM gateway: the single path from a stage agent to the provider.
//!
//! The gateway stamps per-stage sampling settings onto requests, races every
//! call against the run's [`CancellationToken`] and the configured timeout,
//! and turns raw model text into typed values. One gateway is built per run.

use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use pipeline::{
    GenerationProvider, GenerationRequest, PipelineConfig, ProviderError, Stage, StageError,
};

pub struct LlmGateway<'a> {
    provider: &'a dyn GenerationProvider,
    config: &'a PipelineConfig,
    cancel: CancellationToken,
}

impl<'a> LlmGateway<'a> {
    pub fn new(
        provider: &'a dyn GenerationProvider,
        config: &'a PipelineConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            provider,
            config,
            cancel,
        }
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Builds a request for `stage` with the configured temperature and token
    /// ceiling.
    pub fn request(
        &self,
        stage: Stage,
        system_instruction: &str,
        user_instruction: String,
    ) -> GenerationRequest {
        GenerationRequest::new(stage, user_instruction, self.config.temperatures.for_stage(stage))
            .with_system_instruction(system_instruction)
            .with_max_tokens(self.config.max_tokens.for_stage(stage))
    }

    /// Sends one request and returns the raw text.
    ///
    /// Cancellation wins over a simultaneously completing call.
    pub async fn generate(&self, request: GenerationRequest) -> Result<String, StageError> {
        let stage = request.stage;
        tracing::debug!(
            stage = %stage,
            provider = self.provider.name(),
            prompt_chars = request.user_instruction.len(),
            "Calling generation provider"
        );

        let call = async {
            let call = self.provider.call(request);
            match self.config.policy.call_timeout() {
                Some(limit) => match tokio::time::timeout(limit, call).await {
                    Ok(result) => result.map_err(|source| StageError::Provider { stage, source }),
                    Err(_) => Err(StageError::Timeout {
                        stage,
                        timeout: limit,
                    }),
                },
                None => call
                    .await
                    .map_err(|source| StageError::Provider { stage, source }),
            }
        };

        let text = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(StageError::Cancelled { stage }),
            result = call => result?,
        };

        if text.trim().is_empty() {
            return Err(StageError::Provider {
                stage,
                source: ProviderError::EmptyResponse,
            });
        }
        Ok(text)
    }

    /// Sends one request and parses the response as JSON of type `T`.
    pub async fn generate_json<T: DeserializeOwned>(
        &self,
        request: GenerationRequest,
    ) -> Result<T, StageError> {
        let stage = request.stage;
        let text = self.generate(request).await?;
        parse_json(stage, &text)
    }
}

/// Parses model text as JSON, tolerating code fences and surrounding prose.
pub fn parse_json<T: DeserializeOwned>(stage: Stage, text: &str) -> Result<T, StageError> {
    serde_json::from_str(extract_json(text)).map_err(|e| {
        tracing::warn!(stage = %stage, error = %e, "Model response is not valid JSON for stage");
        StageError::Parse {
            stage,
            message: e.to_string(),
        }
    })
}

/// Strips a Markdown code fence or surrounding prose from a JSON object.
///
/// Returns the input trimmed if no object boundaries are found.
pub fn extract_json(response: &str) -> &str {
    let trimmed = response.trim();

    if trimmed.starts_with("```") {
        if let Some(start) = trimmed.find('\n') {
            let after_fence = &trimmed[start + 1..];
            if let Some(end) = after_fence.rfind("```") {
                return after_fence[..end].trim();
            }
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            return &trimmed[start..=end];
        }
    }

    trimmed
}

/// Returns at most the first `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
