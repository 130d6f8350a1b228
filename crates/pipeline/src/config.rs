//! Runtime configuration for the content pipeline.
//!
//! Every field has a default reproducing the baseline behaviour (three
//! immediate outline attempts, no call timeout, a two-section context
//! window), so an empty JSON object is a valid configuration.

use std::time::Duration;

use backon::{BackoffBuilder, ConstantBuilder, ExponentialBuilder};
use serde::{Deserialize, Serialize};

use crate::{PipelineError, Stage, Temperature};

// ---------------------------------------------------------------------------
// Stage policy
// ---------------------------------------------------------------------------

/// Delay schedule applied between outline attempts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(
    tag = "strategy",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum Backoff {
    /// Retry immediately.
    #[default]
    None,
    /// Wait the same delay before every retry.
    Fixed { delay_ms: u64 },
    /// Double the delay after every retry, starting at `initial_ms` and
    /// never exceeding `max_ms`.
    Exponential { initial_ms: u64, max_ms: u64 },
}

impl Backoff {
    /// The delays to wait before each of up to `retries` retries, in order.
    ///
    /// The schedule is exhausted after `retries` items; no jitter is applied.
    pub fn schedule(&self, retries: usize) -> Box<dyn Iterator<Item = Duration> + Send> {
        match self {
            Backoff::None => Box::new(
                ConstantBuilder::default()
                    .with_delay(Duration::ZERO)
                    .with_max_times(retries)
                    .build(),
            ),
            Backoff::Fixed { delay_ms } => Box::new(
                ConstantBuilder::default()
                    .with_delay(Duration::from_millis(*delay_ms))
                    .with_max_times(retries)
                    .build(),
            ),
            Backoff::Exponential { initial_ms, max_ms } => Box::new(
                ExponentialBuilder::default()
                    .with_min_delay(Duration::from_millis(*initial_ms))
                    .with_max_delay(Duration::from_millis(*max_ms))
                    .with_factor(2.0)
                    .with_max_times(retries)
                    .build(),
            ),
        }
    }
}

/// Attempt bound, back-off and per-call timeout injected into the executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StagePolicy {
    /// Total outline attempts, including the first.
    pub max_outline_attempts: u32,
    pub backoff: Backoff,
    /// Upper bound for any single provider call. `None` waits indefinitely.
    pub call_timeout_ms: Option<u64>,
}

impl Default for StagePolicy {
    fn default() -> Self {
        Self {
            max_outline_attempts: 3,
            backoff: Backoff::None,
            call_timeout_ms: None,
        }
    }
}

impl StagePolicy {
    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_ms.map(Duration::from_millis)
    }
}

// ---------------------------------------------------------------------------
// Per-stage sampling
// ---------------------------------------------------------------------------

/// Sampling temperature per stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StageTemperatures {
    pub research: f32,
    pub outline: f32,
    pub draft_section: f32,
    pub seo: f32,
    pub voice_tone: f32,
}

impl Default for StageTemperatures {
    fn default() -> Self {
        Self {
            research: 0.7,
            outline: 0.7,
            draft_section: 0.8,
            seo: 0.5,
            voice_tone: 0.3,
        }
    }
}

impl StageTemperatures {
    pub fn raw(&self, stage: Stage) -> f32 {
        match stage {
            Stage::Research => self.research,
            Stage::Outline => self.outline,
            Stage::DraftSection => self.draft_section,
            Stage::Seo => self.seo,
            Stage::VoiceTone => self.voice_tone,
        }
    }

    /// Validated temperature for `stage`.
    ///
    /// Out-of-range values are rejected by [`PipelineConfig::validate`]; an
    /// unvalidated config falls back to the default for that stage.
    pub fn for_stage(&self, stage: Stage) -> Temperature {
        Temperature::new(self.raw(stage))
            .or_else(|| Temperature::new(Self::default().raw(stage)))
            .unwrap_or(Temperature::DEFAULT)
    }
}

/// Token ceiling per stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StageMaxTokens {
    pub research: u32,
    pub outline: u32,
    pub draft_section: u32,
    pub seo: u32,
    pub voice_tone: u32,
}

impl Default for StageMaxTokens {
    fn default() -> Self {
        Self {
            research: 2048,
            outline: 2048,
            draft_section: 2048,
            seo: 1024,
            voice_tone: 2048,
        }
    }
}

impl StageMaxTokens {
    pub fn for_stage(&self, stage: Stage) -> u32 {
        match stage {
            Stage::Research => self.research,
            Stage::Outline => self.outline,
            Stage::DraftSection => self.draft_section,
            Stage::Seo => self.seo,
            Stage::VoiceTone => self.voice_tone,
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level configuration
// ---------------------------------------------------------------------------

/// Complete executor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineConfig {
    pub policy: StagePolicy,
    /// How many previous section bodies a draft prompt may include.
    pub previous_section_window: usize,
    /// Characters of the full draft shown to the SEO stage.
    pub seo_excerpt_chars: usize,
    /// Characters of the full draft shown to the voice/tone stage.
    pub voice_tone_excerpt_chars: usize,
    pub temperatures: StageTemperatures,
    pub max_tokens: StageMaxTokens,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            policy: StagePolicy::default(),
            previous_section_window: 2,
            seo_excerpt_chars: 2000,
            voice_tone_excerpt_chars: 3000,
            temperatures: StageTemperatures::default(),
            max_tokens: StageMaxTokens::default(),
        }
    }
}

const ALL_STAGES: [Stage; 5] = [
    Stage::Research,
    Stage::Outline,
    Stage::DraftSection,
    Stage::Seo,
    Stage::VoiceTone,
];

impl PipelineConfig {
    /// Rejects configurations the executor cannot run with.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.policy.max_outline_attempts == 0 {
            return Err(configuration("policy.maxOutlineAttempts must be at least 1"));
        }
        if self.policy.call_timeout_ms == Some(0) {
            return Err(configuration("policy.callTimeoutMs must be greater than zero"));
        }
        if let Backoff::Exponential { initial_ms, max_ms } = self.policy.backoff {
            if initial_ms > max_ms {
                return Err(configuration(
                    "policy.backoff.initialMs must not exceed policy.backoff.maxMs",
                ));
            }
        }
        if self.seo_excerpt_chars == 0 || self.voice_tone_excerpt_chars == 0 {
            return Err(configuration("excerpt limits must be greater than zero"));
        }
        for stage in ALL_STAGES {
            let value = self.temperatures.raw(stage);
            if Temperature::new(value).is_none() {
                return Err(configuration(format!(
                    "temperature {value} for stage {stage} is outside 0.0-2.0"
                )));
            }
            if self.max_tokens.for_stage(stage) == 0 {
                return Err(configuration(format!(
                    "max tokens for stage {stage} must be greater than zero"
                )));
            }
        }
        Ok(())
    }
}

fn configuration(message: impl Into<String>) -> PipelineError {
    PipelineError::Configuration {
        message: message.into(),
    }
}
