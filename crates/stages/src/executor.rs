//! The pipeline executor: drives one run through the fixed stage sequence.
//!
//! ```text
//! Init → Researching → Outlining(attempt) → Drafting → Seo → VoiceTone → Done
//! ```
//!
//! Research and outline exhaustion are fatal. Draft, SEO and voice/tone
//! failures degrade the result but never end the run. Every stage call is
//! awaited before the next begins; independent runs share nothing but the
//! provider handle.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use pipeline::{
    completeness_gate, outline_gate, seo_gate, validate_outline, voice_tone_gate, DraftedSection,
    GenerationProvider, OutlineResult, PipelineConfig, PipelineError, PipelineInput,
    PipelineResult, PipelineRunId, QualityGates, ResearchResult, SectionContents, StageError,
    Timestamp,
};

use crate::draft::{self, DraftAccumulator, DraftSectionInput};
use crate::gateway::LlmGateway;
use crate::outline::{self, OutlineInput};
use crate::research::{self, ResearchInput};
use crate::seo::{self, SeoInput};
use crate::voice_tone::{self, VoiceToneInput};

/// Separator placed between drafted sections in the full draft.
pub const SECTION_SEPARATOR: &str = "\n\n";

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    Researching,
    Outlining { attempt: u32 },
    Drafting,
    Seo,
    VoiceTone,
    Done { success: bool },
}

/// Per-run bookkeeping that must survive a fatal error.
#[derive(Debug)]
struct RunTracker {
    state: RunState,
    retry_count: u32,
}

impl RunTracker {
    fn new() -> Self {
        Self {
            state: RunState::Init,
            retry_count: 0,
        }
    }

    fn enter(&mut self, next: RunState) {
        tracing::debug!(from = ?self.state, to = ?next, "Pipeline state transition");
        self.state = next;
    }
}

/// Runs the content pipeline against a shared [`GenerationProvider`].
///
/// Cheap to share: wrap in an `Arc` and call [`PipelineExecutor::run`] from as
/// many tasks as needed.
pub struct PipelineExecutor {
    provider: Arc<dyn GenerationProvider>,
    config: PipelineConfig,
}

impl PipelineExecutor {
    /// Creates an executor, rejecting an invalid configuration.
    pub fn new(
        provider: Arc<dyn GenerationProvider>,
        config: PipelineConfig,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self { provider, config })
    }

    /// Runs the pipeline to completion.
    pub async fn run(&self, input: &PipelineInput) -> PipelineResult {
        self.run_with_cancellation(input, CancellationToken::new()).await
    }

    /// Runs the pipeline, abandoning it as soon as `cancel` fires.
    ///
    /// Never returns an error: fatal conditions are reported through
    /// `PipelineResult::error` with `success: false`.
    pub async fn run_with_cancellation(
        &self,
        input: &PipelineInput,
        cancel: CancellationToken,
    ) -> PipelineResult {
        let run_id = PipelineRunId::new_random();
        let started_at = Timestamp::now();
        let span = tracing::info_span!(
            "pipeline_run",
            run_id = %run_id,
            topic = %input.topic,
            provider = self.provider.name()
        );

        async move {
            tracing::info!(word_count_goal = input.word_count_goal, "Pipeline run started");
            let mut tracker = RunTracker::new();
            let gateway = LlmGateway::new(self.provider.as_ref(), &self.config, cancel);

            let outcome =
                AssertUnwindSafe(self.execute(&gateway, input, &mut tracker, run_id, started_at))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|payload| Err(PipelineError::from_panic(payload.as_ref())));

            match outcome {
                Ok(result) => {
                    tracker.enter(RunState::Done { success: true });
                    tracing::info!(
                        retry_count = result.retry_count,
                        all_gates_passed = result
                            .quality_gates
                            .as_ref()
                            .is_some_and(QualityGates::all_passed),
                        "Pipeline run completed"
                    );
                    result
                }
                Err(err) => {
                    tracker.enter(RunState::Done { success: false });
                    tracing::error!(
                        error = %err,
                        retry_count = tracker.retry_count,
                        "Pipeline run failed"
                    );
                    PipelineResult::failure(
                        run_id,
                        err.to_string(),
                        tracker.retry_count,
                        started_at,
                    )
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn execute(
        &self,
        gateway: &LlmGateway<'_>,
        input: &PipelineInput,
        tracker: &mut RunTracker,
        run_id: PipelineRunId,
        started_at: Timestamp,
    ) -> Result<PipelineResult, PipelineError> {
        input.validate()?;

        // -- Research ----------------------------------------------------------
        tracker.enter(RunState::Researching);
        let research = research::run(
            gateway,
            &ResearchInput {
                topic: &input.topic,
                target_keyword: &input.target_keyword,
                client_profile: &input.client_profile,
                marketing_context: Some(&input.marketing_context),
            },
        )
        .instrument(tracing::info_span!("research"))
        .await
        .map_err(|source| {
            if source.is_cancelled() {
                PipelineError::Cancelled
            } else {
                PipelineError::ResearchFailed { source }
            }
        })?;

        // -- Outline -----------------------------------------------------------
        let outline = self
            .outline_with_retries(gateway, input, &research, tracker)
            .instrument(tracing::info_span!("outline"))
            .await?;

        // -- Drafting ----------------------------------------------------------
        tracker.enter(RunState::Drafting);
        let drafted = self
            .draft_sections(gateway, input, &research, &outline)
            .instrument(tracing::info_span!("drafting", sections = outline.sections.len()))
            .await?;

        let sections: Vec<DraftedSection> = drafted
            .into_iter()
            .map(|d| DraftedSection {
                key: d.section_key,
                content: d.content,
            })
            .collect();
        let full_draft = sections
            .iter()
            .map(|s| s.content.as_str())
            .collect::<Vec<_>>()
            .join(SECTION_SEPARATOR);

        // -- SEO ---------------------------------------------------------------
        tracker.enter(RunState::Seo);
        let seo_metadata = degrade(
            seo::run(
                gateway,
                &SeoInput {
                    full_draft: &full_draft,
                    excerpt_chars: self.config.seo_excerpt_chars,
                    topic: Some(&input.topic),
                    target_keyword: Some(&input.target_keyword),
                },
            )
            .instrument(tracing::info_span!("seo"))
            .await,
        )?;

        // -- Voice / tone ------------------------------------------------------
        tracker.enter(RunState::VoiceTone);
        let section_contents: SectionContents = sections
            .iter()
            .map(|s| (s.key.clone(), s.content.clone()))
            .collect();
        let voice_tone_report = degrade(
            voice_tone::run(
                gateway,
                &VoiceToneInput {
                    full_draft: &full_draft,
                    excerpt_chars: self.config.voice_tone_excerpt_chars,
                    marketing_context: &input.marketing_context,
                    section_contents: &section_contents,
                },
            )
            .instrument(tracing::info_span!("voice_tone"))
            .await,
        )?;

        // -- Gates -------------------------------------------------------------
        let quality_gates = QualityGates {
            outline: outline_gate(),
            completeness: completeness_gate(sections.len(), outline.sections.len()),
            seo: seo_metadata.as_ref().map(seo_gate),
            voice_tone: voice_tone_report.as_ref().map(voice_tone_gate),
        };
        log_gates(&quality_gates);

        Ok(PipelineResult {
            run_id,
            success: true,
            error: None,
            research: Some(research),
            outline: Some(outline),
            sections: Some(sections),
            full_draft: Some(full_draft),
            seo_metadata,
            voice_tone_report,
            quality_gates: Some(quality_gates),
            retry_count: tracker.retry_count,
            started_at,
            completed_at: Timestamp::now(),
        })
    }

    /// Generates and validates outlines until one passes or attempts run out.
    ///
    /// A failed agent call counts as an attempt just like an invalid outline.
    /// Every attempt reuses the same input.
    async fn outline_with_retries(
        &self,
        gateway: &LlmGateway<'_>,
        input: &PipelineInput,
        research: &ResearchResult,
        tracker: &mut RunTracker,
    ) -> Result<OutlineResult, PipelineError> {
        let policy = &self.config.policy;
        let outline_input = OutlineInput {
            topic: &input.topic,
            target_keyword: &input.target_keyword,
            word_count_goal: input.word_count_goal,
            research,
            client_profile: &input.client_profile,
        };

        let retries = policy.max_outline_attempts.saturating_sub(1) as usize;
        let mut delays = policy.backoff.schedule(retries);
        let mut attempt = 1;
        loop {
            tracker.enter(RunState::Outlining { attempt });

            let (issues, requested_delay) = match outline::run(gateway, &outline_input).await {
                Ok(outline) => {
                    let validation = validate_outline(&outline, input.word_count_goal);
                    if validation.valid {
                        tracing::info!(
                            attempt,
                            sections = outline.sections.len(),
                            estimated_words = outline.total_estimated_words,
                            "Outline passed quality gate"
                        );
                        return Ok(outline);
                    }
                    (validation.issues, None)
                }
                Err(err) if err.is_cancelled() => return Err(PipelineError::Cancelled),
                Err(err) => {
                    let delay = err.retry_policy().min_delay();
                    (vec![err.to_string()], delay)
                }
            };

            tracker.retry_count += 1;
            tracing::warn!(attempt, issues = ?issues, "Outline attempt failed");

            if attempt >= policy.max_outline_attempts {
                return Err(PipelineError::OutlineGateExhausted {
                    attempts: attempt,
                    last_issues: issues,
                });
            }

            let delay = delays
                .next()
                .unwrap_or_default()
                .max(requested_delay.unwrap_or_default());
            if !delay.is_zero() {
                tokio::select! {
                    biased;
                    _ = gateway.cancel_token().cancelled() => return Err(PipelineError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            attempt += 1;
        }
    }

    /// Drafts every outline section in order as a fold over
    /// [`DraftAccumulator`]. Failed sections are skipped.
    async fn draft_sections(
        &self,
        gateway: &LlmGateway<'_>,
        input: &PipelineInput,
        research: &ResearchResult,
        outline: &OutlineResult,
    ) -> Result<Vec<pipeline::DraftSectionResult>, PipelineError> {
        let window = self.config.previous_section_window;
        let mut acc = DraftAccumulator::new(window);

        for section in &outline.sections {
            let previous = acc.previous_sections();
            let draft_input = DraftSectionInput {
                section,
                topic: &input.topic,
                target_keyword: Some(&input.target_keyword),
                marketing_context: Some(&input.marketing_context),
                previous_sections: &previous,
                context_window: window,
                research: Some(research),
                client_profile: Some(&input.client_profile),
            };

            acc = match draft::run(gateway, &draft_input).await {
                Ok(raw) => {
                    let result = raw.stamp(&section.key);
                    tracing::info!(
                        section = %section.key,
                        words = result.word_count,
                        "Section drafted"
                    );
                    acc.with_drafted(result)
                }
                Err(err) if err.is_cancelled() => return Err(PipelineError::Cancelled),
                Err(err) => {
                    tracing::warn!(
                        section = %section.key,
                        error = %err,
                        "Section draft failed; omitting section"
                    );
                    acc.with_skipped(section.key.clone())
                }
            };
        }

        if !acc.skipped().is_empty() {
            tracing::warn!(
                drafted = acc.drafted().len(),
                skipped = acc.skipped().len(),
                "Draft incomplete"
            );
        }
        Ok(acc.into_drafted())
    }
}

/// Turns a non-fatal stage failure into an absent result. Cancellation stays fatal.
fn degrade<T>(result: Result<T, StageError>) -> Result<Option<T>, PipelineError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_cancelled() => Err(PipelineError::Cancelled),
        Err(err) => {
            tracing::warn!(
                stage = %err.stage(),
                error = %err,
                "Stage failed; continuing without its output"
            );
            Ok(None)
        }
    }
}

fn log_gates(gates: &QualityGates) {
    let named = [
        ("outline", Some(&gates.outline)),
        ("completeness", Some(&gates.completeness)),
        ("seo", gates.seo.as_ref()),
        ("voice_tone", gates.voice_tone.as_ref()),
    ];
    for (gate, verdict) in named {
        match verdict {
            Some(v) if v.passed => {
                let reason = v.reason.as_deref().unwrap_or("");
                tracing::info!(gate, reason, "Quality gate passed")
            }
            Some(v) => {
                let reason = v.reason.as_deref().unwrap_or("");
                tracing::warn!(gate, reason, "Quality gate failed")
            }
            None => tracing::warn!(gate, "Quality gate not evaluated"),
        }
    }
}
