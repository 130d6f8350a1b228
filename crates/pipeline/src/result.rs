//! The terminal artefact of a pipeline run.

use serde::{Deserialize, Serialize};

use crate::{
    DraftedSection, OutlineResult, PipelineRunId, QualityGates, ResearchResult, SeoMetadata,
    Timestamp, VoiceToneResult,
};

/// Everything a run produced, handed to the caller once the run is done.
///
/// `success` is `true` whenever the run reached gate assembly, whatever the
/// individual gate verdicts say; callers inspect `quality_gates` to decide
/// whether to accept, regenerate, or escalate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    pub run_id: PipelineRunId,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub research: Option<ResearchResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outline: Option<OutlineResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sections: Option<Vec<DraftedSection>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_draft: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seo_metadata: Option<SeoMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_tone_report: Option<VoiceToneResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_gates: Option<QualityGates>,
    /// Failed outline attempts.
    pub retry_count: u32,
    pub started_at: Timestamp,
    pub completed_at: Timestamp,
}

impl PipelineResult {
    /// A failed run carrying only the error and the retries spent so far.
    pub fn failure(
        run_id: PipelineRunId,
        error: impl Into<String>,
        retry_count: u32,
        started_at: Timestamp,
    ) -> Self {
        Self {
            run_id,
            success: false,
            error: Some(error.into()),
            research: None,
            outline: None,
            sections: None,
            full_draft: None,
            seo_metadata: None,
            voice_tone_report: None,
            quality_gates: None,
            retry_count,
            started_at,
            completed_at: Timestamp::now(),
        }
    }
}
