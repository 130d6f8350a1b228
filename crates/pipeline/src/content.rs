//! Data contracts flowing between the pipeline stages.
//!
//! Every type here is an immutable value record: built once within a run,
//! handed to the next stage, and discarded when the run ends. Wire names are
//! camelCase because these types are both parsed from model output and
//! returned to callers as JSON.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{AlignmentScore, PipelineError, SectionKey, Slug};

// ---------------------------------------------------------------------------
// Inbound contract
// ---------------------------------------------------------------------------

/// Who the content is written for and what is being sold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientProfile {
    #[serde(default)]
    pub product_service_summary: Option<String>,
    #[serde(default)]
    pub target_audience: Option<String>,
}

/// Brand guidance applied to drafting and audited by the voice/tone stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketingContext {
    /// Voice traits, e.g. `["confident", "plain-spoken"]`.
    #[serde(default)]
    pub brand_voice: Vec<String>,
    /// Overall tone, e.g. `"friendly but expert"`.
    #[serde(default)]
    pub brand_tone: String,
    /// Explicit things the content must never do or say.
    #[serde(default)]
    pub content_donts: Vec<String>,
    #[serde(default)]
    pub target_persona: Option<String>,
    #[serde(default)]
    pub key_messages: Vec<String>,
    #[serde(default)]
    pub competitors: Vec<String>,
}

/// Everything a caller supplies to start one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineInput {
    pub topic: String,
    pub target_keyword: String,
    pub word_count_goal: u32,
    #[serde(default)]
    pub client_profile: ClientProfile,
    #[serde(default)]
    pub marketing_context: MarketingContext,
}

impl PipelineInput {
    /// Checks the inbound contract before any provider call is made.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.topic.trim().is_empty() {
            return Err(PipelineError::InvalidInput {
                message: "topic must not be empty".to_string(),
            });
        }
        if self.target_keyword.trim().is_empty() {
            return Err(PipelineError::InvalidInput {
                message: "target keyword must not be empty".to_string(),
            });
        }
        if self.word_count_goal == 0 {
            return Err(PipelineError::InvalidInput {
                message: "word count goal must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Research
// ---------------------------------------------------------------------------

/// Audience and market findings gathered before outlining.
///
/// Every list defaults to empty so a partially filled model response still
/// parses; downstream stages tolerate missing research.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchResult {
    #[serde(default)]
    pub pain_points: Vec<String>,
    #[serde(default)]
    pub key_facts: Vec<String>,
    #[serde(default)]
    pub differentiators: Vec<String>,
    #[serde(default)]
    pub related_subtopics: Vec<String>,
    #[serde(default)]
    pub suggested_angles: Vec<String>,
}

impl ResearchResult {
    pub fn is_empty(&self) -> bool {
        self.pain_points.is_empty()
            && self.key_facts.is_empty()
            && self.differentiators.is_empty()
            && self.related_subtopics.is_empty()
            && self.suggested_angles.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Outline
// ---------------------------------------------------------------------------

/// Structural role of an outline section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionType {
    Intro,
    Body,
    Conclusion,
    #[serde(alias = "CTA", alias = "call_to_action")]
    Cta,
}

impl std::fmt::Display for SectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SectionType::Intro => "intro",
            SectionType::Body => "body",
            SectionType::Conclusion => "conclusion",
            SectionType::Cta => "cta",
        };
        write!(f, "{s}")
    }
}

/// One structural unit of the target document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlineSection {
    pub key: SectionKey,
    pub title: String,
    #[serde(rename = "type")]
    pub section_type: SectionType,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub estimated_words: u32,
}

/// The ordered section plan for the article.
///
/// Section order defines drafting order. `total_estimated_words` is always
/// the sum of the section estimates; build it with [`OutlineResult::from_sections`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlineResult {
    pub sections: Vec<OutlineSection>,
    pub total_estimated_words: u32,
}

impl OutlineResult {
    /// Builds an outline, recomputing the total from the section estimates.
    pub fn from_sections(sections: Vec<OutlineSection>) -> Self {
        let total_estimated_words = sections
            .iter()
            .fold(0u32, |acc, s| acc.saturating_add(s.estimated_words));
        Self {
            sections,
            total_estimated_words,
        }
    }

    /// Number of sections of the given type.
    pub fn count_of(&self, section_type: SectionType) -> usize {
        self.sections
            .iter()
            .filter(|s| s.section_type == section_type)
            .count()
    }
}

// ---------------------------------------------------------------------------
// Drafting
// ---------------------------------------------------------------------------

/// Prose drafted for one outline section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftSectionResult {
    /// Always the key of the outline section the draft was requested for.
    pub section_key: SectionKey,
    pub content: String,
    /// Whitespace-separated token count of `content`.
    pub word_count: u32,
}

impl DraftSectionResult {
    /// Builds a result stamped with `section_key`, counting words locally.
    pub fn new(section_key: SectionKey, content: String) -> Self {
        let word_count = count_words(&content);
        Self {
            section_key,
            content,
            word_count,
        }
    }
}

/// A successfully drafted section as reported to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftedSection {
    pub key: SectionKey,
    pub content: String,
}

/// Counts whitespace-separated words.
pub fn count_words(text: &str) -> u32 {
    u32::try_from(text.split_whitespace().count()).unwrap_or(u32::MAX)
}

// ---------------------------------------------------------------------------
// SEO
// ---------------------------------------------------------------------------

/// Search metadata proposed for the finished draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoMetadata {
    pub title: String,
    pub meta_description: String,
    pub slug: Slug,
    #[serde(default)]
    pub suggestions: Vec<String>,
    /// Target keyword occurrences per hundred words.
    #[serde(default)]
    pub keyword_density: f64,
    /// Readability label, e.g. `"Grade 8"` or `"easy"`.
    #[serde(default)]
    pub readability_score: String,
}

// ---------------------------------------------------------------------------
// Voice / tone
// ---------------------------------------------------------------------------

/// Severity of a voice/tone issue.
///
/// Parsed leniently: labels are matched case-insensitively, common synonyms
/// ("minor", "critical", ...) are folded in, and anything else (or a missing
/// value) reads as `Medium`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Low,
    #[default]
    Medium,
    High,
}

impl IssueSeverity {
    fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "low" | "minor" | "trivial" => IssueSeverity::Low,
            "high" | "major" | "critical" | "severe" => IssueSeverity::High,
            _ => IssueSeverity::Medium,
        }
    }
}

impl<'de> Deserialize<'de> for IssueSeverity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let label = Option::<String>::deserialize(deserializer)?;
        Ok(label.as_deref().map_or(IssueSeverity::Medium, IssueSeverity::from_label))
    }
}

/// One brand-alignment problem found in the draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceToneIssue {
    #[serde(default)]
    pub section_key: Option<SectionKey>,
    pub issue: String,
    #[serde(default)]
    pub suggestion: String,
    #[serde(default)]
    pub severity: IssueSeverity,
}

/// Brand voice/tone audit of the assembled draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceToneResult {
    pub alignment_score: AlignmentScore,
    #[serde(default)]
    pub issues: Vec<VoiceToneIssue>,
    #[serde(default)]
    pub overall_feedback: String,
    /// The model's own verdict. Never trusted alone; see
    /// [`crate::gates::voice_tone_gate`].
    pub passed: bool,
}

/// Drafted section contents keyed by section, in key order.
pub type SectionContents = BTreeMap<SectionKey, String>;
