//! Stage validators and quality-gate verdicts.
//!
//! Validators are pure functions over parsed stage output. They never fail;
//! a rule violation is data (an issue string or a `passed: false` verdict)
//! for the orchestrator and, ultimately, the caller to act on.

use std::collections::HashSet;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::{OutlineResult, SectionType, SeoMetadata, VoiceToneResult};

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// Minimum number of sections in a valid outline.
pub const MIN_OUTLINE_SECTIONS: usize = 4;

/// Minimum number of `body` sections in a valid outline.
pub const MIN_BODY_SECTIONS: usize = 2;

/// Minimum ratio of projected words to the word-count goal.
pub const MIN_OUTLINE_WORD_RATIO: f64 = 0.8;

/// Accepted SEO title length in characters (target 50–60).
pub const SEO_TITLE_LENGTH: RangeInclusive<usize> = 30..=70;

/// Accepted meta description length in characters (target 120–160).
pub const SEO_META_DESCRIPTION_LENGTH: RangeInclusive<usize> = 100..=170;

/// Accepted keyword density, in occurrences per hundred words.
pub const SEO_KEYWORD_DENSITY: RangeInclusive<f64> = 0.5..=4.0;

/// Minimum alignment score for the voice/tone gate.
pub const VOICE_TONE_PASS_SCORE: u8 = 80;

/// Minimum share of outline sections that must be drafted.
pub const MIN_COMPLETENESS_RATIO: f64 = 0.8;

// ---------------------------------------------------------------------------
// Verdicts
// ---------------------------------------------------------------------------

/// Pass/fail verdict attached to one gated stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityGateVerdict {
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl QualityGateVerdict {
    pub fn new(passed: bool, reason: impl Into<String>) -> Self {
        Self {
            passed,
            reason: Some(reason.into()),
            score: None,
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }
}

/// Every gate verdict of a run that reached the terminal state.
///
/// `seo` and `voice_tone` are absent when their agent call failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityGates {
    pub outline: QualityGateVerdict,
    pub completeness: QualityGateVerdict,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seo: Option<QualityGateVerdict>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_tone: Option<QualityGateVerdict>,
}

impl QualityGates {
    /// Returns `true` if every gate that ran passed.
    pub fn all_passed(&self) -> bool {
        self.outline.passed
            && self.completeness.passed
            && self.seo.as_ref().is_none_or(|v| v.passed)
            && self.voice_tone.as_ref().is_none_or(|v| v.passed)
    }
}

// ---------------------------------------------------------------------------
// Outline
// ---------------------------------------------------------------------------

/// Outcome of [`validate_outline`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineValidation {
    pub valid: bool,
    pub issues: Vec<String>,
}

/// Checks an outline's structure and projected length.
///
/// All failing conditions are collected so that a single retry can address
/// as many of them as possible. The projected length is recomputed from the
/// sections rather than read from `outline.total_estimated_words`.
pub fn validate_outline(outline: &OutlineResult, word_count_goal: u32) -> OutlineValidation {
    let mut issues = Vec::new();
    let sections = &outline.sections;

    if sections.len() < MIN_OUTLINE_SECTIONS {
        issues.push(format!(
            "Too few sections: {} (minimum {MIN_OUTLINE_SECTIONS})",
            sections.len()
        ));
    }

    let intros = outline.count_of(SectionType::Intro);
    let conclusions = outline.count_of(SectionType::Conclusion);
    let ctas = outline.count_of(SectionType::Cta);
    let bodies = outline.count_of(SectionType::Body);

    match intros {
        0 => issues.push("Missing intro section".to_string()),
        1 => {}
        n => issues.push(format!("Multiple intro sections: {n}")),
    }
    match conclusions {
        0 => issues.push("Missing conclusion section".to_string()),
        1 => {}
        n => issues.push(format!("Multiple conclusion sections: {n}")),
    }
    if ctas == 0 {
        issues.push("Missing CTA section".to_string());
    }
    if bodies < MIN_BODY_SECTIONS {
        issues.push(format!(
            "Need at least {MIN_BODY_SECTIONS} body sections (found {bodies})"
        ));
    }

    let mut seen = HashSet::new();
    for section in sections {
        if section.key.is_blank() {
            issues.push(format!("Section \"{}\" has an empty key", section.title));
        } else if !seen.insert(section.key.as_str()) {
            issues.push(format!("Duplicate section key: {}", section.key));
        }
    }

    if word_count_goal > 0 {
        let estimated: u64 = sections.iter().map(|s| u64::from(s.estimated_words)).sum();
        let ratio = estimated as f64 / f64::from(word_count_goal);
        if ratio < MIN_OUTLINE_WORD_RATIO {
            issues.push(format!(
                "Estimated word count {estimated} is below 80% of goal {word_count_goal}"
            ));
        }
    }

    tracing::debug!(
        sections = sections.len(),
        issues = issues.len(),
        "Outline validated"
    );

    OutlineValidation {
        valid: issues.is_empty(),
        issues,
    }
}

// ---------------------------------------------------------------------------
// SEO
// ---------------------------------------------------------------------------

/// Outcome of [`validate_seo_metadata`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeoValidation {
    pub passed: bool,
    pub issues: Vec<String>,
}

/// Checks title length, meta description length, and keyword density.
///
/// Lengths are counted in characters, not bytes.
pub fn validate_seo_metadata(metadata: &SeoMetadata) -> SeoValidation {
    let mut issues = Vec::new();

    let title_len = metadata.title.chars().count();
    if !SEO_TITLE_LENGTH.contains(&title_len) {
        issues.push(format!(
            "Title length {title_len} outside {}-{} characters",
            SEO_TITLE_LENGTH.start(),
            SEO_TITLE_LENGTH.end()
        ));
    }

    let description_len = metadata.meta_description.chars().count();
    if !SEO_META_DESCRIPTION_LENGTH.contains(&description_len) {
        issues.push(format!(
            "Meta description length {description_len} outside {}-{} characters",
            SEO_META_DESCRIPTION_LENGTH.start(),
            SEO_META_DESCRIPTION_LENGTH.end()
        ));
    }

    let density = metadata.keyword_density;
    if !density.is_finite() || !SEO_KEYWORD_DENSITY.contains(&density) {
        issues.push(format!(
            "Keyword density {density:.2}% outside {}-{}%",
            SEO_KEYWORD_DENSITY.start(),
            SEO_KEYWORD_DENSITY.end()
        ));
    }

    SeoValidation {
        passed: issues.is_empty(),
        issues,
    }
}

/// Turns an SEO validation into the `seo` gate verdict, scored by density.
pub fn seo_gate(metadata: &SeoMetadata) -> QualityGateVerdict {
    let validation = validate_seo_metadata(metadata);
    let reason = if validation.passed {
        "SEO metadata within limits".to_string()
    } else {
        validation.issues.join("; ")
    };
    QualityGateVerdict::new(validation.passed, reason).with_score(metadata.keyword_density)
}

// ---------------------------------------------------------------------------
// Voice / tone
// ---------------------------------------------------------------------------

/// The `voiceTone` gate: passes only if the score reaches the threshold AND
/// the audit itself reported a pass.
pub fn voice_tone_gate(report: &VoiceToneResult) -> QualityGateVerdict {
    let score = report.alignment_score.as_u8();
    let passed = score >= VOICE_TONE_PASS_SCORE && report.passed;
    let reason = if passed {
        format!("Alignment score {score} meets threshold {VOICE_TONE_PASS_SCORE}")
    } else if !report.passed {
        format!("Voice/tone audit did not pass (alignment score {score})")
    } else {
        format!("Alignment score {score} below threshold {VOICE_TONE_PASS_SCORE}")
    };
    QualityGateVerdict::new(passed, reason).with_score(f64::from(score))
}

// ---------------------------------------------------------------------------
// Completeness
// ---------------------------------------------------------------------------

/// The `completeness` gate: at least 80% of outline sections were drafted.
pub fn completeness_gate(drafted: usize, planned: usize) -> QualityGateVerdict {
    let ratio = if planned == 0 {
        0.0
    } else {
        drafted as f64 / planned as f64
    };
    QualityGateVerdict::new(
        ratio >= MIN_COMPLETENESS_RATIO,
        format!("{drafted}/{planned} sections completed"),
    )
    .with_score(ratio)
}

/// The `outline` gate, which is only ever built for a validated outline.
pub fn outline_gate() -> QualityGateVerdict {
    QualityGateVerdict::new(true, "Outline meets requirements")
}
