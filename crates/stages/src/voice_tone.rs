//! Voice/tone stage: audits the assembled draft against the brand guidance.

use std::fmt::Write as _;

use pipeline::{MarketingContext, SectionContents, Stage, StageError, VoiceToneResult};

use crate::gateway::{truncate_chars, LlmGateway};
use crate::prompts;

const SYSTEM_PROMPT: &str = "You are a brand editor auditing a marketing article against brand \
guidelines. Respond with a single JSON object and nothing else, with keys: alignmentScore \
(integer 0-100), issues (array of {sectionKey, issue, suggestion, severity: \
\"low\"|\"medium\"|\"high\"}), overallFeedback (string), passed (boolean).";

/// Characters of each section shown next to its key so issues can be attributed.
const SECTION_PREVIEW_CHARS: usize = 160;

pub struct VoiceToneInput<'a> {
    /// The complete draft. Only the first `excerpt_chars` reach the prompt.
    pub full_draft: &'a str,
    pub excerpt_chars: usize,
    pub marketing_context: &'a MarketingContext,
    pub section_contents: &'a SectionContents,
}

pub fn build_prompt(input: &VoiceToneInput<'_>) -> String {
    let mut prompt = String::from("Brand guidelines:\n");
    prompt.push_str(&prompts::brand_guidance_block(input.marketing_context));

    if !input.section_contents.is_empty() {
        prompt.push_str("\nSections (key: opening):\n");
        for (key, content) in input.section_contents {
            let _ = writeln!(
                prompt,
                "- {key}: {}",
                truncate_chars(content, SECTION_PREVIEW_CHARS).replace('\n', " ")
            );
        }
    }

    let _ = write!(
        prompt,
        "\nArticle draft (excerpt):\n{}\n",
        truncate_chars(input.full_draft, input.excerpt_chars)
    );
    prompt
}

/// Runs the voice/tone audit once. The gate verdict is recomputed by the executor.
pub async fn run(
    gateway: &LlmGateway<'_>,
    input: &VoiceToneInput<'_>,
) -> Result<VoiceToneResult, StageError> {
    let request = gateway.request(Stage::VoiceTone, SYSTEM_PROMPT, build_prompt(input));
    let report: VoiceToneResult = gateway.generate_json(request).await?;
    tracing::info!(
        alignment_score = report.alignment_score.as_u8(),
        issues = report.issues.len(),
        model_passed = report.passed,
        "Voice/tone audit complete"
    );
    Ok(report)
}
