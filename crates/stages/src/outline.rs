//! Outline stage: the ordered section plan the draft is written against.

use std::fmt::Write as _;

use serde::Deserialize;

use pipeline::{ClientProfile, OutlineResult, OutlineSection, ResearchResult, Stage, StageError};

use crate::gateway::LlmGateway;
use crate::prompts;

const SYSTEM_PROMPT: &str = "You are a senior content strategist planning a long-form marketing \
article. Respond with a single JSON object and nothing else, shaped as \
{\"sections\": [{\"key\": string, \"title\": string, \
\"type\": \"intro\"|\"body\"|\"conclusion\"|\"cta\", \
\"keyPoints\": [string], \"estimatedWords\": integer}]}. Keys must be unique, lowercase and \
hyphenated. Include exactly one intro, at least two body sections, exactly one conclusion and at \
least one cta.";

pub struct OutlineInput<'a> {
    pub topic: &'a str,
    pub target_keyword: &'a str,
    pub word_count_goal: u32,
    pub research: &'a ResearchResult,
    pub client_profile: &'a ClientProfile,
}

/// The model's answer. Its own total, if any, is ignored.
#[derive(Deserialize)]
struct OutlineResponse {
    sections: Vec<OutlineSection>,
}

pub fn build_prompt(input: &OutlineInput<'_>) -> String {
    let mut prompt = String::new();
    let _ = writeln!(prompt, "Topic: {}", input.topic);
    let _ = writeln!(prompt, "Target keyword: {}", input.target_keyword);
    let _ = writeln!(
        prompt,
        "Word count goal: {} (section estimates must add up to at least {})",
        input.word_count_goal,
        minimum_projected_words(input.word_count_goal)
    );
    prompt.push_str(&prompts::client_profile_block(input.client_profile));
    if !input.research.is_empty() {
        prompt.push_str("\nResearch findings:\n");
        prompt.push_str(&prompts::research_block(input.research));
    }
    prompt.push_str("\nPlan at least four sections in reading order.");
    prompt
}

fn minimum_projected_words(goal: u32) -> u32 {
    (f64::from(goal) * pipeline::gates::MIN_OUTLINE_WORD_RATIO).ceil() as u32
}

/// Runs the outline stage once. Validation and retries belong to the executor.
pub async fn run(
    gateway: &LlmGateway<'_>,
    input: &OutlineInput<'_>,
) -> Result<OutlineResult, StageError> {
    let request = gateway.request(Stage::Outline, SYSTEM_PROMPT, build_prompt(input));
    let response: OutlineResponse = gateway.generate_json(request).await?;
    let outline = OutlineResult::from_sections(response.sections);
    tracing::debug!(
        sections = outline.sections.len(),
        estimated_words = outline.total_estimated_words,
        "Outline generated"
    );
    Ok(outline)
}
