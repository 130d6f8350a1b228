//! Research stage: audience pain points, facts and angles for the topic.

use std::fmt::Write as _;

use pipeline::{ClientProfile, MarketingContext, ResearchResult, Stage, StageError};

use crate::gateway::LlmGateway;
use crate::prompts;

const SYSTEM_PROMPT: &str = "You are a senior content strategist researching a topic for a \
long-form marketing article. Respond with a single JSON object and nothing else, using exactly \
these keys, each an array of short strings: painPoints, keyFacts, differentiators, \
relatedSubtopics, suggestedAngles.";

pub struct ResearchInput<'a> {
    pub topic: &'a str,
    pub target_keyword: &'a str,
    pub client_profile: &'a ClientProfile,
    pub marketing_context: Option<&'a MarketingContext>,
}

pub fn build_prompt(input: &ResearchInput<'_>) -> String {
    let mut prompt = String::new();
    let _ = writeln!(prompt, "Topic: {}", input.topic);
    let _ = writeln!(prompt, "Target keyword: {}", input.target_keyword);
    prompt.push_str(&prompts::client_profile_block(input.client_profile));
    if let Some(context) = input.marketing_context {
        prompts::push_list(&mut prompt, "Key messages", &context.key_messages);
        prompts::push_list(&mut prompt, "Competitors", &context.competitors);
    }
    prompt.push_str(
        "\nIdentify what the audience struggles with, verifiable facts worth citing, how the \
         product stands apart, adjacent subtopics, and angles that would make the article \
         stand out.",
    );
    prompt
}

/// Runs the research stage. Not retried; a failure ends the run.
pub async fn run(
    gateway: &LlmGateway<'_>,
    input: &ResearchInput<'_>,
) -> Result<ResearchResult, StageError> {
    let request = gateway.request(Stage::Research, SYSTEM_PROMPT, build_prompt(input));
    let research: ResearchResult = gateway.generate_json(request).await?;
    tracing::info!(
        pain_points = research.pain_points.len(),
        key_facts = research.key_facts.len(),
        angles = research.suggested_angles.len(),
        "Research complete"
    );
    Ok(research)
}
