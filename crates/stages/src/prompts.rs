//! Prompt fragments shared by several stage agents.

use std::fmt::Write as _;

use pipeline::{ClientProfile, MarketingContext, ResearchResult};

/// Words banned from every draft regardless of the brand's own don'ts list.
pub const GENERIC_HYPE_WORDS: &[&str] = &[
    "revolutionary",
    "game-changing",
    "game changer",
    "cutting-edge",
    "best-in-class",
    "world-class",
    "synergy",
    "disruptive",
    "seamless",
    "unleash",
    "supercharge",
    "next-level",
];

/// Appends `- item` lines under a heading, skipping the heading when empty.
pub fn push_list(out: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(out, "{heading}:");
    for item in items {
        let _ = writeln!(out, "- {item}");
    }
}

pub fn client_profile_block(profile: &ClientProfile) -> String {
    let mut out = String::new();
    if let Some(summary) = profile.product_service_summary.as_deref() {
        let _ = writeln!(out, "Product/service: {summary}");
    }
    if let Some(audience) = profile.target_audience.as_deref() {
        let _ = writeln!(out, "Target audience: {audience}");
    }
    out
}

/// Brand voice, tone and don'ts, including the always-on hype-word ban.
pub fn brand_guidance_block(context: &MarketingContext) -> String {
    let mut out = String::new();
    if !context.brand_voice.is_empty() {
        let _ = writeln!(out, "Brand voice: {}", context.brand_voice.join(", "));
    }
    if !context.brand_tone.trim().is_empty() {
        let _ = writeln!(out, "Brand tone: {}", context.brand_tone);
    }
    if let Some(persona) = context.target_persona.as_deref() {
        let _ = writeln!(out, "Target persona: {persona}");
    }
    push_list(&mut out, "Key messages", &context.key_messages);
    push_list(&mut out, "Competitors (never name them)", &context.competitors);
    push_list(&mut out, "Never do", &context.content_donts);
    let _ = writeln!(
        out,
        "Never use generic hype words such as: {}",
        GENERIC_HYPE_WORDS.join(", ")
    );
    out
}

pub fn research_block(research: &ResearchResult) -> String {
    let mut out = String::new();
    push_list(&mut out, "Audience pain points", &research.pain_points);
    push_list(&mut out, "Key facts", &research.key_facts);
    push_list(&mut out, "Differentiators", &research.differentiators);
    push_list(&mut out, "Related subtopics", &research.related_subtopics);
    push_list(&mut out, "Suggested angles", &research.suggested_angles);
    out
}
