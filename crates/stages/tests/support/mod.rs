//! Scripted generation provider and canned model responses for executor tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use pipeline::{
    ClientProfile, GenerationProvider, GenerationRequest, MarketingContext, PipelineInput,
    ProviderError, Stage,
};

/// What the provider does for one call.
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Fail(ProviderError),
    /// Never answers within any reasonable test timeout.
    Hang,
    /// Panics inside the provider with the given message.
    Panic(&'static str),
}

/// A provider that answers from per-stage queues, falling back to a per-stage
/// default once a queue is empty, and records every request it receives.
#[derive(Default)]
pub struct ScriptedProvider {
    queues: Mutex<HashMap<Stage, VecDeque<Reply>>>,
    fallbacks: Mutex<HashMap<Stage, Reply>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider whose every stage answers with a valid canned response.
    pub fn happy() -> Self {
        Self::new()
            .always(Stage::Research, Reply::Text(research_json()))
            .always(Stage::Outline, Reply::Text(valid_outline_json()))
            .always(Stage::DraftSection, Reply::Text(draft_json("any", "Drafted body text.")))
            .always(Stage::Seo, Reply::Text(seo_json(55, 140, 1.5)))
            .always(Stage::VoiceTone, Reply::Text(voice_tone_json(88, true)))
    }

    /// Queues replies for the next calls of `stage`, in order.
    pub fn then(self, stage: Stage, replies: impl IntoIterator<Item = Reply>) -> Self {
        self.queues
            .lock()
            .unwrap()
            .entry(stage)
            .or_default()
            .extend(replies);
        self
    }

    /// Sets the reply used once the queue for `stage` is empty.
    pub fn always(self, stage: Stage, reply: Reply) -> Self {
        self.fallbacks.lock().unwrap().insert(stage, reply);
        self
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn stages_called(&self) -> Vec<Stage> {
        self.requests().into_iter().map(|r| r.stage).collect()
    }

    pub fn calls_for(&self, stage: Stage) -> Vec<GenerationRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.stage == stage)
            .collect()
    }

    fn next_reply(&self, stage: Stage) -> Reply {
        if let Some(reply) = self
            .queues
            .lock()
            .unwrap()
            .get_mut(&stage)
            .and_then(VecDeque::pop_front)
        {
            return reply;
        }
        self.fallbacks
            .lock()
            .unwrap()
            .get(&stage)
            .cloned()
            .unwrap_or_else(|| {
                Reply::Fail(ProviderError::Api {
                    status: 500,
                    message: format!("no scripted reply for {stage}"),
                })
            })
    }
}

#[async_trait]
impl GenerationProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn call(&self, request: GenerationRequest) -> Result<String, ProviderError> {
        let stage = request.stage;
        self.requests.lock().unwrap().push(request);
        match self.next_reply(stage) {
            Reply::Text(text) => Ok(text),
            Reply::Fail(err) => Err(err),
            Reply::Panic(message) => panic!("{message}"),
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(ProviderError::Transport {
                    message: "hung".to_string(),
                })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Canned inputs and responses
// ---------------------------------------------------------------------------

pub fn input() -> PipelineInput {
    PipelineInput {
        topic: "Smoke Test".to_string(),
        target_keyword: "smoke testing".to_string(),
        word_count_goal: 1000,
        client_profile: ClientProfile {
            product_service_summary: Some("Hosted CI for small teams".to_string()),
            target_audience: Some("Engineering leads".to_string()),
        },
        marketing_context: MarketingContext {
            brand_voice: vec!["plain-spoken".to_string()],
            brand_tone: "confident".to_string(),
            content_donts: vec!["No exclamation marks".to_string()],
            ..MarketingContext::default()
        },
    }
}

pub fn research_json() -> String {
    json!({
        "painPoints": ["Flaky pipelines"],
        "keyFacts": ["Most failures are environmental"],
        "differentiators": ["Hermetic runners"],
        "relatedSubtopics": ["Test pyramids"],
        "suggestedAngles": ["Cost of a red build"]
    })
    .to_string()
}

pub fn outline_json(sections: &[(&str, &str, u32)]) -> String {
    let sections: Vec<_> = sections
        .iter()
        .map(|(key, section_type, words)| {
            json!({
                "key": key,
                "title": format!("{key} title"),
                "type": section_type,
                "keyPoints": [format!("{key} point")],
                "estimatedWords": words
            })
        })
        .collect();
    json!({ "sections": sections }).to_string()
}

/// intro, two bodies, conclusion, cta: 1000 words in total.
pub const VALID_SECTIONS: [(&str, &str, u32); 5] = [
    ("intro", "intro", 150),
    ("problem", "body", 300),
    ("solution", "body", 300),
    ("conclusion", "conclusion", 150),
    ("cta", "cta", 100),
];

pub fn valid_outline_json() -> String {
    outline_json(&VALID_SECTIONS)
}

/// The three-section near miss: no CTA and a single body section.
pub fn smoke_outline_json() -> String {
    outline_json(&[
        ("intro", "intro", 200),
        ("body", "body", 300),
        ("conclusion", "conclusion", 150),
    ])
}

pub fn draft_json(key: &str, content: &str) -> String {
    json!({ "sectionKey": key, "content": content }).to_string()
}

pub fn seo_json(title_len: usize, description_len: usize, density: f64) -> String {
    json!({
        "title": "T".repeat(title_len),
        "metaDescription": "D".repeat(description_len),
        "slug": "smoke-testing-guide",
        "suggestions": ["Add an FAQ"],
        "keywordDensity": density,
        "readabilityScore": "Grade 8"
    })
    .to_string()
}

pub fn voice_tone_json(score: u8, passed: bool) -> String {
    json!({
        "alignmentScore": score,
        "issues": [],
        "overallFeedback": "On brand",
        "passed": passed
    })
    .to_string()
}
