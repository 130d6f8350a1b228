//! Draft-section stage and the accumulator threaded through the draft fold.
//!
//! Sections are drafted strictly in outline order. Each prompt carries the
//! bodies of the most recent previous sections (bounded by the configured
//! window) so the prose reads continuously without the prompt growing with
//! the article.

use std::collections::VecDeque;
use std::fmt::Write as _;

use serde::Deserialize;

use pipeline::{
    ClientProfile, DraftSectionResult, MarketingContext, OutlineSection, ResearchResult,
    SectionKey, Stage, StageError,
};

use crate::gateway::LlmGateway;
use crate::prompts;

const SYSTEM_PROMPT: &str = "You are a senior copywriter drafting one section of a long-form \
marketing article. Respond with a single JSON object and nothing else, shaped as \
{\"sectionKey\": string, \"content\": string}. The content is Markdown prose for this section \
only, without the section heading.";

pub struct DraftSectionInput<'a> {
    pub section: &'a OutlineSection,
    pub topic: &'a str,
    pub target_keyword: Option<&'a str>,
    pub marketing_context: Option<&'a MarketingContext>,
    /// Bodies of earlier sections, most recent last.
    pub previous_sections: &'a [String],
    /// How many of `previous_sections` (counting from the end) the prompt includes.
    pub context_window: usize,
    pub research: Option<&'a ResearchResult>,
    pub client_profile: Option<&'a ClientProfile>,
}

/// Draft text as the model returned it, before key stamping.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDraftSection {
    /// The key the model echoed back. Informational only.
    #[serde(default)]
    pub section_key: Option<String>,
    pub content: String,
}

impl RawDraftSection {
    /// Stamps the result with the key of the section it was requested for.
    pub fn stamp(self, section_key: &SectionKey) -> DraftSectionResult {
        if let Some(echoed) = self.section_key.as_deref() {
            if echoed != section_key.as_str() {
                tracing::warn!(
                    expected = %section_key,
                    echoed,
                    "Model echoed a different section key; using the requested key"
                );
            }
        }
        DraftSectionResult::new(section_key.clone(), self.content)
    }
}

pub fn build_prompt(input: &DraftSectionInput<'_>) -> String {
    let section = input.section;
    let mut prompt = String::new();
    let _ = writeln!(prompt, "Article topic: {}", input.topic);
    if let Some(keyword) = input.target_keyword {
        let _ = writeln!(prompt, "Target keyword (use naturally): {keyword}");
    }
    let _ = writeln!(
        prompt,
        "Section: \"{}\" (key: {}, type: {})",
        section.title, section.key, section.section_type
    );
    let _ = writeln!(prompt, "Target length: about {} words", section.estimated_words);
    prompts::push_list(&mut prompt, "Key points to cover", &section.key_points);

    if let Some(profile) = input.client_profile {
        prompt.push_str(&prompts::client_profile_block(profile));
    }
    if let Some(research) = input.research {
        if !research.is_empty() {
            prompt.push_str("\nResearch findings:\n");
            prompt.push_str(&prompts::research_block(research));
        }
    }
    if let Some(context) = input.marketing_context {
        prompt.push_str("\nBrand guidance:\n");
        prompt.push_str(&prompts::brand_guidance_block(context));
    }

    let skip = input.previous_sections.len().saturating_sub(input.context_window);
    let recent = &input.previous_sections[skip..];
    if !recent.is_empty() {
        prompt.push_str(
            "\nPreviously written sections (continue naturally from these, do not repeat them):\n",
        );
        for body in recent {
            let _ = writeln!(prompt, "---\n{body}");
        }
        prompt.push_str("---\n");
    }
    prompt
}

/// Drafts one section. The caller stamps the key via [`RawDraftSection::stamp`].
pub async fn run(
    gateway: &LlmGateway<'_>,
    input: &DraftSectionInput<'_>,
) -> Result<RawDraftSection, StageError> {
    let request = gateway.request(Stage::DraftSection, SYSTEM_PROMPT, build_prompt(input));
    let raw: RawDraftSection = gateway.generate_json(request).await?;
    if raw.content.trim().is_empty() {
        return Err(StageError::Parse {
            stage: Stage::DraftSection,
            message: format!("empty content for section {}", input.section.key),
        });
    }
    Ok(raw)
}

// ---------------------------------------------------------------------------
// Fold accumulator
// ---------------------------------------------------------------------------

/// State threaded through the draft fold: drafted sections so far plus the
/// bounded window of recent bodies fed to the next prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftAccumulator {
    window: usize,
    recent: VecDeque<String>,
    drafted: Vec<DraftSectionResult>,
    skipped: Vec<SectionKey>,
}

impl DraftAccumulator {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            recent: VecDeque::with_capacity(window),
            drafted: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// Recent bodies, oldest first, at most `window` of them.
    pub fn previous_sections(&self) -> Vec<String> {
        self.recent.iter().cloned().collect()
    }

    /// Records a drafted section and advances the context window.
    pub fn with_drafted(mut self, result: DraftSectionResult) -> Self {
        if self.window > 0 {
            if self.recent.len() == self.window {
                self.recent.pop_front();
            }
            self.recent.push_back(result.content.clone());
        }
        self.drafted.push(result);
        self
    }

    /// Records a section whose draft failed; the context window is unchanged.
    pub fn with_skipped(mut self, key: SectionKey) -> Self {
        self.skipped.push(key);
        self
    }

    pub fn drafted(&self) -> &[DraftSectionResult] {
        &self.drafted
    }

    pub fn skipped(&self) -> &[SectionKey] {
        &self.skipped
    }

    pub fn into_drafted(self) -> Vec<DraftSectionResult> {
        self.drafted
    }
}
