//! SEO stage: title, meta description, slug and keyword density for the draft.

use std::fmt::Write as _;

use serde::Deserialize;

use pipeline::{count_words, SeoMetadata, Slug, Stage, StageError};

use crate::gateway::{truncate_chars, LlmGateway};

const SYSTEM_PROMPT: &str = "You are an SEO specialist. Respond with a single JSON object and \
nothing else, with keys: title (50-60 characters), metaDescription (120-160 characters), slug \
(lowercase, hyphenated), suggestions (array of strings), keywordDensity (target keyword \
occurrences per hundred words, as a number), readabilityScore (short label).";

pub struct SeoInput<'a> {
    /// The complete draft. Only the first `excerpt_chars` reach the prompt.
    pub full_draft: &'a str,
    pub excerpt_chars: usize,
    pub topic: Option<&'a str>,
    pub target_keyword: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeoResponse {
    title: String,
    meta_description: String,
    #[serde(default)]
    slug: String,
    #[serde(default)]
    suggestions: Vec<String>,
    #[serde(default)]
    keyword_density: Option<f64>,
    #[serde(default)]
    readability_score: String,
}

pub fn build_prompt(input: &SeoInput<'_>) -> String {
    let mut prompt = String::new();
    if let Some(topic) = input.topic {
        let _ = writeln!(prompt, "Topic: {topic}");
    }
    if let Some(keyword) = input.target_keyword {
        let _ = writeln!(prompt, "Target keyword: {keyword}");
    }
    let _ = write!(
        prompt,
        "\nArticle draft (excerpt):\n{}\n",
        truncate_chars(input.full_draft, input.excerpt_chars)
    );
    prompt
}

/// Keyword occurrences per hundred words, case-insensitive.
pub fn keyword_density(text: &str, keyword: &str) -> f64 {
    let words = count_words(text);
    let keyword = keyword.trim().to_lowercase();
    if words == 0 || keyword.is_empty() {
        return 0.0;
    }
    let occurrences = text.to_lowercase().matches(keyword.as_str()).count();
    occurrences as f64 * 100.0 / f64::from(words)
}

fn resolve_slug(raw: &str, title: &str) -> Option<Slug> {
    Slug::new(raw.trim())
        .filter(Slug::is_well_formed)
        .or_else(|| Slug::from_title(raw))
        .or_else(|| Slug::from_title(title))
}

fn into_metadata(response: SeoResponse, input: &SeoInput<'_>) -> Result<SeoMetadata, StageError> {
    let slug = resolve_slug(&response.slug, &response.title).ok_or_else(|| StageError::Parse {
        stage: Stage::Seo,
        message: "no usable slug or title in response".to_string(),
    })?;

    let keyword_density = match (response.keyword_density, input.target_keyword) {
        (Some(density), _) if density.is_finite() && density >= 0.0 => density,
        (_, Some(keyword)) => keyword_density(input.full_draft, keyword),
        _ => 0.0,
    };

    Ok(SeoMetadata {
        title: response.title.trim().to_string(),
        meta_description: response.meta_description.trim().to_string(),
        slug,
        suggestions: response.suggestions,
        keyword_density,
        readability_score: response.readability_score,
    })
}

/// Runs the SEO stage once. Validation happens in the executor's gate.
pub async fn run(
    gateway: &LlmGateway<'_>,
    input: &SeoInput<'_>,
) -> Result<SeoMetadata, StageError> {
    let request = gateway.request(Stage::Seo, SYSTEM_PROMPT, build_prompt(input));
    let response: SeoResponse = gateway.generate_json(request).await?;
    into_metadata(response, input)
}
