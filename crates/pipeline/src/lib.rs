//! Core content domain for Copyforge.
//!
//! This crate contains every data contract exchanged between pipeline stages,
//! the stage validators and quality-gate rules, the executor configuration,
//! the error taxonomy, and the [`GenerationProvider`] port. Infrastructure
//! crates implement the port; they never add domain rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is needed; the `stages` and `llm` crates define *how*.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`PipelineRunId`, `SectionKey`, `Slug`) |
//! | [`types`] | Value types with invariants (`AlignmentScore`, `Temperature`, `Timestamp`) |
//! | [`content`] | Inbound contract and per-stage results |
//! | [`gates`] | Validators and quality-gate verdicts |
//! | [`provider`] | The generation provider port and its error type |
//! | [`config`] | Executor configuration and stage policy |
//! | [`errors`] | Stage and pipeline errors, retry policy |
//! | [`result`] | The terminal `PipelineResult` |

pub mod config;
pub mod content;
pub mod errors;
pub mod gates;
pub mod identifiers;
pub mod provider;
pub mod result;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use config::{Backoff, PipelineConfig, StageMaxTokens, StagePolicy, StageTemperatures};
pub use content::{
    count_words, ClientProfile, DraftSectionResult, DraftedSection, IssueSeverity,
    MarketingContext, OutlineResult, OutlineSection, PipelineInput, ResearchResult,
    SectionContents, SectionType, SeoMetadata, VoiceToneIssue, VoiceToneResult,
};
pub use errors::{PipelineError, RetryPolicy, StageError};
pub use gates::{
    completeness_gate, outline_gate, seo_gate, validate_outline, validate_seo_metadata,
    voice_tone_gate, OutlineValidation, QualityGateVerdict, QualityGates, SeoValidation,
};
pub use identifiers::{PipelineRunId, SectionKey, Slug};
pub use provider::{GenerationProvider, GenerationRequest, ProviderError, Stage};
pub use result::PipelineResult;
pub use types::{AlignmentScore, Temperature, Timestamp};
