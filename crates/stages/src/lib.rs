//! Copyforge stage agents, LLM gateway, and pipeline executor.
//!
//! This crate provides the five stage agents (research, outline, draft
//! section, SEO, voice/tone), the LLM gateway that wraps every provider call
//! with per-stage sampling settings, timeout and cancellation, and the
//! [`PipelineExecutor`] that sequences them into one run.
//!
//! ## Architectural Layer
//!
//! **Orchestration layer.** Agents build prompts and parse responses; the
//! executor sequences them and applies the quality gates defined in the
//! [`pipeline`] crate. Gate rules themselves live in [`pipeline::gates`].
//!
//! Each agent is a plain async function of `(gateway, input)`. Agents hold
//! no state and know nothing about each other.

pub mod draft;
pub mod executor;
pub mod gateway;
pub mod outline;
pub mod prompts;
pub mod research;
pub mod seo;
pub mod voice_tone;

pub use executor::{PipelineExecutor, RunState, SECTION_SEPARATOR};
pub use gateway::LlmGateway;
pub use tokio_util::sync::CancellationToken;
