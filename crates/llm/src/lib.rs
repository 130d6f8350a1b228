//! Copyforge LLM provider adapter.
//!
//! Implements the [`pipeline::GenerationProvider`] trait for Anthropic's
//! Messages API. Additional providers are added as new `impl` blocks in this
//! crate without any changes to the `pipeline` crate.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** HTTP transport, request formatting, response parsing
//! and status-code classification live here. The [`pipeline`] crate sees only
//! [`pipeline::GenerationProvider`] and [`pipeline::ProviderError`].

pub mod anthropic;

pub use anthropic::{
    AnthropicConfig, AnthropicProvider, API_VERSION, DEFAULT_BASE_URL, DEFAULT_MODEL,
};
