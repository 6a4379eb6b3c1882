#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! LLM-backed risk analysis for submitted inspections.
//!
//! Supports Anthropic Claude, `OpenAI` (and any `OpenAI`-compatible
//! local/self-hosted server via `AI_BASE_URL`), Google Gemini, and AWS
//! Bedrock (feature-gated). The [`analysis`] module turns an inspection
//! form plus its verdict into a single multimodal request (prompt text and
//! the defect photographs of failing items) and parses the structured
//! reply. Any failure along the way resolves to a fixed fallback result,
//! so callers always get something to display.

pub mod analysis;
pub mod providers;

use thiserror::Error;

/// Errors that can occur during AI operations.
///
/// These never escape [`analysis::analyze_inspection`]; they surface only
/// from the lower-level provider and parsing functions.
#[derive(Debug, Error)]
pub enum AiError {
    /// HTTP request to LLM provider failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Provider-specific error.
    #[error("Provider error: {message}")]
    Provider {
        /// Description of what went wrong.
        message: String,
    },

    /// The model replied, but not with a usable analysis.
    #[error("Invalid analysis response: {message}")]
    InvalidResponse {
        /// Description of what was wrong with the reply.
        message: String,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config {
        /// Description.
        message: String,
    },
}
