//! Typed error hierarchy for the pilot orchestrator.
//!
//! Each subsystem gets its own type:
//! - `SchemaError` — blueprint/prompt source malformed, carries every violation
//! - `ConfigError` — missing credential or tool prerequisite
//! - `StateError` — an operation needed run state that is absent
//! - `PromptError` — generative-service call failures
//! - `ToolError` — tool dispatch failures
//! - `RunError` — top-level run failures, wrapping all of the above

use thiserror::Error;

/// Blueprint or prompt source failed structural validation.
///
/// Validation collects every violation before failing, so a single error
/// carries the full list rather than just the first defect found.
#[derive(Debug)]
pub struct SchemaError {
    pub violations: Vec<String>,
}

impl std::error::Error for SchemaError {}

impl SchemaError {
    pub fn new(violations: Vec<String>) -> Self {
        Self { violations }
    }
}

impl std::fmt::Display for SchemaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "schema validation failed ({} violation(s)):",
            self.violations.len()
        )?;
        for v in &self.violations {
            writeln!(f, "  - {}", v)?;
        }
        Ok(())
    }
}

/// A required credential or external tool prerequisite is missing.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ConfigError(pub String);

/// An operation required run state that has not been produced yet.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct StateError(pub String);

/// Errors from the prompt executor.
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("model API rate limited (HTTP 429)")]
    RateLimited,

    #[error("model API returned {status}: {body}")]
    Service { status: u16, body: String },

    #[error("model API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors from tool dispatch.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error("{service} returned {status}: {body}")]
    ExternalService {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("request to {service} failed: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Top-level errors from running a blueprint.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("step limit of {limit} exceeded while executing phase '{phase}'; the blueprint likely contains an unintended cycle")]
    StepLimit { limit: u32, phase: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
