//! Runtime configuration for pilot.
//!
//! All settings come from the environment (a `.env` file is loaded by the
//! CLI before this is read), with sensible defaults for everything except
//! the API key.

use std::path::PathBuf;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_ARTIFACT_DIR: &str = "run_artifacts";
pub const DEFAULT_MAX_STEPS: u32 = 100;

#[derive(Debug, Clone)]
pub struct Config {
    /// Model identifier sent with every generative call.
    pub model: String,
    /// Bearer token for the model API. Absent is fine in offline mode.
    pub api_key: Option<String>,
    /// Base URL of the model API.
    pub api_base: String,
    /// When set, prompt execution returns deterministic mock output and
    /// never touches the network.
    pub offline: bool,
    /// Directory artifacts are written under.
    pub artifacts_dir: PathBuf,
    /// Upper bound on phase executions per run; bounds runaway cycles.
    pub max_steps: u32,
}

impl Config {
    pub fn from_env() -> Self {
        let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let api_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty());
        let api_base =
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        let offline = std::env::var("OPENAI_OFFLINE")
            .map(|v| truthy(&v))
            .unwrap_or(false);
        let artifacts_dir = std::env::var("PILOT_ARTIFACT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_ARTIFACT_DIR));
        let max_steps = std::env::var("PILOT_MAX_STEPS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_STEPS);

        Self {
            model,
            api_key,
            api_base,
            offline,
            artifacts_dir,
            max_steps,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            offline: false,
            artifacts_dir: PathBuf::from(DEFAULT_ARTIFACT_DIR),
            max_steps: DEFAULT_MAX_STEPS,
        }
    }
}

fn truthy(v: &str) -> bool {
    matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthy_accepts_the_usual_spellings() {
        assert!(truthy("1"));
        assert!(truthy("true"));
        assert!(truthy("TRUE"));
        assert!(truthy("yes"));
        assert!(!truthy("0"));
        assert!(!truthy("no"));
        assert!(!truthy(""));
    }

    #[test]
    fn default_config_is_online_with_bounded_steps() {
        let config = Config::default();
        assert!(!config.offline);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.max_steps, DEFAULT_MAX_STEPS);
        assert!(config.api_key.is_none());
    }
}
