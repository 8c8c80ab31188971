//! Role-prompt library: a YAML mapping from prompt name to prompt text.
//!
//! Each phase's `entry_prompt` field is a key into this library.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;

use crate::errors::SchemaError;

#[derive(Debug, Clone, Default)]
pub struct PromptLibrary {
    prompts: HashMap<String, String>,
}

impl PromptLibrary {
    pub fn new(prompts: HashMap<String, String>) -> Self {
        Self { prompts }
    }

    /// Load the library from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read prompts file: {}", path.display()))?;
        Ok(Self::from_yaml(&content)?)
    }

    /// Parse the library from YAML source. The document must be a mapping
    /// from string names to string prompt texts.
    pub fn from_yaml(source: &str) -> Result<Self, SchemaError> {
        let value: serde_yaml::Value = serde_yaml::from_str(source)
            .map_err(|e| SchemaError::new(vec![format!("invalid YAML: {}", e)]))?;

        let Some(map) = value.as_mapping() else {
            return Err(SchemaError::new(vec![
                "prompts: expected a mapping of name to prompt text".into(),
            ]));
        };

        let mut violations = Vec::new();
        let mut prompts = HashMap::new();
        for (key, text) in map {
            match (key.as_str(), text.as_str()) {
                (Some(name), Some(text)) => {
                    prompts.insert(name.to_string(), text.to_string());
                }
                (None, _) => violations.push("prompts: expected string key".into()),
                (Some(name), None) => {
                    violations.push(format!("prompts.{}: expected string prompt text", name))
                }
            }
        }

        if violations.is_empty() {
            Ok(Self { prompts })
        } else {
            Err(SchemaError::new(violations))
        }
    }

    /// Look up a role prompt by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.prompts.get(name).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_name_to_text_mapping() {
        let lib = PromptLibrary::from_yaml("designer: Draft wireframes.\nengineer: Build it.\n")
            .unwrap();
        assert_eq!(lib.get("designer"), Some("Draft wireframes."));
        assert_eq!(lib.get("missing"), None);
    }

    #[test]
    fn non_string_prompt_text_is_a_violation() {
        let err = PromptLibrary::from_yaml("designer: [not, text]").unwrap_err();
        assert!(err.violations[0].contains("designer"));
    }

    #[test]
    fn non_mapping_document_is_a_violation() {
        let err = PromptLibrary::from_yaml("- just\n- a\n- list\n").unwrap_err();
        assert!(err.violations[0].contains("expected a mapping"));
    }
}
