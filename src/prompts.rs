//! Prompt templates loaded from YAML.
//!
//! The file is a nested mapping (`summary.standard.system`, ...). A missing
//! file falls back to the templates compiled into the binary.

use serde_yaml::Value;
use std::path::Path;
use tracing::{error, warn};

const BUILTIN_PROMPTS: &str = include_str!("../prompts.yaml");

#[derive(Debug, Clone, Default)]
pub struct PromptLoader {
    prompts: Value,
}

impl PromptLoader {
    /// Load prompts from `path`.
    ///
    /// A missing file uses the built-in templates; an unreadable or invalid
    /// file is logged and yields an empty set, so every lookup falls back to
    /// its caller's default.
    pub fn load(path: &Path) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "Prompt file not found; using built-in defaults");
                return Self::builtin();
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Error loading prompts");
                return Self::default();
            }
        };
        Self::from_yaml(&raw).unwrap_or_else(|e| {
            error!(path = %path.display(), error = %e, "Error parsing prompts");
            Self::default()
        })
    }

    pub fn builtin() -> Self {
        Self::from_yaml(BUILTIN_PROMPTS).unwrap_or_default()
    }

    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        let prompts: Value = serde_yaml::from_str(raw)?;
        Ok(Self { prompts })
    }

    /// Deep lookup of a string value.
    pub fn get(&self, keys: &[&str]) -> Option<String> {
        let mut value = &self.prompts;
        for key in keys {
            value = value.get(*key)?;
        }
        value.as_str().map(str::to_string)
    }

    pub fn get_or(&self, keys: &[&str], default: &str) -> String {
        self.get(keys).unwrap_or_else(|| default.to_string())
    }
}

/// Replace every `{name}` placeholder with its value. Unknown placeholders
/// are left as they are.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |acc, (name, value)| {
        acc.replace(&format!("{{{name}}}"), value)
    })
}
