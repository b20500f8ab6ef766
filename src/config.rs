//! Runtime settings, network constants, and text-processing limits.
//!
//! Settings are read once from the environment (after `.env` has been
//! loaded) and then owned by the [`crate::App`] context. Interactive changes
//! to the provider or model mutate that value; [`save_env_setting`] persists
//! them back to `.env`.

use crate::error::{NewsError, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, instrument};

pub const MAX_RETRIES: u32 = 3;
pub const RETRY_DELAY: Duration = Duration::from_secs(2);
pub const MAX_THREADS: usize = 10;
pub const TIMEOUT: Duration = Duration::from_secs(15);
pub const CACHE_TTL: Duration = Duration::from_secs(60 * 60);

pub const DEFAULT_GROQ_BASE_URL: &str = "https://api.groq.com";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

pub const GROQ_MODELS: &[&str] = &[
    "llama-3.3-70b-versatile",
    "llama-3.1-70b-versatile",
    "mixtral-8x7b-32768",
    "gemma2-9b-it",
];

pub const GEMINI_MODELS: &[&str] = &[
    "gemini-2.0-flash-lite",
    "gemini-2.0-flash-001",
    "gemini-3-flash-preview",
    "gemini-3-pro-preview",
];

/// Named limits for text processing.
pub struct TextLimits;

impl TextLimits {
    pub const GROQ_MAX_INPUT: usize = 15_000;
    pub const GEMINI_MAX_INPUT: usize = 100_000;
    pub const COMBINED_MAX_INPUT: usize = 5_000;
    pub const GEMINI_TWEET_MAX_INPUT: usize = 30_000;

    pub const TWEET_MAX_LENGTH: usize = 2_000;
    pub const SUMMARY_MAX_TOKENS: u32 = 1_024;
    pub const TWEET_MAX_TOKENS: u32 = 300;
    pub const COMBINED_MAX_TOKENS: u32 = 800;

    pub const SENTIMENT_SAMPLE: usize = 1_000;
    pub const TRANSLATION_CHUNK: usize = 4_500;
    pub const MIN_ARTICLE_LENGTH: usize = 100;
    pub const MIN_EXTRACTED_LENGTH: usize = 200;

    pub const TABLE_MAX_ITEMS: usize = 10;
    pub const MARKDOWN_TRUNCATE: usize = 10_000;
    pub const TITLE_MAX_LENGTH: usize = 20;

    pub const DEFAULT_MAX_RESULTS: usize = 50;
    pub const DEFAULT_FILTER_DAYS: i64 = 2;
    pub const DUPLICATE_THRESHOLD: f64 = 0.85;
}

/// Which hosted LLM answers summary and tweet requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AiProvider {
    #[default]
    Groq,
    Gemini,
}

impl AiProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            AiProvider::Groq => "groq",
            AiProvider::Gemini => "gemini",
        }
    }

    pub fn models(&self) -> &'static [&'static str] {
        match self {
            AiProvider::Groq => GROQ_MODELS,
            AiProvider::Gemini => GEMINI_MODELS,
        }
    }
}

impl fmt::Display for AiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AiProvider {
    type Err = NewsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "groq" => Ok(AiProvider::Groq),
            "gemini" => Ok(AiProvider::Gemini),
            other => Err(NewsError::Config(format!("unknown AI provider `{other}`"))),
        }
    }
}

/// Everything the pipeline needs to know about its environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub provider: AiProvider,
    pub groq_api_key: String,
    pub groq_model: String,
    pub groq_base_url: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub output_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub prompt_file: PathBuf,
    pub env_file: PathBuf,
    pub is_termux: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            provider: AiProvider::Groq,
            groq_api_key: String::new(),
            groq_model: GROQ_MODELS[0].to_string(),
            groq_base_url: DEFAULT_GROQ_BASE_URL.to_string(),
            gemini_api_key: String::new(),
            gemini_model: GEMINI_MODELS[0].to_string(),
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            output_dir: PathBuf::from("reports"),
            cache_dir: PathBuf::from(".cache"),
            prompt_file: PathBuf::from("prompts.yaml"),
            env_file: PathBuf::from(".env"),
            is_termux: false,
        }
    }
}

impl Settings {
    /// Build settings from the process environment.
    ///
    /// Call after `dotenvy::dotenv()` so values from `.env` are visible.
    /// An unrecognised `AI_PROVIDER` falls back to Groq.
    #[instrument(level = "debug")]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Settings::default();
        let get = |key: &str, default: String| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(default)
        };

        let provider = lookup("AI_PROVIDER")
            .and_then(|p| p.parse::<AiProvider>().ok())
            .unwrap_or_default();

        let settings = Self {
            provider,
            groq_api_key: get("GROQ_API_KEY", String::new()),
            groq_model: get("GROQ_MODEL", defaults.groq_model),
            groq_base_url: get("GROQ_BASE_URL", defaults.groq_base_url),
            gemini_api_key: get("GEMINI_API_KEY", String::new()),
            gemini_model: get("GEMINI_MODEL", defaults.gemini_model),
            gemini_base_url: get("GEMINI_BASE_URL", defaults.gemini_base_url),
            output_dir: PathBuf::from(get("XNEWS_OUTPUT_DIR", "reports".into())),
            cache_dir: PathBuf::from(get("XNEWS_CACHE_DIR", ".cache".into())),
            prompt_file: PathBuf::from(get("XNEWS_PROMPT_FILE", "prompts.yaml".into())),
            env_file: PathBuf::from(get("XNEWS_ENV_FILE", ".env".into())),
            is_termux: lookup("TERMUX_VERSION").is_some_and(|v| !v.is_empty())
                || lookup("PREFIX").is_some_and(|p| p.starts_with("/data/data/com.termux")),
        };
        debug!(provider = %settings.provider, model = %settings.active_model(), "Loaded settings");
        settings
    }

    /// Termux terminals garble `indicatif` redraws.
    pub fn progress_bars(&self) -> bool {
        !self.is_termux
    }

    pub fn active_model(&self) -> &str {
        match self.provider {
            AiProvider::Groq => &self.groq_model,
            AiProvider::Gemini => &self.gemini_model,
        }
    }

    pub fn set_model(&mut self, model: impl Into<String>) {
        match self.provider {
            AiProvider::Groq => self.groq_model = model.into(),
            AiProvider::Gemini => self.gemini_model = model.into(),
        }
    }

    pub fn has_key(&self, provider: AiProvider) -> bool {
        match provider {
            AiProvider::Groq => !self.groq_api_key.is_empty(),
            AiProvider::Gemini => !self.gemini_api_key.is_empty(),
        }
    }

    /// Persist the active provider and its model to the `.env` file.
    pub fn persist(&self) -> Result<()> {
        save_env_setting(&self.env_file, "AI_PROVIDER", self.provider.as_str())?;
        let model_key = match self.provider {
            AiProvider::Groq => "GROQ_MODEL",
            AiProvider::Gemini => "GEMINI_MODEL",
        };
        save_env_setting(&self.env_file, model_key, self.active_model())
    }
}

/// Update or add `key=value` in a `.env` file.
///
/// The first line starting with `key=` is replaced; if none exists the pair
/// is appended. The file is created when missing.
pub fn save_env_setting(path: &Path, key: &str, value: &str) -> Result<()> {
    let existing = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };

    let prefix = format!("{key}=");
    let mut found = false;
    let mut lines: Vec<String> = existing
        .lines()
        .map(|line| {
            if !found && line.trim_start().starts_with(&prefix) {
                found = true;
                format!("{key}={value}")
            } else {
                line.to_string()
            }
        })
        .collect();

    if !found {
        if lines.last().is_some_and(|l| !l.is_empty()) {
            lines.push(String::new());
        }
        lines.push(format!("{key}={value}"));
    }

    let mut out = lines.join("\n");
    out.push('\n');
    std::fs::write(path, out)?;
    debug!(path = %path.display(), key, "Saved .env setting");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let s = Settings::from_lookup(|_| None);
        assert_eq!(s.provider, AiProvider::Groq);
        assert_eq!(s.groq_model, "llama-3.3-70b-versatile");
        assert_eq!(s.gemini_model, "gemini-2.0-flash-lite");
        assert_eq!(s.output_dir, PathBuf::from("reports"));
        assert!(!s.is_termux);
    }

    #[test]
    fn invalid_provider_falls_back_to_groq() {
        let s = Settings::from_lookup(lookup_from(&[("AI_PROVIDER", "openai")]));
        assert_eq!(s.provider, AiProvider::Groq);
    }

    #[test]
    fn provider_parsing_is_case_insensitive() {
        let s = Settings::from_lookup(lookup_from(&[("AI_PROVIDER", "GEMINI")]));
        assert_eq!(s.provider, AiProvider::Gemini);
        assert_eq!(s.active_model(), "gemini-2.0-flash-lite");
    }

    #[test]
    fn termux_detected_from_prefix() {
        let s = Settings::from_lookup(lookup_from(&[("PREFIX", "/data/data/com.termux/files/usr")]));
        assert!(s.is_termux);
        assert!(!s.progress_bars());
        assert!(Settings::default().progress_bars());
    }

    #[test]
    fn set_model_targets_active_provider() {
        let mut s = Settings::default();
        s.provider = AiProvider::Gemini;
        s.set_model("gemini-3-pro-preview");
        assert_eq!(s.gemini_model, "gemini-3-pro-preview");
        assert_eq!(s.groq_model, "llama-3.3-70b-versatile");
    }

    #[test]
    fn save_env_setting_replaces_and_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "GROQ_API_KEY=abc\nAI_PROVIDER=groq\n").unwrap();

        save_env_setting(&path, "AI_PROVIDER", "gemini").unwrap();
        save_env_setting(&path, "GEMINI_MODEL", "gemini-2.0-flash-001").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("GROQ_API_KEY=abc"));
        assert!(content.contains("AI_PROVIDER=gemini"));
        assert!(!content.contains("AI_PROVIDER=groq"));
        assert!(content.contains("GEMINI_MODEL=gemini-2.0-flash-001"));
    }

    #[test]
    fn save_env_setting_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        save_env_setting(&path, "AI_PROVIDER", "groq").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "AI_PROVIDER=groq\n");
    }
}
