//! Summaries, tweet drafts and headlines from the configured LLM provider.
//!
//! Every operation is best-effort: a missing API key, input that is too
//! short, or a failed request yields empty output and a log line, never an
//! error. Callers treat an empty string as "no AI output".

use crate::api::{AskAsync, ChatRequest, GeminiClient, GroqClient, RetryAsk};
use crate::config::{AiProvider, Settings, TextLimits};
use crate::models::CombinedDraft;
use crate::prompts::{PromptLoader, render};
use crate::utils::{ellipsize, looks_truncated, truncate_chars, truncate_for_log};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const LLM_RETRIES: usize = 2;
const LLM_BASE_DELAY: Duration = Duration::from_secs(1);
const COMBINED_FALLBACK_CHARS: usize = 750;
const TITLE_SAMPLE_CHARS: usize = 500;
const TITLE_MAX_TOKENS: u32 = 20;

#[derive(Debug)]
enum Backend {
    Groq(RetryAsk<GroqClient>),
    Gemini(RetryAsk<GeminiClient>),
}

impl Backend {
    async fn ask(&self, request: &ChatRequest) -> crate::error::Result<String> {
        match self {
            Backend::Groq(c) => c.ask(request).await,
            Backend::Gemini(c) => c.ask(request).await,
        }
    }
}

/// Per-provider sampling settings for one operation.
struct Tuning {
    max_input: usize,
    temperature: f32,
    max_tokens: u32,
}

/// LLM operations bound to one provider and its prompts.
#[derive(Debug)]
pub struct AiClient {
    provider: AiProvider,
    backend: Option<Backend>,
    prompts: PromptLoader,
}

impl AiClient {
    /// Bind to `provider_override`, or the settings' active provider.
    ///
    /// Without an API key for that provider every call returns empty output.
    pub fn new(
        settings: &Settings,
        prompts: PromptLoader,
        http: Client,
        provider_override: Option<AiProvider>,
    ) -> Self {
        let provider = provider_override.unwrap_or(settings.provider);
        let backend = if !settings.has_key(provider) {
            debug!(%provider, "No API key configured; AI features disabled");
            None
        } else {
            Some(match provider {
                AiProvider::Groq => Backend::Groq(RetryAsk::new(
                    GroqClient::new(
                        http,
                        &settings.groq_api_key,
                        &settings.groq_model,
                        &settings.groq_base_url,
                    ),
                    LLM_RETRIES,
                    LLM_BASE_DELAY,
                )),
                AiProvider::Gemini => Backend::Gemini(RetryAsk::new(
                    GeminiClient::new(
                        http,
                        &settings.gemini_api_key,
                        &settings.gemini_model,
                        &settings.gemini_base_url,
                    ),
                    LLM_RETRIES,
                    LLM_BASE_DELAY,
                )),
            })
        };
        Self {
            provider,
            backend,
            prompts,
        }
    }

    pub fn provider(&self) -> AiProvider {
        self.provider
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    async fn complete(&self, op: &'static str, request: ChatRequest) -> Option<String> {
        let backend = self.backend.as_ref()?;
        debug!(op, provider = %self.provider, prompt_chars = request.system.len() + request.user.len(), "Sending prompt");
        match backend.ask(&request).await {
            Ok(text) => {
                debug!(op, reply = %truncate_for_log(&text, 120), "Received reply");
                Some(text)
            }
            Err(e) => {
                warn!(op, provider = %self.provider, error = %e, "AI request failed");
                None
            }
        }
    }

    fn summary_tuning(&self) -> Tuning {
        match self.provider {
            AiProvider::Groq => Tuning {
                max_input: TextLimits::GROQ_MAX_INPUT,
                temperature: 0.5,
                max_tokens: TextLimits::SUMMARY_MAX_TOKENS,
            },
            AiProvider::Gemini => Tuning {
                max_input: TextLimits::GEMINI_MAX_INPUT,
                temperature: 0.5,
                max_tokens: 2_048,
            },
        }
    }

    fn tweet_tuning(&self) -> Tuning {
        match self.provider {
            AiProvider::Groq => Tuning {
                max_input: TextLimits::COMBINED_MAX_INPUT,
                temperature: 0.6,
                max_tokens: TextLimits::TWEET_MAX_TOKENS,
            },
            AiProvider::Gemini => Tuning {
                max_input: TextLimits::GEMINI_TWEET_MAX_INPUT,
                temperature: 0.7,
                max_tokens: 2_048,
            },
        }
    }

    fn combined_tuning(&self) -> Tuning {
        Tuning {
            max_input: TextLimits::COMBINED_MAX_INPUT,
            temperature: 0.6,
            max_tokens: match self.provider {
                AiProvider::Groq => TextLimits::COMBINED_MAX_TOKENS,
                AiProvider::Gemini => 1_024,
            },
        }
    }

    /// Summarize `text` in at most `max_sentences` sentences, or as a
    /// thread-style summary when `for_twitter` is set.
    #[instrument(level = "info", skip(self, text), fields(provider = %self.provider, chars = text.len()))]
    pub async fn summarize(&self, text: &str, max_sentences: usize, for_twitter: bool) -> String {
        if text.chars().count() < TextLimits::MIN_ARTICLE_LENGTH {
            return String::new();
        }
        let tuning = self.summary_tuning();
        let input = truncate_chars(text, tuning.max_input);

        let (system, user) = if for_twitter {
            (
                self.prompts.get_or(&["summary", "twitter", "system"], "You are a social media expert."),
                self.prompts.get_or(&["summary", "twitter", "user"], "Summarize this:\n\n{text}"),
            )
        } else {
            let system = self.prompts.get_or(
                &["summary", "standard", "system"],
                "Summarize in {max_sentences} sentences.",
            );
            let max_sentences = max_sentences.to_string();
            (
                render(&system, &[("max_sentences", max_sentences.as_str())]),
                self.prompts.get_or(&["summary", "standard", "user"], "Summarize:\n\n{text}"),
            )
        };

        let request = ChatRequest {
            system,
            user: render(&user, &[("text", input)]),
            temperature: tuning.temperature,
            max_tokens: tuning.max_tokens,
        };
        match self.complete("summarize", request).await {
            Some(summary) if for_twitter => ellipsize(&summary, TextLimits::TWEET_MAX_LENGTH),
            Some(summary) => summary,
            None => String::new(),
        }
    }

    /// Draft a single post about an article.
    #[instrument(level = "info", skip(self, title, text), fields(provider = %self.provider))]
    pub async fn generate_tweet(&self, title: &str, text: &str, topic: &str) -> String {
        let tuning = self.tweet_tuning();
        let system = self.prompts.get_or(&["tweet_generation", "system"], "You are a twitter expert.");
        let user = self
            .prompts
            .get_or(&["tweet_generation", "user"], "Title: {title}\nText: {text}");
        let request = ChatRequest {
            system,
            user: render(
                &user,
                &[
                    ("title", title),
                    ("text", truncate_chars(text, tuning.max_input)),
                    ("topic", topic),
                ],
            ),
            temperature: tuning.temperature,
            max_tokens: tuning.max_tokens,
        };
        self.complete("generate_tweet", request)
            .await
            .map(|raw| clean_tweet(raw.trim().trim_matches(|c| c == '"' || c == '\'')))
            .unwrap_or_default()
    }

    /// One call that returns both a summary and a tweet draft.
    #[instrument(level = "info", skip(self, title, text), fields(provider = %self.provider))]
    pub async fn generate_combined(&self, title: &str, text: &str, topic: &str) -> CombinedDraft {
        let tuning = self.combined_tuning();
        let system = self.prompts.get_or(
            &["combined_generation", "system"],
            "Output JSON with 'tweet' and 'summary' keys.",
        );
        let user = self
            .prompts
            .get_or(&["combined_generation", "user"], "Title: {title}\nText: {text}");
        let request = ChatRequest {
            system,
            user: render(
                &user,
                &[
                    ("title", title),
                    ("text", truncate_chars(text, tuning.max_input)),
                    ("topic", topic),
                ],
            ),
            temperature: tuning.temperature,
            max_tokens: tuning.max_tokens,
        };
        match self.complete("generate_combined", request).await {
            Some(raw) => {
                let draft = parse_combined_json(&raw);
                info!(tweet_chars = draft.tweet.chars().count(), has_summary = !draft.summary.is_empty(), "Combined draft ready");
                draft
            }
            None => CombinedDraft::default(),
        }
    }

    /// Headline for an article that arrived without one.
    #[instrument(level = "info", skip_all, fields(provider = %self.provider))]
    pub async fn generate_title(&self, text: &str) -> String {
        let system = self
            .prompts
            .get_or(&["title_generation", "system"], "You write short news headlines.");
        let user = self
            .prompts
            .get_or(&["title_generation", "user"], "Write a headline for:\n\n{text}");
        let request = ChatRequest {
            system,
            user: render(&user, &[("text", truncate_chars(text, TITLE_SAMPLE_CHARS))]),
            temperature: 0.3,
            max_tokens: TITLE_MAX_TOKENS,
        };
        self.complete("generate_title", request)
            .await
            .map(|t| t.trim().trim_matches('"').trim().to_string())
            .unwrap_or_default()
    }
}

fn clean_tweet(raw: &str) -> String {
    let cleaned = raw.replace("**", "").replace("__", "");
    ellipsize(cleaned.trim(), TextLimits::TWEET_MAX_LENGTH)
}

/// Extract the `{"tweet", "summary"}` object from a model reply.
///
/// Markdown code fences are removed first. When the reply is not valid
/// JSON, its first 750 characters become the tweet and the summary is empty.
pub fn parse_combined_json(raw: &str) -> CombinedDraft {
    let cleaned = if let Some((_, rest)) = raw.split_once("```json") {
        rest.split("```").next().unwrap_or(rest)
    } else if let Some((_, rest)) = raw.split_once("```") {
        rest.split("```").next().unwrap_or(rest)
    } else {
        raw
    };

    match serde_json::from_str::<CombinedDraft>(cleaned.trim()) {
        Ok(draft) => CombinedDraft {
            tweet: clean_tweet(&draft.tweet),
            summary: draft.summary.trim().to_string(),
        },
        Err(e) => {
            if looks_truncated(&e) {
                warn!(error = %e, "Combined reply was cut off; raise the token limit");
            } else {
                debug!(error = %e, "Combined reply was not JSON; using raw text");
            }
            CombinedDraft {
                tweet: truncate_chars(raw, COMBINED_FALLBACK_CHARS).to_string(),
                summary: String::new(),
            }
        }
    }
}
