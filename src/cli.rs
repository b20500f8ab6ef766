//! Command-line interface definitions for xnews.
//!
//! Most options can also be set through environment variables (or a `.env`
//! file, which is loaded before parsing).

use crate::config::{AiProvider, TextLimits};
use crate::fetcher::EnrichOptions;
use crate::pipeline::{Formats, SearchRequest};
use crate::search::SearchEngine;
use clap::Parser;
use std::time::Duration;

const INDONESIA_REGION: &str = "id-id";
const URL_MODE_TOPIC: &str = "news";

/// Search news on a topic, extract full articles, and optionally translate,
/// summarize and score them.
///
/// # Examples
///
/// ```sh
/// # Interactive session
/// xnews
///
/// # Indonesian news with AI summaries, saved as Markdown
/// xnews "bank indonesia" --indo -s -m
///
/// # Single article
/// xnews -u https://example.com/story
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Topic to search for; omit it (and --url) for interactive mode
    pub topic: Option<String>,

    /// Translate articles to the target language
    #[arg(short, long)]
    pub translate: bool,

    /// Generate AI summaries and tweet drafts
    #[arg(short, long)]
    pub summary: bool,

    /// Score article sentiment
    #[arg(long)]
    pub sentiment: bool,

    /// Save a JSON report
    #[arg(short, long)]
    pub json: bool,

    /// Save a CSV report
    #[arg(short, long)]
    pub csv: bool,

    /// Save a Markdown report
    #[arg(short, long)]
    pub markdown: bool,

    /// Maximum number of articles to process
    #[arg(short, long, env = "XNEWS_LIMIT", default_value_t = 10)]
    pub limit: usize,

    /// Keep polling the topic for new articles
    #[arg(short, long)]
    pub watch: bool,

    /// Minutes between watch-mode polls
    #[arg(short, long, env = "XNEWS_INTERVAL", default_value_t = 30)]
    pub interval: u64,

    /// Delete every cached entry and exit
    #[arg(long)]
    pub clear_cache: bool,

    /// Process a single article URL
    #[arg(short, long)]
    pub url: Option<String>,

    /// Search region, e.g. `us-en` or `wt-wt` for worldwide
    #[arg(long, env = "XNEWS_REGION", default_value = "wt-wt")]
    pub region: String,

    /// Shortcut for `--region id-id`
    #[arg(long)]
    pub indo: bool,

    /// Only keep articles published within this many days
    #[arg(long, env = "XNEWS_DAYS", default_value_t = 3)]
    pub days: i64,

    /// AI provider for this run (`groq` or `gemini`)
    #[arg(long)]
    pub provider: Option<AiProvider>,

    /// Translation target language code
    #[arg(long, env = "XNEWS_TARGET_LANG", default_value = "id")]
    pub target_lang: String,

    /// Search backend
    #[arg(long, env = "XNEWS_ENGINE", value_enum, default_value_t = SearchEngine::DuckDuckGo)]
    pub engine: SearchEngine,

    /// Debug-level logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn effective_region(&self) -> &str {
        if self.indo { INDONESIA_REGION } else { &self.region }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval.max(1) * 60)
    }

    pub fn formats(&self) -> Formats {
        Formats {
            csv: self.csv,
            json: self.json,
            markdown: self.markdown,
        }
    }

    /// Topic passed to the tweet prompts in URL mode.
    pub fn url_topic(&self) -> &str {
        self.topic.as_deref().unwrap_or(URL_MODE_TOPIC)
    }

    pub fn enrich_options(&self, topic: &str) -> EnrichOptions {
        EnrichOptions {
            translate: self.translate,
            target_lang: self.target_lang.clone(),
            summarize: self.summary,
            sentiment: self.sentiment,
            topic: topic.to_string(),
            progress: true,
        }
    }

    /// Search parameters for `topic`. The limit is floored at one and a
    /// non-positive day window falls back to the default.
    pub fn search_request(&self, topic: &str) -> SearchRequest {
        SearchRequest {
            topic: topic.to_string(),
            region: self.effective_region().to_string(),
            limit: self.limit.max(1),
            days: if self.days > 0 { self.days } else { TextLimits::DEFAULT_FILTER_DAYS },
            engine: self.engine,
            provider: self.provider,
            enrich: self.enrich_options(topic),
            formats: self.formats(),
        }
    }
}
