//! Article download with a layered fallback, and bounded parallel enrichment.
//!
//! # Fetch layers
//!
//! 1. [`FetchLayer::Native`]: plain GET with the crate's own user agent
//! 2. [`FetchLayer::Browser`]: GET with desktop-browser headers
//! 3. [`FetchLayer::Curl`]: shell out to `curl`, when it is installed
//!
//! A layer wins when extraction yields at least
//! [`TextLimits::MIN_EXTRACTED_LENGTH`] characters; otherwise the next layer
//! runs. When no layer wins, the last non-empty short extraction is still
//! used, and the last HTML seen is kept for metadata.
//!
//! # Enrichment
//!
//! [`Enricher::enrich_news_content`] runs [`Enricher::fetch_single_article`]
//! for up to [`MAX_THREADS`] items at a time and collects results in
//! completion order.

use crate::cache::CacheManager;
use crate::config::{MAX_THREADS, TIMEOUT, TextLimits};
use crate::error::{NewsError, Result};
use crate::extract::{Extracted, extract_article, title_from_html};
use crate::models::{NewsItem, Sentiment};
use crate::providers::AiClient;
use crate::text::{analyze_sentiment, validate_url};
use crate::translate::Translator;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, REFERER};
use std::error::Error as StdError;
use std::fmt;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
const BROWSER_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8";
const BROWSER_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9,id;q=0.8";
const BROWSER_REFERER: &str = "https://www.google.com/";

/// `curl` output at or below this many bytes is treated as a block page.
const MIN_CURL_BYTES: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchLayer {
    Native,
    Browser,
    Curl,
}

impl FetchLayer {
    pub const ALL: [FetchLayer; 3] = [FetchLayer::Native, FetchLayer::Browser, FetchLayer::Curl];
}

impl fmt::Display for FetchLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FetchLayer::Native => "native",
            FetchLayer::Browser => "browser",
            FetchLayer::Curl => "curl",
        })
    }
}

/// Result of running the fallback chain for one URL.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    /// Extracted article, present when some layer produced enough text.
    pub article: Option<Extracted>,
    /// Last non-empty extraction that fell short of
    /// [`TextLimits::MIN_EXTRACTED_LENGTH`].
    pub partial: Option<Extracted>,
    pub partial_layer: Option<FetchLayer>,
    /// Last HTML downloaded by any layer.
    pub html: Option<String>,
    pub layer: Option<FetchLayer>,
}

impl FetchOutcome {
    /// The winning extraction, or else the best short one, with its layer.
    pub fn best(self) -> (Option<Extracted>, Option<FetchLayer>, Option<String>) {
        match self.article {
            Some(article) => (Some(article), self.layer, self.html),
            None => (self.partial, self.partial_layer, self.html),
        }
    }
}

/// Downloads pages through the layered fallback chain.
#[derive(Debug, Clone)]
pub struct ArticleFetcher {
    native: Client,
    browser: Client,
    curl_enabled: bool,
}

impl ArticleFetcher {
    pub fn new() -> Result<Self> {
        let native = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(TIMEOUT)
            .build()?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(BROWSER_ACCEPT));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(BROWSER_ACCEPT_LANGUAGE));
        headers.insert(REFERER, HeaderValue::from_static(BROWSER_REFERER));
        let browser = Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(headers)
            .timeout(TIMEOUT)
            .build()?;

        Ok(Self {
            native,
            browser,
            curl_enabled: curl_on_path(),
        })
    }

    /// Enable or disable the `curl` layer regardless of what is installed.
    #[cfg(test)]
    pub fn with_curl(mut self, enabled: bool) -> Self {
        self.curl_enabled = enabled;
        self
    }

    /// Run the layers in order until one yields enough article text.
    #[instrument(level = "debug", skip(self))]
    pub async fn fetch(&self, url: &str) -> FetchOutcome {
        let mut outcome = FetchOutcome::default();
        for layer in FetchLayer::ALL {
            let html = match self.fetch_layer(layer, url).await {
                Ok(Some(html)) => html,
                Ok(None) => continue,
                Err(e) => {
                    if is_tls_error(&e) {
                        debug!(%url, %layer, error = %e, "TLS verification failed; trying next layer");
                    } else {
                        debug!(%url, %layer, error = %e, "Fetch layer failed");
                    }
                    continue;
                }
            };

            let extracted = extract_article(&html);
            let chars = extracted.text.chars().count();
            outcome.html = Some(html);
            if chars >= TextLimits::MIN_EXTRACTED_LENGTH {
                debug!(%url, %layer, chars, "Fetch layer succeeded");
                outcome.article = Some(extracted);
                outcome.layer = Some(layer);
                return outcome;
            }
            debug!(%url, %layer, chars, "Extracted text too short; trying next layer");
            if chars > 0 {
                outcome.partial = Some(extracted);
                outcome.partial_layer = Some(layer);
            }
        }
        outcome
    }

    /// `Ok(None)` means the layer was skipped.
    async fn fetch_layer(&self, layer: FetchLayer, url: &str) -> Result<Option<String>> {
        match layer {
            FetchLayer::Native => {
                let html = self.native.get(url).send().await?.error_for_status()?.text().await?;
                Ok(Some(html))
            }
            FetchLayer::Browser => Ok(Some(self.browser.get(url).send().await?.text().await?)),
            FetchLayer::Curl => {
                if !self.curl_enabled || !validate_url(url) {
                    return Ok(None);
                }
                fetch_with_curl(url).await.map(Some)
            }
        }
    }
}

async fn fetch_with_curl(url: &str) -> Result<String> {
    let output = Command::new("curl")
        .args(["-s", "-L", "-A", BROWSER_USER_AGENT, "--max-time"])
        .arg(TIMEOUT.as_secs().to_string())
        .arg(url)
        .kill_on_drop(true)
        .output()
        .await?;
    if !output.status.success() {
        return Err(NewsError::Extraction(format!("curl exited with {}", output.status)));
    }
    if output.stdout.len() <= MIN_CURL_BYTES {
        return Err(NewsError::Extraction(format!(
            "curl returned only {} bytes",
            output.stdout.len()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn curl_on_path() -> bool {
    std::env::var_os("PATH").is_some_and(|paths| {
        std::env::split_paths(&paths).any(|dir| dir.join("curl").is_file())
    })
}

fn is_tls_error(err: &NewsError) -> bool {
    let NewsError::Http(e) = err else {
        return false;
    };
    let mut source: Option<&dyn StdError> = Some(e);
    while let Some(s) = source {
        let msg = s.to_string().to_lowercase();
        if msg.contains("certificate") || msg.contains("tls") || msg.contains("ssl") {
            return true;
        }
        source = s.source();
    }
    false
}

/// What to do with each article after it is downloaded.
#[derive(Debug, Clone, Default)]
pub struct EnrichOptions {
    pub translate: bool,
    pub target_lang: String,
    pub summarize: bool,
    pub sentiment: bool,
    /// Search topic, passed to the tweet prompts.
    pub topic: String,
    /// Draw a progress bar on stderr.
    pub progress: bool,
}

impl EnrichOptions {
    fn features(&self) -> Vec<&'static str> {
        [
            (self.translate, "translate"),
            (self.summarize, "AI summary"),
            (self.sentiment, "sentiment"),
        ]
        .into_iter()
        .filter_map(|(on, name)| on.then_some(name))
        .collect()
    }
}

/// Fetches articles and runs the optional translation, AI and sentiment steps.
#[derive(Debug)]
pub struct Enricher<'a> {
    fetcher: &'a ArticleFetcher,
    cache: &'a CacheManager,
    translator: &'a Translator,
    ai: &'a AiClient,
    pub(crate) opts: EnrichOptions,
}

impl<'a> Enricher<'a> {
    pub fn new(
        fetcher: &'a ArticleFetcher,
        cache: &'a CacheManager,
        translator: &'a Translator,
        ai: &'a AiClient,
        opts: EnrichOptions,
    ) -> Self {
        Self {
            fetcher,
            cache,
            translator,
            ai,
            opts,
        }
    }

    /// Download, extract and enrich one item. Never fails: problems leave
    /// the corresponding fields empty.
    #[instrument(level = "info", skip_all, fields(url = %item.url))]
    pub async fn fetch_single_article(&self, mut item: NewsItem) -> NewsItem {
        item.full_text.clear();
        item.is_translated = false;
        item.ai_summary.clear();
        item.ai_tweet.clear();
        item.sentiment = Sentiment::unknown();

        if !(item.url.starts_with("http://") || item.url.starts_with("https://")) {
            debug!("Skipping non-HTTP URL");
            return item;
        }

        match self.cache.get::<String>(&item.url).await.filter(|t| !t.is_empty()) {
            Some(cached) => item.full_text = cached,
            None => self.download(&mut item).await,
        }

        if item.full_text.chars().count() <= TextLimits::MIN_ARTICLE_LENGTH {
            return item;
        }

        let mut text = item.full_text.clone();
        if self.opts.translate {
            self.translator
                .apply_translation(&mut item, &text, &self.opts.target_lang)
                .await;
            text = item.full_text.clone();
        }

        if self.opts.summarize {
            let title = if item.title.is_empty() {
                self.opts.topic.clone()
            } else {
                item.title.clone()
            };
            let draft = self.ai.generate_combined(&title, &text, &self.opts.topic).await;
            item.ai_summary = draft.summary;
            item.ai_tweet = draft.tweet;

            // a reply that parsed as plain text carries no summary
            if self.ai.is_available() && item.ai_summary.is_empty() {
                item.ai_summary = self.ai.summarize(&text, 3, false).await;
            }
            if self.ai.is_available() && item.ai_tweet.is_empty() {
                item.ai_tweet = self.ai.generate_tweet(&title, &text, &self.opts.topic).await;
            }

            if item.has_placeholder_title() {
                let generated = self.ai.generate_title(&text).await;
                if !generated.is_empty() {
                    item.title = generated;
                }
            }
        }

        if self.opts.sentiment {
            item.sentiment = analyze_sentiment(&text);
        }
        item
    }

    async fn download(&self, item: &mut NewsItem) {
        let (article, layer, html) = self.fetcher.fetch(&item.url).await.best();

        if let Some(article) = article {
            if let Some(title) = article.title {
                item.title = title;
            }
            if let Some(date) = article.date {
                item.formatted_date = date;
            }
            if let Some(sitename) = article.sitename {
                item.source = sitename;
            }
            item.full_text = article.text;
        }

        if item.has_placeholder_title() {
            if let Some(title) = html.as_deref().and_then(title_from_html) {
                item.title = title;
            }
        }

        if item.full_text.is_empty() {
            warn!(url = %item.url, "No article text could be extracted");
        } else {
            info!(url = %item.url, layer = ?layer, chars = item.full_text.chars().count(), "Fetched article");
            self.cache.set(&item.url, &item.full_text).await;
        }
    }

    /// Enrich every item with at most [`MAX_THREADS`] in flight.
    ///
    /// Results come back in completion order, not input order.
    #[instrument(level = "info", skip_all, fields(count = items.len()))]
    pub async fn enrich_news_content(&self, items: Vec<NewsItem>) -> Vec<NewsItem> {
        if items.is_empty() {
            return Vec::new();
        }

        let features = self.opts.features();
        info!(
            count = items.len(),
            features = %features.join(", "),
            workers = MAX_THREADS,
            "Fetching articles"
        );

        let pb = progress_bar(self.opts.progress, items.len());
        let enriched: Vec<NewsItem> = stream::iter(items)
            .map(|item| {
                let pb = pb.clone();
                async move {
                    let item = self.fetch_single_article(item).await;
                    pb.inc(1);
                    item
                }
            })
            .buffer_unordered(MAX_THREADS)
            .collect()
            .await;
        pb.finish_and_clear();

        let with_text = enriched.iter().filter(|i| !i.full_text.is_empty()).count();
        info!(total = enriched.len(), with_text, "Finished enrichment");
        enriched
    }
}

fn progress_bar(visible: bool, len: usize) -> ProgressBar {
    let pb = if visible {
        ProgressBar::new(len as u64)
    } else {
        ProgressBar::hidden()
    };
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg} [{bar:40}] {pos}/{len}") {
        pb.set_style(style);
    }
    pb.set_message("Processing articles...");
    pb
}
