//! DuckDuckGo news search.
//!
//! Two requests per query: the HTML landing page hands out a `vqd` token,
//! then `news.js` returns JSON pages of results that are walked with the
//! `s` offset until enough hits are collected.

use super::NewsSearch;
use crate::error::{NewsError, Result};
use crate::models::SearchHit;
use chrono::DateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

pub const DEFAULT_BASE_URL: &str = "https://duckduckgo.com";

/// Pages fetched at most for one query.
const MAX_PAGES: usize = 5;

static VQD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"vqd[=:]\s*["']?([0-9-]+)"#).expect("valid regex"));
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));

#[derive(Debug, Deserialize)]
struct NewsPage {
    #[serde(default)]
    results: Vec<NewsResult>,
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewsResult {
    date: Option<i64>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    excerpt: String,
    #[serde(default)]
    url: String,
    image: Option<String>,
    #[serde(default)]
    source: String,
}

impl From<NewsResult> for SearchHit {
    fn from(r: NewsResult) -> Self {
        let date = r
            .date
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_default();
        SearchHit {
            date,
            title: normalize(&r.title),
            body: normalize(&r.excerpt),
            url: r.url,
            image: r.image.filter(|i| !i.is_empty()),
            source: r.source,
        }
    }
}

/// Strip markup DuckDuckGo leaves in titles and excerpts.
fn normalize(raw: &str) -> String {
    TAG_RE
        .replace_all(raw, "")
        .replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .trim()
        .to_string()
}

#[derive(Debug, Clone)]
pub struct DuckDuckGo {
    client: Client,
    base_url: String,
}

impl DuckDuckGo {
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn vqd(&self, query: &str) -> Result<String> {
        let html = self
            .client
            .get(format!("{}/", self.base_url))
            .query(&[("q", query)])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        VQD_RE
            .captures(&html)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| NewsError::Search(format!("no vqd token for `{query}`")))
    }
}

impl NewsSearch for DuckDuckGo {
    fn name(&self) -> &'static str {
        "duckduckgo"
    }

    #[instrument(level = "info", skip(self), fields(engine = "duckduckgo"))]
    async fn search(&self, query: &str, region: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        let vqd = self.vqd(query).await?;
        let mut hits: Vec<SearchHit> = Vec::new();

        for page in 0..MAX_PAGES {
            let offset = hits.len().to_string();
            let body: NewsPage = self
                .client
                .get(format!("{}/news.js", self.base_url))
                .query(&[
                    ("l", region),
                    ("o", "json"),
                    ("noamp", "1"),
                    ("q", query),
                    ("vqd", vqd.as_str()),
                    ("p", "-2"),
                    ("df", "w"),
                    ("s", offset.as_str()),
                ])
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;

            let count = body.results.len();
            debug!(page, count, "Fetched news page");
            hits.extend(body.results.into_iter().map(SearchHit::from));

            if count == 0 || body.next.is_none() || hits.len() >= max_results {
                break;
            }
        }

        hits.truncate(max_results);
        Ok(hits)
    }
}
