//! Data models for search hits and enriched news items.
//!
//! - [`SearchHit`]: a raw result as returned by the search engine
//! - [`NewsItem`]: a hit that survived filtering, later enriched with the
//!   full text, AI output and sentiment
//! - [`Sentiment`]: polarity label, score and display emoji
//! - [`CombinedDraft`]: the summary + tweet pair returned by one LLM call

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Title given to items created from a bare URL until a real one is found.
pub const URL_PLACEHOLDER_TITLE: &str = "URL Processing...";

/// A raw search result.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SearchHit {
    /// Publication date as reported by the engine (RFC 3339 or RFC 2822).
    pub date: String,
    pub title: String,
    /// Short excerpt shown by the engine.
    pub body: String,
    pub url: String,
    pub image: Option<String>,
    pub source: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
    #[default]
    Unknown,
}

impl SentimentLabel {
    pub fn emoji(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "😊",
            SentimentLabel::Negative => "😟",
            SentimentLabel::Neutral => "😐",
            SentimentLabel::Unknown => "❓",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SentimentLabel::Positive => "Positive",
            SentimentLabel::Negative => "Negative",
            SentimentLabel::Neutral => "Neutral",
            SentimentLabel::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Sentiment {
    pub label: SentimentLabel,
    pub score: f64,
    pub emoji: String,
}

impl Sentiment {
    pub fn new(label: SentimentLabel, score: f64) -> Self {
        Self {
            label,
            score,
            emoji: label.emoji().to_string(),
        }
    }

    pub fn unknown() -> Self {
        Self::new(SentimentLabel::Unknown, 0.0)
    }
}

impl Default for Sentiment {
    fn default() -> Self {
        Self::unknown()
    }
}

/// A news item moving through the enrichment pipeline.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NewsItem {
    pub title: String,
    pub source: String,
    pub url: String,
    pub body: String,
    /// `%Y-%m-%d %H:%M:%S` rendering of the publication date.
    pub formatted_date: String,
    #[serde(skip)]
    pub published_at: Option<DateTime<FixedOffset>>,
    pub full_text: String,
    pub is_translated: bool,
    pub ai_summary: String,
    pub ai_tweet: String,
    pub sentiment: Sentiment,
}

impl NewsItem {
    /// Build an item for a URL passed directly on the command line.
    pub fn from_url(url: &str, formatted_date: String) -> Self {
        Self {
            title: URL_PLACEHOLDER_TITLE.to_string(),
            source: "Direct URL".to_string(),
            url: url.to_string(),
            formatted_date,
            ..Self::default()
        }
    }

    pub fn has_placeholder_title(&self) -> bool {
        self.title == URL_PLACEHOLDER_TITLE
    }
}

impl From<SearchHit> for NewsItem {
    fn from(hit: SearchHit) -> Self {
        Self {
            title: hit.title,
            source: hit.source,
            url: hit.url,
            body: hit.body,
            ..Self::default()
        }
    }
}

/// Summary and tweet produced by a single combined LLM call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct CombinedDraft {
    #[serde(default)]
    pub tweet: String,
    #[serde(default)]
    pub summary: String,
}
