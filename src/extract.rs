//! Main-text and metadata extraction from article HTML.
//!
//! A cascade of CSS selectors is tried from most to least specific; the
//! first one that yields paragraphs wins. Paragraphs nested inside page
//! chrome (`nav`, `header`, `footer`, `aside`, `form`, `figure`) are
//! skipped, as are very short fragments such as bylines or share buttons.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument};

const CONTENT_SELECTORS: &[&str] = &[
    "article p",
    "[itemprop='articleBody'] p",
    "main p",
    "div[class*='article'] p",
    "div[class*='content'] p",
    "p",
];

const BOILERPLATE_TAGS: &[&str] = &[
    "nav", "header", "footer", "aside", "form", "figure", "script", "style", "noscript",
];

/// Paragraphs shorter than this many characters are treated as noise.
const MIN_PARAGRAPH_CHARS: usize = 25;

static CONTENT: Lazy<Vec<Selector>> = Lazy::new(|| {
    CONTENT_SELECTORS
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .collect()
});

static TITLE_META: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("meta[property='og:title'], meta[name='twitter:title']")
        .expect("valid selector")
});
static TITLE_TAG: Lazy<Selector> = Lazy::new(|| Selector::parse("title").expect("valid selector"));
static H1: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").expect("valid selector"));
static DATE_META: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(
        "meta[property='article:published_time'], meta[itemprop='datePublished'], \
         meta[name='pubdate'], meta[name='date']",
    )
    .expect("valid selector")
});
static TIME_TAG: Lazy<Selector> =
    Lazy::new(|| Selector::parse("time[datetime]").expect("valid selector"));
static SITENAME_META: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("meta[property='og:site_name'], meta[name='application-name']")
        .expect("valid selector")
});

static TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<title[^>]*>([^<]+)</title>").expect("valid regex"));

/// Text and metadata pulled out of one HTML document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extracted {
    pub text: String,
    pub title: Option<String>,
    pub date: Option<String>,
    pub sitename: Option<String>,
}

/// Extract the main article text and metadata from an HTML page.
#[instrument(level = "debug", skip_all, fields(html_length = html.len()))]
pub fn extract_article(html: &str) -> Extracted {
    let document = Html::parse_document(html);
    let text = extract_text(&document);
    debug!(chars = text.chars().count(), "Extracted article text");
    Extracted {
        text,
        title: meta_content(&document, &TITLE_META)
            .or_else(|| first_text(&document, &TITLE_TAG))
            .or_else(|| first_text(&document, &H1)),
        date: meta_content(&document, &DATE_META).or_else(|| {
            document
                .select(&TIME_TAG)
                .find_map(|el| el.value().attr("datetime"))
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        }),
        sitename: meta_content(&document, &SITENAME_META),
    }
}

/// Pull the `<title>` text out of raw HTML without a full parse.
pub fn title_from_html(html: &str) -> Option<String> {
    TITLE_RE
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|t| !t.is_empty())
}

fn extract_text(document: &Html) -> String {
    for selector in CONTENT.iter() {
        let paragraphs: Vec<String> = document
            .select(selector)
            .filter(|el| !inside_boilerplate(el))
            .map(|el| normalize_whitespace(&el.text().collect::<String>()))
            .filter(|p| p.chars().count() >= MIN_PARAGRAPH_CHARS)
            .collect();
        if !paragraphs.is_empty() {
            return paragraphs.join("\n");
        }
    }
    String::new()
}

fn inside_boilerplate(el: &ElementRef<'_>) -> bool {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| BOILERPLATE_TAGS.contains(&a.value().name()))
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn meta_content(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .filter_map(|el| el.value().attr("content"))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .map(|el| normalize_whitespace(&el.text().collect::<String>()))
        .find(|s| !s.is_empty())
}
