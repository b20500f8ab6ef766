//! Terminal rendering of results.
//!
//! Functions here build strings; the callers decide where to print them.

use crate::config::TextLimits;
use crate::models::NewsItem;
use crate::utils::{ellipsize, truncate_chars};
use std::fmt::Write;

pub const BANNER: &str = "\
╔══════════════════════════════════════════════════════════════╗
║     🚀 XNEWS - Smart News Fetcher                            ║
║     ✨ AI Summarization • Sentiment Analysis • Reports       ║
╚══════════════════════════════════════════════════════════════╝";

const TITLE_WIDTH: usize = 50;
const SOURCE_WIDTH: usize = 15;
const DATE_WIDTH: usize = 10;

fn pad(s: &str, width: usize) -> String {
    let len = s.chars().count();
    format!("{s}{}", " ".repeat(width.saturating_sub(len)))
}

/// Results table for the first [`TextLimits::TABLE_MAX_ITEMS`] items.
pub fn results_table(items: &[NewsItem]) -> String {
    if items.is_empty() {
        return String::new();
    }
    let mut out = String::from("📊 News Search Results\n");
    let _ = writeln!(
        out,
        "{} {} {} {} Sentiment",
        pad("No", 4),
        pad("Title", TITLE_WIDTH),
        pad("Source", SOURCE_WIDTH),
        pad("Date", DATE_WIDTH),
    );
    let _ = writeln!(out, "{}", "─".repeat(4 + TITLE_WIDTH + SOURCE_WIDTH + DATE_WIDTH + 16));

    for (i, item) in items.iter().take(TextLimits::TABLE_MAX_ITEMS).enumerate() {
        let _ = writeln!(
            out,
            "{} {} {} {} {} {}",
            pad(&(i + 1).to_string(), 4),
            pad(&ellipsize(&item.title, TITLE_WIDTH), TITLE_WIDTH),
            pad(truncate_chars(&item.source, 12), SOURCE_WIDTH),
            pad(truncate_chars(&item.formatted_date, DATE_WIDTH), DATE_WIDTH),
            item.sentiment.emoji,
            item.sentiment.label,
        );
    }

    if items.len() > TextLimits::TABLE_MAX_ITEMS {
        let _ = writeln!(
            out,
            "... and {} more (see the exported files)",
            items.len() - TextLimits::TABLE_MAX_ITEMS
        );
    }
    out
}

/// Numbered listing of the first five items with their summaries.
pub fn top_stories(items: &[NewsItem]) -> String {
    let mut out = String::new();
    for (i, item) in items.iter().take(5).enumerate() {
        let _ = writeln!(out, "\n{}. {}", i + 1, item.title);
        let _ = writeln!(out, "   {} | {}", item.source, item.formatted_date);
        if !item.ai_summary.is_empty() {
            let _ = writeln!(out, "   → {}", item.ai_summary);
        }
        if !item.ai_tweet.is_empty() {
            let _ = writeln!(out, "   🐦 {}...", truncate_chars(&item.ai_tweet, 100));
        }
    }
    out
}

/// Full report for a single URL, with a share link when a tweet exists.
pub fn url_report(item: &NewsItem, share_url: Option<&str>) -> String {
    let mut out = format!("\n{}\n", item.title);
    let _ = writeln!(out, "{} | {}", item.source, item.formatted_date);
    if item.sentiment.label != crate::models::SentimentLabel::Unknown {
        let _ = writeln!(
            out,
            "Sentiment: {} {} ({:.2})",
            item.sentiment.emoji, item.sentiment.label, item.sentiment.score
        );
    }
    if !item.ai_summary.is_empty() {
        let _ = writeln!(out, "→ {}", item.ai_summary);
    }
    if !item.ai_tweet.is_empty() {
        let _ = writeln!(out, "\n🐦 Tweet Draft:\n{}", item.ai_tweet);
    }
    if let Some(url) = share_url {
        let _ = writeln!(out, "\nShare: {url}");
    }
    if item.full_text.is_empty() {
        let _ = writeln!(out, "\n(no article text could be extracted)");
    }
    out
}

/// One entry of watch-mode output.
pub fn watch_entry(item: &NewsItem) -> String {
    let mut out = format!("\n• {}\n  {} | {}", item.title, item.source, item.formatted_date);
    if !item.ai_summary.is_empty() {
        out.push_str(&format!("\n  → {}", item.ai_summary));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(title: &str) -> NewsItem {
        NewsItem {
            title: title.into(),
            source: "A very long source name".into(),
            formatted_date: "2025-05-06 10:00:00".into(),
            ..NewsItem::default()
        }
    }

    #[test]
    fn table_caps_rows_and_truncates_cells() {
        let items: Vec<NewsItem> = (0..12).map(|i| item(&format!("Story {i} {}", "x".repeat(60)))).collect();
        let table = results_table(&items);
        assert!(table.contains("... and 2 more"));
        assert!(!table.contains("Story 10"));
        assert!(table.contains("A very long "));
        assert!(!table.contains("A very long source"));
        assert!(table.contains("2025-05-06 "));
        assert!(!table.contains("10:00:00"));
    }

    #[test]
    fn empty_table_is_blank() {
        assert!(results_table(&[]).is_empty());
    }

    #[test]
    fn top_stories_lists_five() {
        let items: Vec<NewsItem> = (0..8).map(|i| item(&format!("Story {i}"))).collect();
        let out = top_stories(&items);
        assert!(out.contains("5. Story 4"));
        assert!(!out.contains("Story 5"));
    }

    #[test]
    fn url_report_includes_share_link() {
        let mut it = item("Rates held");
        it.ai_tweet = "tweet".into();
        it.full_text = "text".into();
        let out = url_report(&it, Some("https://twitter.com/intent/tweet?text=tweet"));
        assert!(out.contains("🐦 Tweet Draft:\ntweet"));
        assert!(out.contains("Share: https://twitter.com"));
    }
}
