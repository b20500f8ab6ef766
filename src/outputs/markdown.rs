//! Markdown report with a sentiment overview and copy-ready tweet drafts.

use super::dated_output_path;
use crate::config::TextLimits;
use crate::error::Result;
use crate::models::{NewsItem, SentimentLabel};
use crate::text::generate_tweet;
use crate::utils::truncate_chars;
use chrono::Local;
use std::fmt::{self, Write};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

/// Render the full report for `topic`.
pub fn news_to_markdown(items: &[NewsItem], topic: &str) -> std::result::Result<String, fmt::Error> {
    let mut md = String::new();
    let heading = if topic.is_empty() { "Latest News" } else { topic };

    writeln!(md, "# 📰 News Report: {heading}\n")?;
    writeln!(md, "**Generated:** {}", Local::now().format("%Y-%m-%d %H:%M:%S"))?;
    writeln!(md, "**Total Articles:** {}\n", items.len())?;

    let count = |label: SentimentLabel| items.iter().filter(|i| i.sentiment.label == label).count();
    writeln!(
        md,
        "**Sentiment Overview:** 😊 Positive: {} | 😟 Negative: {} | 😐 Neutral: {}\n",
        count(SentimentLabel::Positive),
        count(SentimentLabel::Negative),
        count(SentimentLabel::Neutral),
    )?;
    writeln!(md, "---\n")?;

    for (i, item) in items.iter().enumerate() {
        let title = if item.title.is_empty() { "No Title" } else { &item.title };
        let translated = if item.is_translated { " *(Translated)*" } else { "" };
        writeln!(md, "## {}. {title}{translated}\n", i + 1)?;
        writeln!(
            md,
            "**Source:** {} | **Date:** {} | **Sentiment:** {} {}\n",
            or_dash(&item.source),
            or_dash(&item.formatted_date),
            item.sentiment.emoji,
            item.sentiment.label,
        )?;

        if !item.ai_summary.is_empty() {
            writeln!(md, "### 🧠 AI Summary\n")?;
            writeln!(md, "> {}\n", item.ai_summary)?;
        }

        let tweet = if item.ai_tweet.is_empty() {
            let content = if item.full_text.is_empty() { &item.body } else { &item.full_text };
            generate_tweet(title, content, topic, &item.ai_summary)
        } else {
            item.ai_tweet.clone()
        };
        writeln!(md, "### 🐦 Tweet Draft\n")?;
        writeln!(md, "_{} characters_\n", tweet.chars().count())?;
        writeln!(md, "```text\n{tweet}\n```\n")?;

        if item.full_text.is_empty() {
            writeln!(md, "_No text content._\n")?;
        } else {
            let paragraphs = item
                .full_text
                .lines()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .collect::<Vec<_>>()
                .join("\n\n");
            let shown = truncate_chars(&paragraphs, TextLimits::MARKDOWN_TRUNCATE);
            writeln!(md, "{shown}\n")?;
            if shown.len() < paragraphs.len() {
                writeln!(md, "_... (text truncated)_\n")?;
            }
        }

        let link = if item.url.is_empty() { "#" } else { &item.url };
        writeln!(md, "🔗 [Read More]({link})\n")?;
        writeln!(md, "---\n")?;
    }
    Ok(md)
}

fn or_dash(s: &str) -> &str {
    if s.is_empty() { "-" } else { s }
}

#[instrument(level = "info", skip_all, fields(count = items.len(), %filename))]
pub async fn save_to_markdown(
    items: &[NewsItem],
    output_dir: &Path,
    filename: &str,
    topic: &str,
) -> Result<Option<PathBuf>> {
    if items.is_empty() {
        return Ok(None);
    }
    let md = news_to_markdown(items, topic).map_err(|e| std::io::Error::other(e.to_string()))?;
    let path = dated_output_path(output_dir, filename).await?;
    fs::write(&path, md).await?;
    info!(path = %path.display(), "Wrote Markdown report");
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Sentiment;

    fn item(title: &str, label: SentimentLabel) -> NewsItem {
        NewsItem {
            title: title.into(),
            source: "Example".into(),
            url: "https://e.com/a".into(),
            formatted_date: "2025-05-06 10:00:00".into(),
            full_text: "First paragraph.\n\n  \nSecond paragraph.".into(),
            sentiment: Sentiment::new(label, 0.3),
            ..NewsItem::default()
        }
    }

    #[test]
    fn renders_overview_and_sections() {
        let mut first = item("Rates held", SentimentLabel::Positive);
        first.ai_summary = "BI held rates.".into();
        first.ai_tweet = "AI tweet text".into();
        first.is_translated = true;
        let second = item("Rupiah slips", SentimentLabel::Negative);

        let md = news_to_markdown(&[first, second], "bank indonesia").unwrap();
        assert!(md.starts_with("# 📰 News Report: bank indonesia"));
        assert!(md.contains("😊 Positive: 1 | 😟 Negative: 1 | 😐 Neutral: 0"));
        assert!(md.contains("## 1. Rates held *(Translated)*"));
        assert!(md.contains("> BI held rates."));
        assert!(md.contains("```text\nAI tweet text\n```"));
        assert!(md.contains("First paragraph.\n\nSecond paragraph."));
        assert!(md.contains("🔗 [Read More](https://e.com/a)"));
        // the second item has no AI tweet and falls back to the template
        assert!(md.contains("#BreakingNews"));
    }

    #[test]
    fn long_text_is_truncated() {
        let mut long = item("Long", SentimentLabel::Neutral);
        long.full_text = "x".repeat(TextLimits::MARKDOWN_TRUNCATE + 10);
        let md = news_to_markdown(&[long], "").unwrap();
        assert!(md.contains("# 📰 News Report: Latest News"));
        assert!(md.contains("_... (text truncated)_"));
    }

    #[tokio::test]
    async fn writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_to_markdown(&[item("A", SentimentLabel::Neutral)], dir.path(), "a_news.md", "a")
            .await
            .unwrap()
            .unwrap();
        assert!(std::fs::read_to_string(path).unwrap().contains("## 1. A"));
    }
}
