//! JSON report.
//!
//! ```text
//! {
//!   "generated_at": "2025-05-06T10:00:00.123+07:00",
//!   "total_articles": 2,
//!   "articles": [{"title": ..., "date": ..., "summary": ..., "sentiment": {...}}]
//! }
//! ```

use super::dated_output_path;
use crate::error::Result;
use crate::models::{NewsItem, Sentiment};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

#[derive(Serialize)]
struct Report<'a> {
    generated_at: DateTime<Local>,
    total_articles: usize,
    articles: Vec<ReportArticle<'a>>,
}

#[derive(Serialize)]
struct ReportArticle<'a> {
    title: &'a str,
    source: &'a str,
    date: &'a str,
    url: &'a str,
    summary: &'a str,
    full_text: &'a str,
    sentiment: &'a Sentiment,
    is_translated: bool,
}

/// Write the report as pretty-printed UTF-8 JSON.
#[instrument(level = "info", skip_all, fields(count = items.len(), %filename))]
pub async fn save_to_json(
    items: &[NewsItem],
    output_dir: &Path,
    filename: &str,
) -> Result<Option<PathBuf>> {
    if items.is_empty() {
        return Ok(None);
    }

    let report = Report {
        generated_at: Local::now(),
        total_articles: items.len(),
        articles: items
            .iter()
            .map(|item| ReportArticle {
                title: &item.title,
                source: &item.source,
                date: &item.formatted_date,
                url: &item.url,
                summary: &item.ai_summary,
                full_text: &item.full_text,
                sentiment: &item.sentiment,
                is_translated: item.is_translated,
            })
            .collect(),
    };
    let json = serde_json::to_string_pretty(&report)?;

    let path = dated_output_path(output_dir, filename).await?;
    info!(path = %path.display(), "Writing JSON");
    fs::write(&path, json).await?;
    info!(path = %path.display(), "Wrote JSON report");

    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[tokio::test]
    async fn report_shape_and_unicode() {
        let dir = tempfile::tempdir().unwrap();
        let items = vec![NewsItem {
            title: "Rupiah menguat 😊".into(),
            formatted_date: "2025-05-06 10:00:00".into(),
            ai_summary: "Ringkasan".into(),
            ..NewsItem::default()
        }];

        let path = save_to_json(&items, dir.path(), "rupiah_news.json").await.unwrap().unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("Rupiah menguat 😊"));

        let v: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(v["total_articles"], 1);
        let article = &v["articles"][0];
        assert_eq!(article["date"], "2025-05-06 10:00:00");
        assert_eq!(article["summary"], "Ringkasan");
        assert_eq!(article["sentiment"]["label"], "Unknown");
        assert_eq!(article["is_translated"], false);
        assert!(v["generated_at"].as_str().is_some());
    }

    #[tokio::test]
    async fn empty_list_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(save_to_json(&[], dir.path(), "x.json").await.unwrap().is_none());
    }
}
