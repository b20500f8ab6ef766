//! CSV report.

use super::dated_output_path;
use crate::error::Result;
use crate::models::NewsItem;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

#[derive(Serialize)]
struct CsvRow<'a> {
    title: &'a str,
    source: &'a str,
    formatted_date: &'a str,
    url: &'a str,
    body: &'a str,
    full_text: &'a str,
    ai_summary: &'a str,
    sentiment: String,
    is_translated: bool,
}

impl<'a> From<&'a NewsItem> for CsvRow<'a> {
    fn from(item: &'a NewsItem) -> Self {
        Self {
            title: &item.title,
            source: &item.source,
            formatted_date: &item.formatted_date,
            url: &item.url,
            body: &item.body,
            full_text: &item.full_text,
            ai_summary: &item.ai_summary,
            sentiment: format!("{} ({:.2})", item.sentiment.label, item.sentiment.score),
            is_translated: item.is_translated,
        }
    }
}

/// Write one row per article with a header row.
#[instrument(level = "info", skip_all, fields(count = items.len(), %filename))]
pub async fn save_to_csv(
    items: &[NewsItem],
    output_dir: &Path,
    filename: &str,
) -> Result<Option<PathBuf>> {
    if items.is_empty() {
        return Ok(None);
    }
    let path = dated_output_path(output_dir, filename).await?;

    let mut writer = ::csv::Writer::from_writer(Vec::new());
    for item in items {
        writer.serialize(CsvRow::from(item))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    tokio::fs::write(&path, bytes).await?;

    info!(path = %path.display(), "Wrote CSV report");
    Ok(Some(path))
}
