//! Report writers for CSV, JSON and Markdown.
//!
//! # Submodules
//!
//! - [`csv`]: one row per article, for spreadsheets
//! - [`json`]: pretty-printed report with a small header
//! - [`markdown`]: readable report with tweet drafts
//!
//! # Output Structure
//!
//! Reports are grouped by the day they were written:
//! ```text
//! reports/
//! └── 2025-05-06/
//!     ├── rupiah_news.csv
//!     ├── rupiah_news.json
//!     └── rupiah_news.md
//! ```
//!
//! Every writer skips empty article lists and returns `Ok(None)`.

pub mod csv;
pub mod json;
pub mod markdown;

use crate::utils::sanitize_filename;
use chrono::Local;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Resolve `<output_dir>/<YYYY-MM-DD>/<filename>`, creating the dated
/// directory. The file name is reduced to a safe base name first.
pub async fn dated_output_path(output_dir: &Path, filename: &str) -> std::io::Result<PathBuf> {
    let dir = output_dir.join(Local::now().format("%Y-%m-%d").to_string());
    fs::create_dir_all(&dir).await?;
    Ok(dir.join(sanitize_filename(filename)))
}

/// X/Twitter intent URL that pre-fills a post with `text` and an optional
/// link on its own paragraph.
pub fn generate_tweet_url(text: &str, url: &str) -> String {
    let content = if url.is_empty() {
        text.to_string()
    } else {
        format!("{text}\n\n{url}")
    };
    format!(
        "https://twitter.com/intent/tweet?text={}",
        urlencoding::encode(&content)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tweet_url_encodes_everything() {
        assert_eq!(
            generate_tweet_url("Rates held #BI", "https://e.com/a?b=1"),
            "https://twitter.com/intent/tweet?text=Rates%20held%20%23BI%0A%0Ahttps%3A%2F%2Fe.com%2Fa%3Fb%3D1"
        );
        assert_eq!(
            generate_tweet_url("hi", ""),
            "https://twitter.com/intent/tweet?text=hi"
        );
    }

    #[tokio::test]
    async fn dated_path_is_sanitized_and_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dated_output_path(dir.path(), "../evil name.csv").await.unwrap();
        assert_eq!(path.file_name().unwrap(), "evil_name.csv");
        assert!(path.parent().unwrap().is_dir());
        assert_eq!(path.parent().unwrap().parent().unwrap(), dir.path());
    }
}
