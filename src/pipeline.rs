//! Search, single-URL and watch modes.

use crate::app::App;
use crate::config::{AiProvider, TextLimits};
use crate::display;
use crate::error::Result;
use crate::fetcher::EnrichOptions;
use crate::filter::filter_recent_news;
use crate::models::NewsItem;
use crate::outputs::{csv::save_to_csv, generate_tweet_url, json::save_to_json, markdown::save_to_markdown};
use crate::search::{SearchEngine, search_topic};
use crate::utils::safe_topic;
use chrono::Local;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

/// Report formats to write after a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Formats {
    pub csv: bool,
    pub json: bool,
    pub markdown: bool,
}

impl Formats {
    pub fn any(&self) -> bool {
        self.csv || self.json || self.markdown
    }

    /// Parse an interactive answer such as `cm` or `j`; `n` selects nothing.
    pub fn from_letters(answer: &str) -> Self {
        let answer = answer.trim().to_lowercase();
        Self {
            csv: answer.contains('c'),
            json: answer.contains('j'),
            markdown: answer.contains('m'),
        }
    }
}

/// Everything a search run needs besides the [`App`].
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub topic: String,
    pub region: String,
    pub limit: usize,
    pub days: i64,
    pub engine: SearchEngine,
    pub provider: Option<AiProvider>,
    pub enrich: EnrichOptions,
    pub formats: Formats,
}

/// Search `fetch` hits (capped at [`TextLimits::DEFAULT_MAX_RESULTS`]) and
/// return the recent, de-duplicated ones, not yet enriched.
pub async fn find_recent(app: &App, req: &SearchRequest, fetch: usize, days: i64) -> Vec<NewsItem> {
    let engine = app.search_engine(req.engine);
    let fetch = fetch.min(TextLimits::DEFAULT_MAX_RESULTS);
    let hits = search_topic(&engine, &app.cache, &req.topic, &req.region, fetch).await;
    if hits.is_empty() {
        return Vec::new();
    }
    filter_recent_news(hits, days)
}

/// Full search mode: search, filter, enrich, print and export.
#[instrument(level = "info", skip_all, fields(topic = %req.topic, limit = req.limit))]
pub async fn run_search(app: &App, req: &SearchRequest) -> Result<Vec<PathBuf>> {
    println!("🔍 Searching: {} (region {})", req.topic, req.region);
    let mut items = find_recent(app, req, req.limit * 2, req.days).await;
    if items.is_empty() {
        println!("❌ No recent news found for \"{}\".", req.topic);
        return Ok(Vec::new());
    }
    items.truncate(req.limit);
    println!("✅ Found {} articles", items.len());

    let ai = app.ai(req.provider);
    if req.enrich.summarize && !ai.is_available() {
        warn!(provider = %ai.provider(), "No API key configured, AI features are disabled");
    }
    let enricher = app.enricher(&ai, req.enrich.clone());
    let items = enricher.enrich_news_content(items).await;

    print!("{}", display::results_table(&items));
    print!("{}", display::top_stories(&items));

    export(app, &items, &req.topic, req.formats).await
}

/// Write the selected report formats under the output directory.
///
/// A failing writer is logged and the remaining formats are still written.
#[instrument(level = "info", skip(app, items), fields(count = items.len()))]
pub async fn export(app: &App, items: &[NewsItem], topic: &str, formats: Formats) -> Result<Vec<PathBuf>> {
    let base = safe_topic(topic);
    let out = &app.settings.output_dir;
    let mut written = Vec::new();

    if formats.csv {
        match save_to_csv(items, out, &format!("{base}_news.csv")).await {
            Ok(Some(path)) => written.push(path),
            Ok(None) => {}
            Err(e) => error!(error = %e, "CSV export failed"),
        }
    }
    if formats.json {
        match save_to_json(items, out, &format!("{base}_news.json")).await {
            Ok(Some(path)) => written.push(path),
            Ok(None) => {}
            Err(e) => error!(error = %e, "JSON export failed"),
        }
    }
    if formats.markdown {
        match save_to_markdown(items, out, &format!("{base}_news.md"), topic).await {
            Ok(Some(path)) => written.push(path),
            Ok(None) => {}
            Err(e) => error!(error = %e, "Markdown export failed"),
        }
    }

    for path in &written {
        println!("💾 Saved: {}", path.display());
    }
    Ok(written)
}

/// Fetch and enrich one URL, then print the result with a share link.
#[instrument(level = "info", skip(app, opts))]
pub async fn run_url(app: &App, url: &str, provider: Option<AiProvider>, opts: EnrichOptions) -> NewsItem {
    println!("🔗 Processing URL: {url}");
    let item = NewsItem::from_url(url, Local::now().format("%Y-%m-%d %H:%M:%S").to_string());

    let ai = app.ai(provider);
    let enricher = app.enricher(&ai, opts);
    let item = enricher.fetch_single_article(item).await;

    let share = (!item.ai_tweet.is_empty()).then(|| generate_tweet_url(&item.ai_tweet, &item.url));
    print!("{}", display::url_report(&item, share.as_deref()));
    item
}

/// Keep only items whose URL has not been seen, recording the new ones.
fn take_unseen(items: Vec<NewsItem>, seen: &mut HashSet<String>) -> Vec<NewsItem> {
    items.into_iter().filter(|item| seen.insert(item.url.clone())).collect()
}

/// Poll the topic every `interval`, printing only new articles, until Ctrl+C.
#[instrument(level = "info", skip_all, fields(topic = %req.topic, interval_secs = interval.as_secs()))]
pub async fn run_watch(app: &App, req: &SearchRequest, interval: Duration) -> Result<()> {
    println!(
        "👀 Watching \"{}\" every {} minutes. Press Ctrl+C to stop.",
        req.topic,
        interval.as_secs() / 60
    );
    let mut seen: HashSet<String> = HashSet::new();
    let opts = EnrichOptions {
        sentiment: true,
        ..req.enrich.clone()
    };

    loop {
        let round = async {
            let found = find_recent(app, req, 20, 1).await;
            let fresh = take_unseen(found, &mut seen);
            if fresh.is_empty() {
                info!("No new articles");
            } else {
                println!("\n🆕 {} new articles at {}", fresh.len(), Local::now().format("%H:%M:%S"));
                let ai = app.ai(req.provider);
                let enricher = app.enricher(&ai, opts.clone());
                for item in enricher.enrich_news_content(fresh).await {
                    println!("{}", display::watch_entry(&item));
                }
            }
            tokio::time::sleep(interval).await;
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("\n👋 Watch stopped.");
                return Ok(());
            }
            _ = round => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_from_letters() {
        assert_eq!(
            Formats::from_letters("cm"),
            Formats { csv: true, json: false, markdown: true }
        );
        assert!(Formats::from_letters("J").json);
        assert!(!Formats::from_letters("n").any());
        assert!(!Formats::from_letters("").any());
    }

    #[test]
    fn unseen_items_are_recorded_once() {
        let mut seen = HashSet::new();
        let item = |url: &str| NewsItem {
            url: url.into(),
            ..NewsItem::default()
        };

        let first = take_unseen(vec![item("https://e.com/a"), item("https://e.com/b")], &mut seen);
        assert_eq!(first.len(), 2);

        let second = take_unseen(vec![item("https://e.com/b"), item("https://e.com/c")], &mut seen);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].url, "https://e.com/c");
    }

    #[tokio::test]
    async fn export_writes_selected_formats() {
        let dir = tempfile::tempdir().unwrap();
        let settings = crate::config::Settings {
            output_dir: dir.path().join("reports"),
            cache_dir: dir.path().join("cache"),
            prompt_file: dir.path().join("missing.yaml"),
            ..crate::config::Settings::default()
        };
        let app = App::new(settings).unwrap();
        let items = vec![NewsItem {
            title: "Rates held".into(),
            url: "https://e.com/a".into(),
            ..NewsItem::default()
        }];

        let written = export(&app, &items, "bank indonesia", Formats { csv: true, json: false, markdown: true })
            .await
            .unwrap();
        assert_eq!(written.len(), 2);
        assert!(written[0].ends_with("bank_indonesia_news.csv"));
        assert!(written[1].ends_with("bank_indonesia_news.md"));
        assert!(written.iter().all(|p| p.exists()));
    }
}
