//! News search engines and the cached, retrying topic search on top of them.
//!
//! - [`duckduckgo`]: DuckDuckGo news (default)
//! - [`google_news`]: Google News RSS

pub mod duckduckgo;
pub mod google_news;

use crate::cache::CacheManager;
use crate::config::{MAX_RETRIES, RETRY_DELAY};
use crate::error::Result;
use crate::models::SearchHit;
use clap::ValueEnum;
use itertools::Itertools;
use reqwest::Client;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, instrument, warn};

pub use duckduckgo::DuckDuckGo;
pub use google_news::GoogleNews;

/// A source of raw news hits for a query.
pub trait NewsSearch {
    fn name(&self) -> &'static str;

    async fn search(&self, query: &str, region: &str, max_results: usize) -> Result<Vec<SearchHit>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SearchEngine {
    #[default]
    #[value(name = "duckduckgo", alias = "ddg")]
    DuckDuckGo,
    #[value(name = "google-news", alias = "google")]
    GoogleNews,
}

/// A configured engine of either kind.
#[derive(Debug, Clone)]
pub enum Engine {
    DuckDuckGo(DuckDuckGo),
    GoogleNews(GoogleNews),
}

impl Engine {
    pub fn new(kind: SearchEngine, client: Client) -> Self {
        match kind {
            SearchEngine::DuckDuckGo => Engine::DuckDuckGo(DuckDuckGo::new(client)),
            SearchEngine::GoogleNews => Engine::GoogleNews(GoogleNews::new(client)),
        }
    }
}

impl NewsSearch for Engine {
    fn name(&self) -> &'static str {
        match self {
            Engine::DuckDuckGo(e) => e.name(),
            Engine::GoogleNews(e) => e.name(),
        }
    }

    async fn search(&self, query: &str, region: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        match self {
            Engine::DuckDuckGo(e) => e.search(query, region, max_results).await,
            Engine::GoogleNews(e) => e.search(query, region, max_results).await,
        }
    }
}

pub fn search_cache_key(topic: &str, region: &str, max_results: usize) -> String {
    format!("search_{topic}_{region}_{max_results}")
}

/// Search a topic, serving from the cache when a fresh result exists.
///
/// Failed attempts are retried up to [`MAX_RETRIES`] times, waiting twice the
/// retry delay and doubling from there. Exhausting the retries yields an
/// empty list, which is not cached.
#[instrument(level = "info", skip(engine, cache), fields(engine = engine.name()))]
pub async fn search_topic<S: NewsSearch>(
    engine: &S,
    cache: &CacheManager,
    topic: &str,
    region: &str,
    max_results: usize,
) -> Vec<SearchHit> {
    search_topic_with_delay(engine, cache, topic, region, max_results, RETRY_DELAY).await
}

pub(crate) async fn search_topic_with_delay<S: NewsSearch>(
    engine: &S,
    cache: &CacheManager,
    topic: &str,
    region: &str,
    max_results: usize,
    base_delay: Duration,
) -> Vec<SearchHit> {
    let key = search_cache_key(topic, region, max_results);
    if let Some(hits) = cache.get::<Vec<SearchHit>>(&key).await {
        info!(count = hits.len(), "Using cached search results");
        return hits;
    }

    for attempt in 0..MAX_RETRIES {
        match engine.search(topic, region, max_results).await {
            Ok(hits) => {
                let hits: Vec<SearchHit> = hits.into_iter().unique_by(|h| h.url.clone()).collect();
                info!(count = hits.len(), attempt, "Search finished");
                if !hits.is_empty() {
                    cache.set(&key, &hits).await;
                }
                return hits;
            }
            Err(e) => {
                let delay = base_delay.saturating_mul(1 << (attempt + 1));
                warn!(attempt = attempt + 1, max = MAX_RETRIES, ?delay, error = %e, "Search attempt failed");
                if attempt + 1 < MAX_RETRIES {
                    sleep(delay).await;
                }
            }
        }
    }

    warn!("Search gave up after retries");
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NewsError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Scripted {
        calls: AtomicUsize,
        fail_first: usize,
        hits: Vec<SearchHit>,
    }

    impl NewsSearch for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn search(&self, _: &str, _: &str, _: usize) -> Result<Vec<SearchHit>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first {
                Err(NewsError::Search("rate limited".into()))
            } else {
                Ok(self.hits.clone())
            }
        }
    }

    fn hit(url: &str) -> SearchHit {
        SearchHit {
            title: format!("title {url}"),
            url: url.to_string(),
            ..SearchHit::default()
        }
    }

    fn cache() -> (tempfile::TempDir, CacheManager) {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheManager::new(dir.path(), Duration::from_secs(3600)).unwrap();
        (dir, cache)
    }

    #[tokio::test]
    async fn retries_then_dedups_and_caches() {
        let (_dir, cache) = cache();
        let engine = Scripted {
            calls: AtomicUsize::new(0),
            fail_first: 2,
            hits: vec![hit("https://a/1"), hit("https://a/1"), hit("https://a/2")],
        };

        let hits = search_topic_with_delay(&engine, &cache, "rupiah", "wt-wt", 10, Duration::ZERO).await;
        assert_eq!(hits.len(), 2);
        assert_eq!(engine.calls.load(Ordering::SeqCst), 3);

        let again = search_topic_with_delay(&engine, &cache, "rupiah", "wt-wt", 10, Duration::ZERO).await;
        assert_eq!(again, hits);
        assert_eq!(engine.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_with_empty_list_and_does_not_cache() {
        let (_dir, cache) = cache();
        let engine = Scripted {
            calls: AtomicUsize::new(0),
            fail_first: usize::MAX,
            hits: Vec::new(),
        };

        let hits = search_topic_with_delay(&engine, &cache, "rupiah", "wt-wt", 10, Duration::ZERO).await;
        assert!(hits.is_empty());
        assert_eq!(engine.calls.load(Ordering::SeqCst), MAX_RETRIES as usize);
        let key = search_cache_key("rupiah", "wt-wt", 10);
        assert!(cache.get::<Vec<SearchHit>>(&key).await.is_none());
    }

    #[tokio::test]
    async fn backoff_doubles_from_twice_the_base_delay() {
        let (_dir, cache) = cache();
        let engine = Scripted {
            calls: AtomicUsize::new(0),
            fail_first: 2,
            hits: vec![hit("https://a/1")],
        };
        let base = Duration::from_millis(20);

        let started = std::time::Instant::now();
        let hits = search_topic_with_delay(&engine, &cache, "rupiah", "wt-wt", 10, base).await;
        let elapsed = started.elapsed();

        assert_eq!(hits.len(), 1);
        // Two failures wait 2x then 4x the base delay.
        assert!(elapsed >= base * 6, "elapsed {elapsed:?}");
        assert!(elapsed < base * 6 + Duration::from_secs(2), "elapsed {elapsed:?}");
    }

    #[test]
    fn cache_key_format() {
        assert_eq!(search_cache_key("rust lang", "id-id", 20), "search_rust lang_id-id_20");
    }
}
