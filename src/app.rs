//! Session context shared by every mode.
//!
//! One [`App`] is built in `main` and passed down explicitly; it owns the
//! settings, the cache, the HTTP client and the prompt templates.

use crate::cache::CacheManager;
use crate::config::{AiProvider, CACHE_TTL, Settings, TIMEOUT};
use crate::error::Result;
use crate::fetcher::{ArticleFetcher, EnrichOptions, Enricher};
use crate::prompts::PromptLoader;
use crate::providers::AiClient;
use crate::search::{Engine, SearchEngine};
use crate::translate::Translator;
use reqwest::Client;
use tracing::{debug, instrument};

#[derive(Debug)]
pub struct App {
    pub settings: Settings,
    pub cache: CacheManager,
    pub http: Client,
    pub prompts: PromptLoader,
    pub fetcher: ArticleFetcher,
    pub translator: Translator,
}

impl App {
    #[instrument(level = "debug", skip_all)]
    pub fn new(settings: Settings) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(TIMEOUT)
            .build()?;
        let cache = CacheManager::new(&settings.cache_dir, CACHE_TTL)?;
        let prompts = PromptLoader::load(&settings.prompt_file);
        let fetcher = ArticleFetcher::new()?;
        let translator = Translator::new(http.clone());
        debug!(cache_dir = %settings.cache_dir.display(), termux = settings.is_termux, "App ready");

        Ok(Self {
            settings,
            cache,
            http,
            prompts,
            fetcher,
            translator,
        })
    }

    /// LLM client for the active provider, or `provider` when given.
    pub fn ai(&self, provider: Option<AiProvider>) -> AiClient {
        AiClient::new(&self.settings, self.prompts.clone(), self.http.clone(), provider)
    }

    /// Enricher over the shared fetcher, cache and translator. Progress bars
    /// stay hidden where the terminal cannot redraw them.
    pub fn enricher<'a>(&'a self, ai: &'a AiClient, mut opts: EnrichOptions) -> Enricher<'a> {
        opts.progress &= self.settings.progress_bars();
        Enricher::new(&self.fetcher, &self.cache, &self.translator, ai, opts)
    }

    pub fn search_engine(&self, kind: SearchEngine) -> Engine {
        Engine::new(kind, self.http.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(dir: &std::path::Path, is_termux: bool) -> App {
        App::new(Settings {
            cache_dir: dir.join("cache"),
            prompt_file: dir.join("missing.yaml"),
            is_termux,
            ..Settings::default()
        })
        .unwrap()
    }

    #[test]
    fn termux_hides_progress_bar() {
        let dir = tempfile::tempdir().unwrap();
        let opts = EnrichOptions {
            progress: true,
            ..EnrichOptions::default()
        };

        let desktop = app(dir.path(), false);
        let ai = desktop.ai(None);
        assert!(desktop.enricher(&ai, opts.clone()).opts.progress);

        let termux = app(dir.path(), true);
        let ai = termux.ai(None);
        assert!(!termux.enricher(&ai, opts).opts.progress);
    }
}
