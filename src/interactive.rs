//! Line-driven interactive session.
//!
//! Commands: `exit`/`quit`/`q`, `ai` for the provider menu, `clear` to
//! empty the cache, and anything else is searched as a topic.

use crate::app::App;
use crate::config::{AiProvider, save_env_setting};
use crate::display;
use crate::error::Result;
use crate::fetcher::EnrichOptions;
use crate::pipeline::{self, Formats, SearchRequest};
use crate::search::SearchEngine;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tracing::{info, instrument, warn};

const INTERACTIVE_LIMIT: usize = 10;
const INTERACTIVE_DAYS: i64 = 3;
const INTERACTIVE_FETCH: usize = 20;

/// What the numeric option prompt turns on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModeChoice {
    pub translate: bool,
    pub summarize: bool,
    pub sentiment: bool,
}

impl ModeChoice {
    /// `1` quick, `2` translate, `3` summary, `4` everything. Anything else
    /// is treated as quick.
    pub fn from_input(answer: &str) -> Self {
        match answer.trim() {
            "2" => Self {
                translate: true,
                ..Self::default()
            },
            "3" => Self {
                summarize: true,
                ..Self::default()
            },
            "4" => Self {
                translate: true,
                summarize: true,
                sentiment: true,
            },
            _ => Self::default(),
        }
    }
}

/// Defaults carried in from the command line.
#[derive(Debug, Clone)]
pub struct SessionDefaults {
    pub region: String,
    pub target_lang: String,
    pub engine: SearchEngine,
}

pub struct Session<'a, R> {
    app: &'a mut App,
    lines: Lines<R>,
    defaults: SessionDefaults,
}

impl<'a, R: AsyncBufRead + Unpin> Session<'a, R> {
    pub fn new(app: &'a mut App, reader: R, defaults: SessionDefaults) -> Self {
        Self {
            app,
            lines: reader.lines(),
            defaults,
        }
    }

    /// Print `msg` and read one trimmed line; `None` on end of input.
    async fn prompt(&mut self, msg: &str) -> Result<Option<String>> {
        print!("{msg}");
        std::io::stdout().flush()?;
        Ok(self.lines.next_line().await?.map(|l| l.trim().to_string()))
    }

    #[instrument(level = "info", skip_all)]
    pub async fn run(&mut self) -> Result<()> {
        println!("{}", display::BANNER);
        println!("Type a topic to search, `ai` for AI settings, `clear` to empty the cache, `q` to quit.");

        loop {
            let status = format!(
                "\n🤖 {} ({})\n📰 Topic: ",
                self.app.settings.provider,
                self.app.settings.active_model()
            );
            let Some(input) = self.prompt(&status).await? else {
                break;
            };

            match input.to_lowercase().as_str() {
                "" => continue,
                "exit" | "quit" | "q" => break,
                "ai" => self.ai_menu().await?,
                "clear" => {
                    let removed = self.app.cache.clear().await?;
                    println!("🧹 Cleared {removed} cache entries");
                }
                _ => self.search(input).await?,
            }
        }
        println!("👋 Bye!");
        Ok(())
    }

    /// Provider and model settings. Returns when the user backs out.
    pub async fn ai_menu(&mut self) -> Result<()> {
        loop {
            let settings = &self.app.settings;
            println!("\n⚙️  AI settings: {} / {}", settings.provider, settings.active_model());
            for (key, provider) in [("1", AiProvider::Groq), ("2", AiProvider::Gemini)] {
                let note = if settings.has_key(provider) { "" } else { " (no API key)" };
                println!("  {key}. {provider}{note}");
            }
            println!("  m. Change model\n  s. Save to .env\n  x. Back");

            let Some(choice) = self.prompt("Choice: ").await? else {
                return Ok(());
            };
            match choice.to_lowercase().as_str() {
                "1" => self.switch_provider(AiProvider::Groq),
                "2" => self.switch_provider(AiProvider::Gemini),
                "m" => self.choose_model().await?,
                "s" => match self.app.settings.persist() {
                    Ok(()) => println!("💾 Saved to {}", self.app.settings.env_file.display()),
                    Err(e) => warn!(error = %e, "Could not save settings"),
                },
                "x" | "" => return Ok(()),
                other => println!("Unknown option `{other}`"),
            }
        }
    }

    fn switch_provider(&mut self, provider: AiProvider) {
        if !self.app.settings.has_key(provider) {
            println!("❌ No API key for {provider}; set it in .env first.");
            return;
        }
        self.app.settings.provider = provider;
        if let Err(e) = save_env_setting(&self.app.settings.env_file, "AI_PROVIDER", provider.as_str()) {
            warn!(error = %e, "Could not save provider");
        }
        info!(%provider, "Switched AI provider");
        println!("✅ Using {provider}");
    }

    async fn choose_model(&mut self) -> Result<()> {
        let models = self.app.settings.provider.models();
        for (i, model) in models.iter().enumerate() {
            println!("  {}. {model}", i + 1);
        }
        let Some(answer) = self.prompt("Model number: ").await? else {
            return Ok(());
        };
        match answer.parse::<usize>().ok().and_then(|n| n.checked_sub(1)).and_then(|i| models.get(i)) {
            Some(model) => {
                self.app.settings.set_model(*model);
                println!("✅ Model set to {model}");
            }
            None => println!("Invalid model number"),
        }
        Ok(())
    }

    async fn search(&mut self, topic: String) -> Result<()> {
        let req = SearchRequest {
            topic,
            region: self.defaults.region.clone(),
            limit: INTERACTIVE_LIMIT,
            days: INTERACTIVE_DAYS,
            engine: self.defaults.engine,
            provider: None,
            enrich: EnrichOptions::default(),
            formats: Formats::default(),
        };

        println!("🔍 Searching: {}", req.topic);
        let mut items = pipeline::find_recent(self.app, &req, INTERACTIVE_FETCH, req.days).await;
        if items.is_empty() {
            println!("❌ No recent news found.");
            return Ok(());
        }
        items.truncate(INTERACTIVE_LIMIT);
        println!("✅ Found {} articles", items.len());

        println!("  1. Quick (text only)\n  2. + Translate\n  3. + AI summary\n  4. Full (translate, summary, sentiment)");
        let mode = ModeChoice::from_input(&self.prompt("Option [1-4]: ").await?.unwrap_or_default());
        let opts = EnrichOptions {
            translate: mode.translate,
            target_lang: self.defaults.target_lang.clone(),
            summarize: mode.summarize,
            sentiment: mode.sentiment,
            topic: req.topic.clone(),
            progress: true,
        };

        let app: &App = &*self.app;
        let ai = app.ai(None);
        let enricher = app.enricher(&ai, opts);
        let items = enricher.enrich_news_content(items).await;
        print!("{}", display::top_stories(&items));

        let answer = self
            .prompt("\n💾 Save as (c)sv, (j)son, (m)arkdown or (n)one? ")
            .await?
            .unwrap_or_default();
        let formats = Formats::from_letters(&answer);
        if formats.any() {
            pipeline::export(self.app, &items, &req.topic, formats).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;

    fn app(dir: &std::path::Path) -> App {
        let settings = Settings {
            groq_api_key: "gsk".into(),
            gemini_api_key: "gem".into(),
            output_dir: dir.join("reports"),
            cache_dir: dir.join("cache"),
            prompt_file: dir.join("missing.yaml"),
            env_file: dir.join(".env"),
            ..Settings::default()
        };
        App::new(settings).unwrap()
    }

    fn defaults() -> SessionDefaults {
        SessionDefaults {
            region: "wt-wt".into(),
            target_lang: "id".into(),
            engine: SearchEngine::DuckDuckGo,
        }
    }

    #[test]
    fn mode_choices() {
        assert_eq!(ModeChoice::from_input("1"), ModeChoice::default());
        assert!(ModeChoice::from_input("2").translate);
        assert!(ModeChoice::from_input(" 3 ").summarize);
        let full = ModeChoice::from_input("4");
        assert!(full.translate && full.summarize && full.sentiment);
        assert_eq!(ModeChoice::from_input("zzz"), ModeChoice::default());
    }

    #[tokio::test]
    async fn ai_menu_switches_provider_and_model() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(dir.path());
        let input: &[u8] = b"2\nm\n2\ns\nx\n";

        Session::new(&mut app, input, defaults()).ai_menu().await.unwrap();

        assert_eq!(app.settings.provider, AiProvider::Gemini);
        assert_eq!(app.settings.gemini_model, AiProvider::Gemini.models()[1]);
        let env = std::fs::read_to_string(dir.path().join(".env")).unwrap();
        assert!(env.contains("AI_PROVIDER=gemini"));
        assert!(env.contains(&format!("GEMINI_MODEL={}", AiProvider::Gemini.models()[1])));
    }

    #[tokio::test]
    async fn provider_without_key_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(dir.path());
        app.settings.gemini_api_key.clear();
        let input: &[u8] = b"2\nx\n";

        Session::new(&mut app, input, defaults()).ai_menu().await.unwrap();
        assert_eq!(app.settings.provider, AiProvider::Groq);
    }

    #[tokio::test]
    async fn quit_ends_session() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(dir.path());
        let input: &[u8] = b"\nq\nnever searched\n";
        Session::new(&mut app, input, defaults()).run().await.unwrap();
    }

    #[tokio::test]
    async fn clear_empties_the_cache() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(dir.path());
        app.cache.set("https://e.com/story", &"cached text".to_string()).await;
        assert!(app.cache.get::<String>("https://e.com/story").await.is_some());

        let input: &[u8] = b"clear\nq\n";
        Session::new(&mut app, input, defaults()).run().await.unwrap();

        assert!(app.cache.get::<String>("https://e.com/story").await.is_none());
    }
}
