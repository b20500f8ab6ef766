//! # xnews
//!
//! A command-line news aggregator: search a topic, download the articles,
//! extract their text, optionally translate, summarize with an LLM and
//! score sentiment, then write CSV, JSON and Markdown reports.
//!
//! ## Usage
//!
//! ```sh
//! xnews "bank indonesia" --indo -s -m
//! xnews -u https://example.com/story
//! xnews              # interactive
//! ```
//!
//! ## Architecture
//!
//! 1. **Search**: DuckDuckGo news (or the Google News RSS feed), cached for an hour
//! 2. **Filter**: keep recent items, drop near-duplicate titles, newest first
//! 3. **Fetch**: native client, then browser headers, then `curl`, first
//!    result with enough text wins
//! 4. **Enrich**: translation, AI summary and tweet, sentiment (10 at a time)
//! 5. **Output**: terminal table plus optional report files

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod app;
mod cache;
mod cli;
mod config;
mod display;
mod error;
mod extract;
mod fetcher;
mod filter;
mod interactive;
mod models;
mod outputs;
mod pipeline;
mod prompts;
mod providers;
mod search;
mod text;
mod translate;
mod utils;

use app::App;
use cli::Cli;
use config::Settings;
use interactive::{Session, SessionDefaults};
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // .env first so clap's env fallbacks and Settings both see it
    dotenvy::dotenv().ok();
    let args = Cli::parse();

    // --- Tracing init ---
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tfmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    debug!(?args, "Parsed CLI arguments");

    let settings = Settings::from_env();
    info!(provider = %settings.provider, model = %settings.active_model(), "xnews starting up");

    if let Err(e) = ensure_writable_dir(&settings.output_dir).await {
        error!(
            path = %settings.output_dir.display(),
            error = %e,
            "Output directory is not writable (fix perms or set XNEWS_OUTPUT_DIR)"
        );
        return Err(e.into());
    }

    let mut app = App::new(settings)?;

    if args.clear_cache {
        let removed = app.cache.clear().await?;
        println!("🧹 Cleared {removed} cache entries from {}", app.cache.dir().display());
        return Ok(());
    }

    if let Some(url) = args.url.as_deref() {
        pipeline::run_url(&app, url, args.provider, args.enrich_options(args.url_topic())).await;
        info!(elapsed = ?start_time.elapsed(), "Done");
        return Ok(());
    }

    let Some(topic) = args.topic.as_deref() else {
        let defaults = SessionDefaults {
            region: args.effective_region().to_string(),
            target_lang: args.target_lang.clone(),
            engine: args.engine,
        };
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        Session::new(&mut app, stdin, defaults).run().await?;
        return Ok(());
    };

    println!("{}", display::BANNER);
    let request = args.search_request(topic);
    if args.watch {
        pipeline::run_watch(&app, &request, args.interval()).await?;
    } else {
        let written = pipeline::run_search(&app, &request).await?;
        info!(files = written.len(), elapsed = ?start_time.elapsed(), "Done");
    }

    Ok(())
}
