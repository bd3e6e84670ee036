//! # Feed Syndicator
//!
//! Publishes articles from an RSS/Atom feed to social platforms (Facebook,
//! X, LinkedIn, Telegram), with promotional text written by an
//! OpenAI-compatible LLM.
//!
//! ## Usage
//!
//! ```sh
//! feed_syndicator -c config.yaml             # newest article, one summary post
//! feed_syndicator -c config.yaml -m daily    # random article, batch of posts
//! feed_syndicator --dry-run                  # generate and log, send nothing
//! ```
//!
//! ## Architecture
//!
//! Each invocation runs exactly one cycle:
//! 1. **Fetch**: Read the feed and pick an article
//! 2. **Dedup**: Skip articles listed in the history file
//! 3. **Generate**: Ask the LLM for post text, falling back to title + link
//! 4. **Publish**: Send to each configured platform in turn
//! 5. **Record**: Append the article id to the history file
//!
//! Exit code 0 means published or skipped, 1 a fatal error, 2 that every
//! platform failed.

use clap::Parser;
use std::process::ExitCode;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod error;
mod generator;
mod history;
mod models;
mod orchestrator;
mod publishers;
mod selector;
mod sources;
mod utils;

use api::LlmClient;
use cli::Cli;
use config::Config;
use generator::LlmGenerator;
use history::HistoryStore;
use orchestrator::{CycleOutcome, CycleSettings, Orchestrator};
use sources::rss::RssSource;

const FATAL: u8 = 1;

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Cli::parse();

    // The config decides the default log level, so it is read before tracing starts.
    let loaded = Config::load(&args.config).await;
    init_tracing(
        loaded
            .as_ref()
            .map(|c| c.app.log_level.as_str())
            .unwrap_or("info"),
    );
    info!(version = env!("CARGO_PKG_VERSION"), "feed_syndicator starting up");
    debug!(?args, "Parsed CLI arguments");

    let mut config = match loaded {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Could not load configuration");
            return ExitCode::from(FATAL);
        }
    };
    if let Some(path) = args.history {
        config.history.path = path;
    }
    if let Some(n) = args.num_posts {
        config.generator.num_posts = n;
    }
    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return ExitCode::from(FATAL);
    }

    let client = match reqwest::Client::builder()
        .timeout(config.app.http_timeout())
        .user_agent(config.app.user_agent.clone())
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "Could not build HTTP client");
            return ExitCode::from(FATAL);
        }
    };

    let source = match RssSource::new(client.clone(), &config.feed) {
        Ok(source) => source,
        Err(e) => {
            error!(error = %e, "Invalid feed configuration");
            return ExitCode::from(FATAL);
        }
    };

    let mut history = match HistoryStore::open(&config.history.path).await {
        Ok(history) => history,
        Err(e) => {
            error!(error = %e, "Could not read history; refusing to publish");
            return ExitCode::from(FATAL);
        }
    };
    info!(
        path = %history.path().display(),
        count = history.len(),
        "History loaded"
    );

    let generator = match api::load_clients(&config.generator).await {
        Ok((summary, daily)) => {
            LlmGenerator::new(summary, daily, config.generator.language.clone())
        }
        Err(e) => {
            warn!(error = %e, "LLM unavailable; posts will use the title and link");
            LlmGenerator::<LlmClient>::unconfigured(config.generator.language.clone())
        }
    };

    let publishers = publishers::from_config(&config, &client);
    if publishers.is_empty() {
        warn!("No platforms configured");
    }
    info!(
        platforms = ?publishers.iter().map(|p| p.name()).collect::<Vec<_>>(),
        mode = ?args.mode,
        dry_run = args.dry_run,
        "Starting publishing cycle"
    );

    let orchestrator = Orchestrator::new(
        source,
        generator,
        publishers,
        CycleSettings::from_config(&config, args.dry_run),
    );
    let outcome = orchestrator
        .run_cycle(args.mode, &mut history, &mut rand::rng())
        .await;

    match &outcome {
        CycleOutcome::Published {
            article_id,
            results,
            history_recorded,
        } => info!(
            article_id = %article_id,
            succeeded = results.iter().filter(|r| r.success).count(),
            attempted = results.len(),
            history_recorded,
            "Cycle complete: published"
        ),
        CycleOutcome::Skipped { article_id } => {
            info!(article_id = %article_id, "Cycle complete: already published")
        }
        CycleOutcome::AllFailed {
            article_id,
            results,
        } => warn!(
            article_id = %article_id,
            attempted = results.len(),
            "Cycle complete: every platform failed"
        ),
        CycleOutcome::Aborted { error } => error!(error = %error, "Cycle aborted"),
    }

    ExitCode::from(outcome.exit_code())
}
