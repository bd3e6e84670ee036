//! YAML configuration loaded once at startup.
//!
//! The [`Config`] struct is built in `main` and handed by reference to each
//! component constructor. Every section has defaults except `feed.url`; a
//! platform section that is absent means that platform is not published to.
//!
//! ```yaml
//! feed:
//!   url: https://example.com/feed.xml
//! history:
//!   path: history.txt
//! x:
//!   access_token: "..."
//! telegram:
//!   bot_token: "..."
//!   chat_id: "@channel"
//! ```

use crate::error::ConfigError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::instrument;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub app: AppConfig,
    pub feed: FeedConfig,
    pub history: HistoryConfig,
    pub publishing: PublishingConfig,
    pub generator: GeneratorConfig,
    pub facebook: Option<FacebookConfig>,
    pub x: Option<XConfig>,
    pub linkedin: Option<LinkedInConfig>,
    pub telegram: Option<TelegramConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Default tracing filter when `RUST_LOG` is unset.
    pub log_level: String,
    pub user_agent: String,
    pub http_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            user_agent: concat!("feed_syndicator/", env!("CARGO_PKG_VERSION")).to_string(),
            http_timeout_secs: 30,
        }
    }
}

impl AppConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub url: String,
    /// Fetch each article page to find a cover image and the full text.
    pub enrich_from_page: bool,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            enrich_from_page: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub path: PathBuf,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("history.txt"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PublishingConfig {
    /// Pause after each successful post, to stay clear of provider rate limits.
    pub delay_secs: u64,
    /// Prefix for the article link appended to generated posts.
    pub read_more_label: String,
}

impl Default for PublishingConfig {
    fn default() -> Self {
        Self {
            delay_secs: 5,
            read_more_label: "Read more:".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Path to the awful_aj `config.yaml`; defaults to the awful_aj config dir.
    pub llm_config: Option<PathBuf>,
    pub summary_template: String,
    pub daily_template: String,
    pub language: String,
    pub max_length: usize,
    pub include_hashtags: bool,
    pub num_posts: usize,
    pub max_retries: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            llm_config: None,
            summary_template: "social_post".to_string(),
            daily_template: "daily_posts".to_string(),
            language: "English".to_string(),
            max_length: 280,
            include_hashtags: true,
            num_posts: 5,
            max_retries: 5,
        }
    }
}

fn default_facebook_api() -> String {
    "https://graph.facebook.com/v19.0".to_string()
}

fn default_x_api() -> String {
    "https://api.twitter.com".to_string()
}

fn default_linkedin_api() -> String {
    "https://api.linkedin.com".to_string()
}

fn default_telegram_api() -> String {
    "https://api.telegram.org".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct FacebookConfig {
    pub page_id: String,
    pub access_token: String,
    #[serde(default = "default_facebook_api")]
    pub api_base: String,
}

/// X credentials. `access_token` is an OAuth 2.0 user-context token with
/// `tweet.write` scope.
#[derive(Debug, Clone, Deserialize)]
pub struct XConfig {
    pub access_token: String,
    #[serde(default = "default_x_api")]
    pub api_base: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkedInConfig {
    pub organization_id: String,
    pub access_token: String,
    #[serde(default = "default_linkedin_api")]
    pub api_base: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
    #[serde(default = "default_telegram_api")]
    pub api_base: String,
}

impl Config {
    /// Read and validate the YAML file at `path`.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let config: Config = serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.feed.url.trim().is_empty() {
            return Err(ConfigError::Invalid("feed.url must be set".to_string()));
        }
        if self.generator.num_posts == 0 {
            return Err(ConfigError::Invalid(
                "generator.num_posts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn publish_delay(&self) -> Duration {
        Duration::from_secs(self.publishing.delay_secs)
    }
}
