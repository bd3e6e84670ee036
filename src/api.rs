//! LLM access through `awful_aj`.
//!
//! - [`AskAsync`]: one request in, one response out
//! - [`AskFnWrapper`]: `awful_aj::api::ask` bound to a config and one chat template
//! - [`RetryAsk`]: retries any `AskAsync` with exponential backoff
//!
//! [`load_clients`] builds the two retrying clients the generator needs, one
//! per chat template.

use crate::config::GeneratorConfig;
use awful_aj::api::ask;
use awful_aj::{config, config_dir, template};
use awful_aj::{config::AwfulJadeConfig, template::ChatTemplate};
use rand::{Rng, rng};
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

/// Send text to an LLM, get its reply.
pub trait AskAsync {
    type Response;

    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>>;
}

/// Retries a failed request up to `max_retries` more times.
///
/// ```text
/// delay(n) = min(base_delay * 2^(n-1), 30s) + jitter(0..=250ms)
/// ```
pub struct RetryAsk<T> {
    inner: T,
    max_retries: usize,
    base_delay: StdDuration,
    max_delay: StdDuration,
}

impl<T> RetryAsk<T>
where
    T: AskAsync,
{
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for RetryAsk<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryAsk")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> RetryAsk<T> {
    /// Pause before retry number `attempt` (1-based), without jitter.
    fn backoff(&self, attempt: usize) -> StdDuration {
        let shift = attempt.saturating_sub(1).min(16) as u32;
        self.base_delay
            .saturating_mul(1u32 << shift)
            .min(self.max_delay)
    }
}

impl<T> AskAsync for RetryAsk<T>
where
    T: AskAsync + fmt::Debug,
{
    type Response = T::Response;

    #[instrument(level = "info", skip_all, fields(max_retries = self.max_retries))]
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>> {
        let started = Instant::now();
        let mut attempt = 0usize;

        loop {
            attempt += 1;
            let err = match self.inner.ask(text).await {
                Ok(resp) => return Ok(resp),
                Err(e) => e,
            };

            if attempt > self.max_retries {
                error!(
                    attempt,
                    elapsed_ms_total = started.elapsed().as_millis(),
                    error = %err,
                    "LLM request failed; giving up"
                );
                return Err(err);
            }

            let jitter = StdDuration::from_millis(rng().random_range(0..=250));
            let delay = self.backoff(attempt) + jitter;
            warn!(
                attempt,
                elapsed_ms_total = started.elapsed().as_millis(),
                ?delay,
                error = %err,
                "LLM request failed; retrying"
            );
            sleep(delay).await;
        }
    }
}

/// Adapts `awful_aj::api::ask` with one chat template to [`AskAsync`].
///
/// The config is shared between the summary and daily-batch wrappers.
#[derive(Debug)]
pub struct AskFnWrapper {
    /// LLM configuration (API keys, endpoints, model settings).
    pub config: Arc<AwfulJadeConfig>,
    /// The chat template defining the system prompt for this kind of request.
    pub template: ChatTemplate,
}

impl AskFnWrapper {
    pub fn new(config: Arc<AwfulJadeConfig>, template: ChatTemplate) -> Self {
        Self { config, template }
    }
}

impl AskAsync for AskFnWrapper {
    type Response = String;

    #[instrument(level = "info", skip_all)]
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>> {
        let t0 = Instant::now();
        let res = ask(&self.config, text.to_string(), &self.template, None, None).await;
        let dt = t0.elapsed();

        match &res {
            Ok(_) => info!(elapsed_ms = dt.as_millis(), "API call succeeded"),
            Err(e) => warn!(elapsed_ms = dt.as_millis(), error = %e, "API call failed"),
        }
        res
    }
}

/// The retrying LLM client used for one kind of request.
pub type LlmClient = RetryAsk<AskFnWrapper>;

/// Load the awful_aj config and both chat templates named in `generator`.
///
/// Returns `(summary_client, daily_client)`.
///
/// # Errors
///
/// Fails if the awful_aj config file or either template cannot be loaded.
#[instrument(level = "info", skip_all)]
pub async fn load_clients(
    generator: &GeneratorConfig,
) -> Result<(LlmClient, LlmClient), Box<dyn Error>> {
    let config_path = match &generator.llm_config {
        Some(path) => path.clone(),
        None => config_dir()?.join("config.yaml"),
    };
    let config_path = config_path
        .to_str()
        .ok_or("LLM config path is not valid UTF-8")?
        .to_string();
    let llm_config = Arc::new(config::load_config(&config_path)?);
    info!(config_path, "Loaded LLM configuration");

    let summary_template = template::load_template(&generator.summary_template).await?;
    let daily_template = template::load_template(&generator.daily_template).await?;
    info!(
        summary = %generator.summary_template,
        daily = %generator.daily_template,
        "Loaded LLM templates"
    );

    let base_delay = StdDuration::from_secs(1);
    Ok((
        RetryAsk::new(
            AskFnWrapper::new(Arc::clone(&llm_config), summary_template),
            generator.max_retries,
            base_delay,
        ),
        RetryAsk::new(
            AskFnWrapper::new(llm_config, daily_template),
            generator.max_retries,
            base_delay,
        ),
    ))
}
