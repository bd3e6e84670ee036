//! One publishing cycle, from feed to platforms to history.
//!
//! # Cycle
//!
//! 1. **Fetch**: Latest entry (`Mode::Latest`) or a random one (`Mode::Daily`)
//! 2. **Dedup**: Stop if the article id is already in the history
//! 3. **Generate**: One summary, or a batch of candidates; failures fall back
//!    to `"{title}\n\n{link}"`
//! 4. **Publish**: Each platform in order, sequentially, errors isolated
//! 5. **Record**: Append the id to the history if any platform succeeded
//!
//! The result is a [`CycleOutcome`]; only a failed fetch is treated as fatal.

use crate::config::Config;
use crate::error::FetchError;
use crate::generator::ContentGenerator;
use crate::history::HistoryStore;
use crate::models::{Article, CandidatePost, Mode, PublishResult};
use crate::publishers::Publisher;
use crate::selector::select_best;
use crate::sources::ArticleSource;
use crate::utils::{ELLIPSIS, truncate_at_word};
use rand::Rng;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};
use url::Url;

/// Per-run knobs taken from the config and CLI.
#[derive(Debug, Clone)]
pub struct CycleSettings {
    pub dry_run: bool,
    /// Pause after each successful post except the last.
    pub delay: Duration,
    pub read_more_label: String,
    pub max_length: usize,
    pub include_hashtags: bool,
    pub num_posts: usize,
}

impl CycleSettings {
    pub fn from_config(config: &Config, dry_run: bool) -> Self {
        Self {
            dry_run,
            delay: config.publish_delay(),
            read_more_label: config.publishing.read_more_label.clone(),
            max_length: config.generator.max_length,
            include_hashtags: config.generator.include_hashtags,
            num_posts: config.generator.num_posts,
        }
    }
}

/// How a cycle ended.
#[derive(Debug)]
pub enum CycleOutcome {
    /// At least one platform accepted the post.
    Published {
        article_id: String,
        results: Vec<PublishResult>,
        /// False if the history write failed; the article may be posted again.
        history_recorded: bool,
    },
    /// The article was already published by an earlier run.
    Skipped { article_id: String },
    /// Every platform failed, or none is configured. History is untouched.
    AllFailed {
        article_id: String,
        results: Vec<PublishResult>,
    },
    /// No article could be fetched.
    Aborted { error: FetchError },
}

impl CycleOutcome {
    /// Process exit code: 0 published or skipped, 1 aborted, 2 all failed.
    pub fn exit_code(&self) -> u8 {
        match self {
            CycleOutcome::Published { .. } | CycleOutcome::Skipped { .. } => 0,
            CycleOutcome::Aborted { .. } => 1,
            CycleOutcome::AllFailed { .. } => 2,
        }
    }
}

pub struct Orchestrator<S, G> {
    source: S,
    generator: G,
    publishers: Vec<Box<dyn Publisher>>,
    settings: CycleSettings,
}

impl<S, G> Orchestrator<S, G>
where
    S: ArticleSource,
    G: ContentGenerator,
{
    pub fn new(
        source: S,
        generator: G,
        publishers: Vec<Box<dyn Publisher>>,
        settings: CycleSettings,
    ) -> Self {
        Self {
            source,
            generator,
            publishers,
            settings,
        }
    }

    /// Run one full cycle.
    ///
    /// `rng` drives per-platform candidate selection.
    #[instrument(level = "info", skip_all, fields(?mode, dry_run = self.settings.dry_run))]
    pub async fn run_cycle<R>(
        &self,
        mode: Mode,
        history: &mut HistoryStore,
        rng: &mut R,
    ) -> CycleOutcome
    where
        R: Rng + ?Sized,
    {
        let fetched = match mode {
            Mode::Latest => self.source.fetch_latest().await,
            Mode::Daily => self.source.fetch_random().await,
        };
        let article = match fetched {
            Ok(article) => article,
            Err(error) => {
                error!(error = %error, "Could not fetch an article; aborting cycle");
                return CycleOutcome::Aborted { error };
            }
        };
        info!(article_id = %article.id, title = %article.title, "Fetched article");

        if history.contains(&article.id) {
            info!(article_id = %article.id, "Article already published; skipping");
            return CycleOutcome::Skipped {
                article_id: article.id,
            };
        }

        let candidates = self.generate(mode, &article).await;
        if self.settings.dry_run {
            for (i, c) in candidates.iter().enumerate() {
                info!(
                    index = i + 1,
                    post_type = %c.post_type,
                    score = c.engagement_score,
                    text = %c.text,
                    "Generated candidate"
                );
            }
        }

        let results = self.publish_all(&article, &candidates, rng).await;
        let succeeded = results.iter().filter(|r| r.success).count();
        info!(
            article_id = %article.id,
            attempted = results.len(),
            succeeded,
            "Publishing finished"
        );

        if succeeded == 0 {
            warn!(
                article_id = %article.id,
                attempted = results.len(),
                "No platform accepted the post; history not updated"
            );
            return CycleOutcome::AllFailed {
                article_id: article.id,
                results,
            };
        }

        let history_recorded = match history.record(&article.id).await {
            Ok(()) => true,
            Err(e) => {
                error!(article_id = %article.id, error = %e, "Could not record article in history");
                false
            }
        };

        CycleOutcome::Published {
            article_id: article.id,
            results,
            history_recorded,
        }
    }

    /// Generated candidates, never empty.
    async fn generate(&self, mode: Mode, article: &Article) -> Vec<CandidatePost> {
        let s = &self.settings;
        let generated = match mode {
            Mode::Latest => self
                .generator
                .summarize(article, s.max_length, s.include_hashtags, s.dry_run)
                .await
                .map(|post| vec![CandidatePost::from(post)]),
            Mode::Daily => {
                self.generator
                    .generate_daily_batch(article, s.num_posts, s.dry_run)
                    .await
            }
        };

        match generated {
            Ok(candidates) if !candidates.is_empty() => candidates,
            Ok(_) => {
                warn!(article_id = %article.id, "Generator returned no posts; using fallback message");
                vec![CandidatePost::fallback(article)]
            }
            Err(e) => {
                warn!(article_id = %article.id, error = %e, "Generation failed; using fallback message");
                vec![CandidatePost::fallback(article)]
            }
        }
    }

    async fn publish_all<R>(
        &self,
        article: &Article,
        candidates: &[CandidatePost],
        rng: &mut R,
    ) -> Vec<PublishResult>
    where
        R: Rng + ?Sized,
    {
        let s = &self.settings;
        let mut results = Vec::with_capacity(self.publishers.len());

        for (i, publisher) in self.publishers.iter().enumerate() {
            let platform = publisher.name();
            let caps = publisher.capabilities();
            let candidate = select_best(candidates, rng)
                .cloned()
                .unwrap_or_else(|| CandidatePost::fallback(article));

            let message = compose_message(
                &candidate.text,
                article.link.as_str(),
                &s.read_more_label,
                caps.max_chars,
            );
            let link = caps.link.then(|| article.link.as_str());
            let image = if caps.image {
                article.cover_image.as_ref().map(Url::as_str)
            } else {
                None
            };

            match publisher.send(&message, link, image, s.dry_run).await {
                Ok(provider_id) => {
                    info!(platform, %provider_id, post_type = %candidate.post_type, "Published");
                    results.push(PublishResult::ok(platform, provider_id));

                    let is_last = i + 1 == self.publishers.len();
                    if !s.dry_run && !is_last && !s.delay.is_zero() {
                        sleep(s.delay).await;
                    }
                }
                Err(e) => {
                    error!(platform, article_id = %article.id, error = %e, "Publish failed");
                    results.push(PublishResult::failed(platform, e.to_string()));
                }
            }
        }
        results
    }
}

/// Final text for one platform.
///
/// Appends `"\n\n{label} {link}"` unless `text` already mentions the link or
/// the label. With a `max_chars` ceiling the post text is shortened at a word
/// boundary so the link suffix survives whole. When the suffix leaves no room
/// for text, the text is dropped, then the label; the link is never cut.
pub fn compose_message(text: &str, link: &str, label: &str, max_chars: Option<usize>) -> String {
    let text = text.trim();
    let suffix = if text.contains(link) || (!label.is_empty() && text.contains(label)) {
        String::new()
    } else {
        format!("\n\n{label} {link}")
    };

    let full = format!("{text}{suffix}");
    let Some(max) = max_chars else {
        return full;
    };
    if full.chars().count() <= max {
        return full;
    }

    if suffix.is_empty() {
        return truncate_at_word(&full, max);
    }
    // At least one char of text plus the ellipsis.
    let suffix_chars = suffix.chars().count();
    if suffix_chars + ELLIPSIS.len() < max {
        return format!("{}{suffix}", truncate_at_word(text, max - suffix_chars));
    }

    let labelled = format!("{label} {link}").trim().to_string();
    if labelled.chars().count() <= max {
        labelled
    } else {
        link.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::LlmClient;
    use crate::config::{FacebookConfig, TelegramConfig, XConfig};
    use crate::error::{GenerationError, PublishError};
    use crate::generator::LlmGenerator;
    use crate::models::{PostType, SocialPost};
    use crate::publishers::facebook::FacebookPublisher;
    use crate::publishers::telegram::TelegramPublisher;
    use crate::publishers::x::XPublisher;
    use crate::publishers::{Capabilities, DRY_RUN_ID};
    use async_trait::async_trait;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;
    use wiremock::matchers::any;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn article() -> Article {
        Article::new("T", Url::parse("https://x/a1").unwrap(), "Body text")
    }

    struct StubSource {
        article: Option<Article>,
        calls: Arc<Mutex<Vec<&'static str>>>,
    }

    impl StubSource {
        fn new(article: Option<Article>) -> Self {
            Self {
                article,
                calls: Arc::default(),
            }
        }

        fn result(&self, which: &'static str) -> Result<Article, FetchError> {
            self.calls.lock().unwrap().push(which);
            self.article.clone().ok_or(FetchError::FeedEmpty)
        }
    }

    impl ArticleSource for StubSource {
        async fn fetch_latest(&self) -> Result<Article, FetchError> {
            self.result("latest")
        }

        async fn fetch_random(&self) -> Result<Article, FetchError> {
            self.result("random")
        }
    }

    /// Generator with scripted output; `None` fails with `GenerationError::Empty`.
    #[derive(Default)]
    struct StubGenerator {
        summary: Option<String>,
        batch: Option<Vec<CandidatePost>>,
        calls: Arc<Mutex<usize>>,
    }

    impl ContentGenerator for StubGenerator {
        async fn summarize(
            &self,
            _article: &Article,
            _max_length: usize,
            _include_hashtags: bool,
            _dry_run: bool,
        ) -> Result<SocialPost, GenerationError> {
            *self.calls.lock().unwrap() += 1;
            self.summary
                .clone()
                .map(|social_post| SocialPost {
                    social_post,
                    hashtags: Vec::new(),
                })
                .ok_or(GenerationError::Empty)
        }

        async fn generate_daily_batch(
            &self,
            _article: &Article,
            _num_posts: usize,
            _dry_run: bool,
        ) -> Result<Vec<CandidatePost>, GenerationError> {
            *self.calls.lock().unwrap() += 1;
            self.batch.clone().ok_or(GenerationError::Empty)
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Sent {
        platform: &'static str,
        message: String,
        link: Option<String>,
        image: Option<String>,
        dry_run: bool,
    }

    struct RecordingPublisher {
        name: &'static str,
        caps: Capabilities,
        fail: bool,
        sent: Arc<Mutex<Vec<Sent>>>,
    }

    impl RecordingPublisher {
        fn boxed(
            name: &'static str,
            caps: Capabilities,
            fail: bool,
            sent: &Arc<Mutex<Vec<Sent>>>,
        ) -> Box<dyn Publisher> {
            Box::new(Self {
                name,
                caps,
                fail,
                sent: Arc::clone(sent),
            })
        }
    }

    #[async_trait]
    impl Publisher for RecordingPublisher {
        fn name(&self) -> &'static str {
            self.name
        }

        fn capabilities(&self) -> Capabilities {
            self.caps
        }

        async fn send(
            &self,
            message: &str,
            link: Option<&str>,
            image_url: Option<&str>,
            dry_run: bool,
        ) -> Result<String, PublishError> {
            self.sent.lock().unwrap().push(Sent {
                platform: self.name,
                message: message.to_string(),
                link: link.map(str::to_string),
                image: image_url.map(str::to_string),
                dry_run,
            });
            if self.fail {
                return Err(PublishError::Api {
                    platform: self.name,
                    status: 500,
                    body: "boom".to_string(),
                });
            }
            Ok(format!("{}-1", self.name))
        }
    }

    const FULL: Capabilities = Capabilities {
        link: true,
        image: true,
        max_chars: None,
    };

    const SHORT_TEXT_ONLY: Capabilities = Capabilities {
        link: false,
        image: false,
        max_chars: Some(60),
    };

    fn settings(dry_run: bool) -> CycleSettings {
        CycleSettings {
            dry_run,
            delay: Duration::ZERO,
            read_more_label: "Read more:".to_string(),
            max_length: 280,
            include_hashtags: true,
            num_posts: 3,
        }
    }

    async fn empty_history() -> (tempfile::TempDir, HistoryStore) {
        let dir = tempdir().unwrap();
        let store = HistoryStore::open(dir.path().join("history.txt"))
            .await
            .unwrap();
        (dir, store)
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn test_compose_appends_link_suffix() {
        assert_eq!(
            compose_message("Hello", "https://x/a1", "Read more:", None),
            "Hello\n\nRead more: https://x/a1"
        );
    }

    #[test]
    fn test_compose_skips_suffix_when_link_or_label_present() {
        assert_eq!(
            compose_message("See https://x/a1", "https://x/a1", "Read more:", None),
            "See https://x/a1"
        );
        assert_eq!(
            compose_message("Read more: below", "https://x/a1", "Read more:", None),
            "Read more: below"
        );
    }

    #[test]
    fn test_compose_truncates_text_and_keeps_suffix() {
        let text = "word ".repeat(100);
        let out = compose_message(&text, "https://x/a1", "Read more:", Some(80));
        assert!(out.chars().count() <= 80);
        assert!(out.ends_with("...\n\nRead more: https://x/a1"));
    }

    #[test]
    fn test_compose_without_suffix_truncates_whole_text() {
        let text = format!("{} https://x/a1", "word ".repeat(100));
        let out = compose_message(&text, "https://x/a1", "Read more:", Some(50));
        assert!(out.chars().count() <= 50);
        assert!(out.ends_with("..."));
    }

    fn long_link(chars: usize) -> String {
        format!("https://x/{}", "a".repeat(chars - "https://x/".len()))
    }

    #[test]
    fn test_compose_long_link_drops_text_before_cutting_link() {
        let text = "Some generated post text here";
        for chars in [265, 266] {
            let link = long_link(chars);
            let out = compose_message(text, &link, "Read more:", Some(280));
            assert!(out.chars().count() <= 280, "{chars}-char link overflowed");
            assert_eq!(out, format!("Read more: {link}"));
        }
    }

    #[test]
    fn test_compose_link_at_ceiling_is_sent_alone() {
        let link = long_link(280);
        let out = compose_message("Some generated post text here", &link, "Read more:", Some(280));
        assert_eq!(out, link);
    }

    #[test]
    fn test_compose_keeps_shortest_text_that_fits() {
        let link = long_link(260);
        let out = compose_message("Some generated post text here", &link, "Read more:", Some(280));
        assert_eq!(out.chars().count(), 280);
        assert_eq!(out, format!("Some...\n\nRead more: {link}"));
    }

    #[test]
    fn test_exit_codes() {
        let published = CycleOutcome::Published {
            article_id: "a".to_string(),
            results: Vec::new(),
            history_recorded: true,
        };
        assert_eq!(published.exit_code(), 0);
        assert_eq!(
            CycleOutcome::Skipped {
                article_id: "a".to_string()
            }
            .exit_code(),
            0
        );
        assert_eq!(
            CycleOutcome::AllFailed {
                article_id: "a".to_string(),
                results: Vec::new()
            }
            .exit_code(),
            2
        );
        assert_eq!(
            CycleOutcome::Aborted {
                error: FetchError::FeedEmpty
            }
            .exit_code(),
            1
        );
    }

    #[tokio::test]
    async fn test_already_published_article_is_skipped() {
        let (_dir, mut history) = empty_history().await;
        history.record("a1").await.unwrap();

        let sent = Arc::default();
        let generator = StubGenerator {
            summary: Some("post".to_string()),
            ..Default::default()
        };
        let generator_calls = Arc::clone(&generator.calls);
        let orchestrator = Orchestrator::new(
            StubSource::new(Some(article())),
            generator,
            vec![RecordingPublisher::boxed("fb", FULL, false, &sent)],
            settings(false),
        );

        let outcome = orchestrator
            .run_cycle(Mode::Latest, &mut history, &mut rng())
            .await;
        assert!(matches!(outcome, CycleOutcome::Skipped { ref article_id } if article_id == "a1"));
        assert_eq!(outcome.exit_code(), 0);
        assert!(sent.lock().unwrap().is_empty());
        assert_eq!(*generator_calls.lock().unwrap(), 0);
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_dry_run_end_to_end_with_real_adapters() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let publishers: Vec<Box<dyn Publisher>> = vec![
            Box::new(FacebookPublisher::new(
                client.clone(),
                FacebookConfig {
                    page_id: "1".to_string(),
                    access_token: "t".to_string(),
                    api_base: server.uri(),
                },
            )),
            Box::new(XPublisher::new(
                client.clone(),
                XConfig {
                    access_token: "t".to_string(),
                    api_base: server.uri(),
                },
            )),
            Box::new(TelegramPublisher::new(
                client,
                TelegramConfig {
                    bot_token: "t".to_string(),
                    chat_id: "c".to_string(),
                    api_base: server.uri(),
                },
            )),
        ];

        let mut with_cover = article();
        with_cover.cover_image = Some(Url::parse(&format!("{}/cover.jpg", server.uri())).unwrap());

        let mut settings = settings(true);
        settings.delay = Duration::from_secs(30);
        let orchestrator = Orchestrator::new(
            StubSource::new(Some(with_cover)),
            LlmGenerator::<LlmClient>::unconfigured("English"),
            publishers,
            settings,
        );

        let (dir, mut history) = empty_history().await;
        let started = std::time::Instant::now();
        let outcome = orchestrator
            .run_cycle(Mode::Latest, &mut history, &mut rng())
            .await;
        assert!(started.elapsed() < Duration::from_secs(10), "dry run must not sleep");

        match outcome {
            CycleOutcome::Published {
                article_id,
                results,
                history_recorded,
            } => {
                assert_eq!(article_id, "a1");
                assert!(history_recorded);
                assert_eq!(results.len(), 3);
                assert!(
                    results
                        .iter()
                        .all(|r| r.success && r.provider_id.as_deref() == Some(DRY_RUN_ID))
                );
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(history.contains("a1"));

        let reopened = HistoryStore::open(dir.path().join("history.txt"))
            .await
            .unwrap();
        assert!(reopened.contains("a1"));

        // Same entry again: nothing is published.
        let outcome = orchestrator
            .run_cycle(Mode::Latest, &mut history, &mut rng())
            .await;
        assert!(matches!(outcome, CycleOutcome::Skipped { .. }));
    }

    #[tokio::test]
    async fn test_partial_failure_continues_and_records() {
        let sent = Arc::default();
        let orchestrator = Orchestrator::new(
            StubSource::new(Some(article())),
            StubGenerator {
                summary: Some("Fresh post".to_string()),
                ..Default::default()
            },
            vec![
                RecordingPublisher::boxed("fb", FULL, true, &sent),
                RecordingPublisher::boxed("x", SHORT_TEXT_ONLY, false, &sent),
                RecordingPublisher::boxed("tg", FULL, false, &sent),
            ],
            settings(false),
        );

        let (_dir, mut history) = empty_history().await;
        let outcome = orchestrator
            .run_cycle(Mode::Latest, &mut history, &mut rng())
            .await;

        let CycleOutcome::Published { results, .. } = outcome else {
            panic!("expected Published");
        };
        let flags: Vec<_> = results.iter().map(|r| (r.platform.as_str(), r.success)).collect();
        assert_eq!(flags, vec![("fb", false), ("x", true), ("tg", true)]);
        assert_eq!(results[0].error.as_deref(), Some("fb API returned 500: boom"));
        assert_eq!(sent.lock().unwrap().len(), 3);
        assert!(history.contains("a1"));
    }

    #[tokio::test]
    async fn test_all_failed_does_not_record() {
        let sent = Arc::default();
        let orchestrator = Orchestrator::new(
            StubSource::new(Some(article())),
            StubGenerator {
                summary: Some("Fresh post".to_string()),
                ..Default::default()
            },
            vec![
                RecordingPublisher::boxed("fb", FULL, true, &sent),
                RecordingPublisher::boxed("tg", FULL, true, &sent),
            ],
            settings(false),
        );

        let (_dir, mut history) = empty_history().await;
        let outcome = orchestrator
            .run_cycle(Mode::Latest, &mut history, &mut rng())
            .await;
        assert!(matches!(outcome, CycleOutcome::AllFailed { ref results, .. } if results.len() == 2));
        assert_eq!(outcome.exit_code(), 2);
        assert!(!history.contains("a1"));
    }

    #[tokio::test]
    async fn test_no_platforms_is_all_failed() {
        let orchestrator = Orchestrator::new(
            StubSource::new(Some(article())),
            StubGenerator::default(),
            Vec::new(),
            settings(false),
        );
        let (_dir, mut history) = empty_history().await;
        let outcome = orchestrator
            .run_cycle(Mode::Latest, &mut history, &mut rng())
            .await;
        assert!(matches!(outcome, CycleOutcome::AllFailed { ref results, .. } if results.is_empty()));
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_generation_failure_uses_fallback_message() {
        let sent = Arc::default();
        let orchestrator = Orchestrator::new(
            StubSource::new(Some(article())),
            StubGenerator::default(),
            vec![RecordingPublisher::boxed("fb", FULL, false, &sent)],
            settings(false),
        );

        let (_dir, mut history) = empty_history().await;
        let outcome = orchestrator
            .run_cycle(Mode::Latest, &mut history, &mut rng())
            .await;
        assert_eq!(outcome.exit_code(), 0);

        let sent = sent.lock().unwrap();
        assert_eq!(sent[0].message, "T\n\nhttps://x/a1");
        assert_eq!(sent[0].link.as_deref(), Some("https://x/a1"));
    }

    #[tokio::test]
    async fn test_fetch_failure_aborts() {
        let sent = Arc::default();
        let orchestrator = Orchestrator::new(
            StubSource::new(None),
            StubGenerator::default(),
            vec![RecordingPublisher::boxed("fb", FULL, false, &sent)],
            settings(false),
        );

        let (_dir, mut history) = empty_history().await;
        let outcome = orchestrator
            .run_cycle(Mode::Latest, &mut history, &mut rng())
            .await;
        assert!(matches!(outcome, CycleOutcome::Aborted { error: FetchError::FeedEmpty }));
        assert_eq!(outcome.exit_code(), 1);
        assert!(sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_capabilities_shape_each_send() {
        let sent = Arc::default();
        let mut with_cover = article();
        with_cover.cover_image = Some(Url::parse("https://x/cover.jpg").unwrap());
        let orchestrator = Orchestrator::new(
            StubSource::new(Some(with_cover)),
            StubGenerator {
                summary: Some("A fairly long generated post that will not fit in sixty characters".to_string()),
                ..Default::default()
            },
            vec![
                RecordingPublisher::boxed("fb", FULL, false, &sent),
                RecordingPublisher::boxed("x", SHORT_TEXT_ONLY, false, &sent),
            ],
            settings(false),
        );

        let (_dir, mut history) = empty_history().await;
        orchestrator
            .run_cycle(Mode::Latest, &mut history, &mut rng())
            .await;

        let sent = sent.lock().unwrap();
        let fb = &sent[0];
        assert_eq!(fb.link.as_deref(), Some("https://x/a1"));
        assert_eq!(fb.image.as_deref(), Some("https://x/cover.jpg"));
        assert!(fb.message.ends_with("\n\nRead more: https://x/a1"));
        assert!(!fb.dry_run);

        let x = &sent[1];
        assert_eq!(x.platform, "x");
        assert!(x.link.is_none());
        assert!(x.image.is_none());
        assert!(x.message.chars().count() <= 60);
        assert!(x.message.ends_with("\n\nRead more: https://x/a1"));
    }

    #[tokio::test]
    async fn test_daily_mode_picks_from_batch_per_platform() {
        let batch: Vec<CandidatePost> = ["Tip one", "Fact two", "Quote three"]
            .iter()
            .zip([PostType::Tip, PostType::Fact, PostType::Quote])
            .map(|(text, post_type)| CandidatePost {
                text: text.to_string(),
                hashtags: Vec::new(),
                post_type,
                engagement_score: 5.0,
            })
            .collect();

        let sent = Arc::default();
        let source = StubSource::new(Some(article()));
        let source_calls = Arc::clone(&source.calls);
        let orchestrator = Orchestrator::new(
            source,
            StubGenerator {
                batch: Some(batch.clone()),
                ..Default::default()
            },
            vec![
                RecordingPublisher::boxed("fb", FULL, false, &sent),
                RecordingPublisher::boxed("tg", FULL, false, &sent),
            ],
            settings(false),
        );

        let (_dir, mut history) = empty_history().await;
        let outcome = orchestrator
            .run_cycle(Mode::Daily, &mut history, &mut rng())
            .await;
        assert_eq!(outcome.exit_code(), 0);
        assert_eq!(*source_calls.lock().unwrap(), vec!["random"]);

        for s in sent.lock().unwrap().iter() {
            assert!(batch.iter().any(|c| s.message.starts_with(&c.text)));
        }
    }

    #[tokio::test]
    async fn test_delay_only_between_platforms() {
        let sent = Arc::default();
        let mut settings = settings(false);
        settings.delay = Duration::from_millis(500);
        let orchestrator = Orchestrator::new(
            StubSource::new(Some(article())),
            StubGenerator {
                summary: Some("post".to_string()),
                ..Default::default()
            },
            vec![
                RecordingPublisher::boxed("fb", FULL, false, &sent),
                RecordingPublisher::boxed("tg", FULL, false, &sent),
            ],
            settings,
        );

        let (_dir, mut history) = empty_history().await;
        let started = std::time::Instant::now();
        orchestrator
            .run_cycle(Mode::Latest, &mut history, &mut rng())
            .await;
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(500));
        assert!(elapsed < Duration::from_millis(1000), "no pause after the last platform");
    }
}
