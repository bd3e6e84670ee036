//! Turns an article into social-media text.
//!
//! Two request shapes are supported:
//! - [`ContentGenerator::summarize`]: one ready-to-post message
//! - [`ContentGenerator::generate_daily_batch`]: several typed candidates,
//!   each scored with [`engagement_score`] so the selector can rank them
//!
//! Requests go through [`AskAsync`], normally a [`crate::api::RetryAsk`] over
//! `awful_aj`. The chat template supplies the system prompt; the request text
//! built here carries the article and the output requirements.

use crate::api::AskAsync;
use crate::error::GenerationError;
use crate::models::{Article, CandidatePost, PostType, SocialPost};
use crate::utils::{extract_hashtags, looks_truncated, truncate_for_log};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

/// Article text beyond this many chars is not sent to the LLM.
const MAX_PROMPT_CONTENT_CHARS: usize = 8000;

static EMOJI_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\x{1F600}-\x{1F64F}\x{1F300}-\x{1F5FF}\x{1F680}-\x{1F6FF}\x{1F1E0}-\x{1F1FF}]")
        .unwrap()
});

static POST_BLOCK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)POST\s*\d+\s*:").unwrap());

const CALL_TO_ACTION_WORDS: &[&str] = &[
    "share", "comment", "discover", "learn", "get", "try", "read", "شارك", "علق", "اكتشف",
    "تعلم", "احصل", "جرب",
];

pub trait ContentGenerator {
    /// Produce one post for `article`, at most `max_length` chars.
    async fn summarize(
        &self,
        article: &Article,
        max_length: usize,
        include_hashtags: bool,
        dry_run: bool,
    ) -> Result<SocialPost, GenerationError>;

    /// Produce up to `num_posts` candidate posts for `article`.
    async fn generate_daily_batch(
        &self,
        article: &Article,
        num_posts: usize,
        dry_run: bool,
    ) -> Result<Vec<CandidatePost>, GenerationError>;
}

/// [`ContentGenerator`] backed by an LLM.
///
/// An unconfigured generator (no LLM clients) fails every live request with
/// [`GenerationError::Unavailable`], which the orchestrator answers with the
/// fallback message. Dry-run requests never reach the LLM.
#[derive(Debug)]
pub struct LlmGenerator<A> {
    summary: Option<A>,
    daily: Option<A>,
    language: String,
}

impl<A> LlmGenerator<A> {
    pub fn new(summary: A, daily: A, language: impl Into<String>) -> Self {
        Self {
            summary: Some(summary),
            daily: Some(daily),
            language: language.into(),
        }
    }

    pub fn unconfigured(language: impl Into<String>) -> Self {
        Self {
            summary: None,
            daily: None,
            language: language.into(),
        }
    }
}

impl<A> ContentGenerator for LlmGenerator<A>
where
    A: AskAsync<Response = String>,
{
    #[instrument(level = "info", skip_all, fields(article_id = %article.id, dry_run = dry_run))]
    async fn summarize(
        &self,
        article: &Article,
        max_length: usize,
        include_hashtags: bool,
        dry_run: bool,
    ) -> Result<SocialPost, GenerationError> {
        if dry_run {
            return Ok(dry_run_summary(article));
        }
        let client = self.summary.as_ref().ok_or(GenerationError::Unavailable)?;

        let request = summary_request(article, max_length, include_hashtags, &self.language);
        let response = client
            .ask(&request)
            .await
            .map_err(|e| GenerationError::Llm(e.to_string()))?;

        let social_post = response.trim().trim_matches('"').trim().to_string();
        if social_post.is_empty() {
            return Err(GenerationError::Empty);
        }
        let hashtags = if include_hashtags {
            extract_hashtags(&social_post)
        } else {
            Vec::new()
        };
        info!(chars = social_post.chars().count(), "Generated social post");
        Ok(SocialPost {
            social_post,
            hashtags,
        })
    }

    #[instrument(level = "info", skip_all, fields(article_id = %article.id, num_posts = num_posts, dry_run = dry_run))]
    async fn generate_daily_batch(
        &self,
        article: &Article,
        num_posts: usize,
        dry_run: bool,
    ) -> Result<Vec<CandidatePost>, GenerationError> {
        if dry_run {
            let mut posts = dry_run_batch(article);
            posts.truncate(num_posts);
            return Ok(posts);
        }
        let client = self.daily.as_ref().ok_or(GenerationError::Unavailable)?;

        let request = daily_request(article, num_posts, &self.language);
        let request = request.as_str();
        let ask = move || async move {
            client
                .ask(request)
                .await
                .map_err(|e| GenerationError::Llm(e.to_string()))
        };

        let response = ask().await?;
        let mut parsed = parse_daily_response(&response);

        // A response cut off mid-JSON is usually a token limit; ask once more.
        let truncated = matches!(&parsed, Err(GenerationError::Parse(e)) if looks_truncated(e));
        if truncated {
            warn!("EOF while parsing daily posts; re-asking once");
            let retry = ask().await?;
            parsed = parse_daily_response(&retry);
        }

        let mut posts = parsed.inspect_err(|e| {
            warn!(
                error = %e,
                response_preview = %truncate_for_log(&response, 300),
                "Model returned unusable daily posts"
            )
        })?;
        posts.truncate(num_posts);
        if posts.is_empty() {
            return Err(GenerationError::Empty);
        }
        info!(count = posts.len(), "Generated daily posts");
        Ok(posts)
    }
}

/// Heuristic engagement score in `[1.0, 10.0]`.
///
/// Starts at 5.0 and rewards emojis, hashtags, questions and calls to action;
/// posts over 280 chars lose a point.
pub fn engagement_score(post: &str) -> f64 {
    let mut score = 5.0;

    let emojis = EMOJI_RE.find_iter(post).count() as f64;
    score += (emojis * 0.5).min(2.0);

    let hashtags = extract_hashtags(post).len() as f64;
    score += (hashtags * 0.3).min(1.5);

    if post.contains('?') || post.contains('؟') {
        score += 1.0;
    }

    let lower = post.to_lowercase();
    if CALL_TO_ACTION_WORDS.iter().any(|w| lower.contains(w)) {
        score += 0.5;
    }

    if post.chars().count() > 280 {
        score -= 1.0;
    }

    f64::clamp(score, 1.0, 10.0)
}

fn prompt_content(article: &Article) -> String {
    article.content.chars().take(MAX_PROMPT_CONTENT_CHARS).collect()
}

fn summary_request(
    article: &Article,
    max_length: usize,
    include_hashtags: bool,
    language: &str,
) -> String {
    let hashtag_instruction = if include_hashtags {
        format!("Include 2-3 relevant {language} hashtags.")
    } else {
        "Do not include hashtags.".to_string()
    };
    format!(
        "Create an engaging social media post based on this article.\n\n\
         Title: {title}\n\
         Content: {content}\n\
         Article URL: {link}\n\n\
         Requirements:\n\
         - Write in {language}\n\
         - Keep it under {max_length} characters\n\
         - Start with an engaging hook and end with a clear call to action\n\
         - Use 3-6 relevant emojis\n\
         - Include the article URL at the end (plain URL, not markdown)\n\
         - {hashtag_instruction}\n\n\
         Reply with the post only.",
        title = article.title,
        content = prompt_content(article),
        link = article.link,
    )
}

fn daily_request(article: &Article, num_posts: usize, language: &str) -> String {
    format!(
        "Based on this article, create {num_posts} bite-sized social media posts that \
         will increase engagement.\n\n\
         Title: {title}\n\
         Content: {content}\n\n\
         For each post:\n\
         - Write in {language}\n\
         - Keep it under 200 characters\n\
         - Include relevant emojis and 2-3 {language} hashtags\n\
         - Cover a different angle: tip, statistic, quote, fact, did_you_know, amazing_fact, \
           definition or insight\n\n\
         Reply with JSON only, in this shape:\n\
         {{\"posts\": [{{\"post\": \"...\", \"type\": \"tip\"}}]}}",
        title = article.title,
        content = prompt_content(article),
    )
}

#[derive(Debug, Deserialize)]
struct RawPost {
    #[serde(alias = "text", alias = "content")]
    post: String,
    #[serde(rename = "type", default)]
    post_type: Option<String>,
}

impl RawPost {
    fn into_candidate(self) -> Option<CandidatePost> {
        let text = self.post.trim().to_string();
        if text.is_empty() {
            return None;
        }
        Some(CandidatePost {
            hashtags: extract_hashtags(&text),
            engagement_score: engagement_score(&text),
            post_type: self
                .post_type
                .as_deref()
                .map(PostType::from)
                .unwrap_or(PostType::General),
            text,
        })
    }
}

/// Parse the daily-batch response.
///
/// Accepts `{"posts": [...]}` or a bare array, optionally inside a code
/// fence. Responses that are not JSON at all are read in the
/// `POST n: ... TYPE: ...` plain-text layout.
fn parse_daily_response(raw: &str) -> Result<Vec<CandidatePost>, GenerationError> {
    let body = strip_code_fence(raw);
    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(e) if looks_truncated(&e) => return Err(GenerationError::Parse(e)),
        Err(e) => {
            let posts = parse_plain_text_posts(body);
            if posts.is_empty() {
                return Err(GenerationError::Parse(e));
            }
            debug!(count = posts.len(), "Parsed daily posts from plain-text layout");
            return Ok(posts);
        }
    };

    let list = match value {
        Value::Object(mut map) => map.remove("posts").unwrap_or(Value::Null),
        other => other,
    };
    let raw_posts: Vec<RawPost> = serde_json::from_value(list)?;
    Ok(raw_posts
        .into_iter()
        .filter_map(RawPost::into_candidate)
        .collect())
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (`json`) on the opening fence line.
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    rest.trim_end().trim_end_matches("```").trim()
}

fn parse_plain_text_posts(body: &str) -> Vec<CandidatePost> {
    POST_BLOCK_RE
        .split(body)
        .skip(1)
        .filter_map(|block| {
            let mut text = String::new();
            let mut post_type = None;
            for line in block.lines().map(str::trim).filter(|l| !l.is_empty()) {
                match line.strip_prefix("TYPE:") {
                    Some(t) => post_type = Some(t.trim().to_string()),
                    None => {
                        if !text.is_empty() {
                            text.push(' ');
                        }
                        text.push_str(line);
                    }
                }
            }
            RawPost {
                post: text,
                post_type,
            }
            .into_candidate()
        })
        .collect()
}

fn dry_run_summary(article: &Article) -> SocialPost {
    let social_post = format!(
        "🔥 {title}\n\nDiscover the key insights: {link} #News #AI",
        title = article.title,
        link = article.link
    );
    SocialPost {
        hashtags: extract_hashtags(&social_post),
        social_post,
    }
}

fn dry_run_batch(article: &Article) -> Vec<CandidatePost> {
    [
        ("💡 Tip from \"{title}\": start small and iterate. #Tips #Tech", "tip"),
        ("📊 A number worth knowing from \"{title}\". #Stats", "statistic"),
        ("🤔 Did you know? \"{title}\" explains why. #DidYouKnow #Learn", "did_you_know"),
    ]
    .into_iter()
    .filter_map(|(template, post_type)| {
        RawPost {
            post: template.replace("{title}", &article.title),
            post_type: Some(post_type.to_string()),
        }
        .into_candidate()
    })
    .collect()
}
