//! Data models for articles, generated posts and publish results.
//!
//! This module defines the records that flow through a publishing cycle:
//! - [`Article`]: One normalized feed entry, the unit of deduplication
//! - [`CandidatePost`]: A generated message competing for a platform slot
//! - [`SocialPost`]: The single message produced by summarization
//! - [`PublishResult`]: The outcome of one platform send

use chrono::{DateTime, FixedOffset};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Which article a cycle picks and how its text is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Newest feed entry, summarized into one post for every platform.
    Latest,
    /// Random feed entry, turned into a batch of candidates picked per platform.
    Daily,
}

/// A normalized feed entry.
///
/// `id` is derived from the last non-empty path segment of `link` and is the
/// key recorded in the history file.
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub link: Url,
    /// Plain text, HTML already stripped.
    pub content: String,
    pub cover_image: Option<Url>,
    pub published: Option<DateTime<FixedOffset>>,
}

impl Article {
    /// Build an article, deriving its id from the link.
    pub fn new(title: impl Into<String>, link: Url, content: impl Into<String>) -> Self {
        Self {
            id: article_id(&link),
            title: title.into(),
            link,
            content: content.into(),
            cover_image: None,
            published: None,
        }
    }

    /// The message used when content generation fails.
    pub fn fallback_message(&self) -> String {
        format!("{}\n\n{}", self.title, self.link)
    }
}

/// Derive a stable article id from its canonical link.
///
/// Uses the last non-empty path segment (`https://x/blog/a1/` -> `a1`). A link
/// without any path segment falls back to the whole URL.
pub fn article_id(link: &Url) -> String {
    link.path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(str::to_string)
        .unwrap_or_else(|| link.to_string())
}

/// The kind of content a generated post carries.
///
/// LLM output is free-form, so parsing never fails: known tags are normalized
/// and anything else is kept in [`PostType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PostType {
    Tip,
    Statistic,
    Quote,
    Fact,
    DidYouKnow,
    AmazingFact,
    Definition,
    Insight,
    KeyTakeaway,
    General,
    Other(String),
}

impl PostType {
    /// Selection bonus for post types that tend to perform well.
    pub fn bonus(&self) -> f64 {
        match self {
            PostType::DidYouKnow | PostType::AmazingFact => 1.0,
            PostType::Definition => 0.5,
            _ => 0.0,
        }
    }
}

impl From<&str> for PostType {
    fn from(raw: &str) -> Self {
        let normalized = raw
            .trim()
            .to_lowercase()
            .replace([' ', '-'], "_");
        match normalized.as_str() {
            "" | "general" => PostType::General,
            "tip" => PostType::Tip,
            "statistic" => PostType::Statistic,
            "quote" => PostType::Quote,
            "fact" => PostType::Fact,
            "insight" => PostType::Insight,
            "key_takeaway" => PostType::KeyTakeaway,
            s if s.contains("did_you_know") => PostType::DidYouKnow,
            s if s.contains("amazing_fact") => PostType::AmazingFact,
            s if s.contains("definition") => PostType::Definition,
            _ => PostType::Other(normalized),
        }
    }
}

impl From<String> for PostType {
    fn from(raw: String) -> Self {
        PostType::from(raw.as_str())
    }
}

impl From<PostType> for String {
    fn from(t: PostType) -> Self {
        t.to_string()
    }
}

impl fmt::Display for PostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PostType::Tip => "tip",
            PostType::Statistic => "statistic",
            PostType::Quote => "quote",
            PostType::Fact => "fact",
            PostType::DidYouKnow => "did_you_know",
            PostType::AmazingFact => "amazing_fact",
            PostType::Definition => "definition",
            PostType::Insight => "insight",
            PostType::KeyTakeaway => "key_takeaway",
            PostType::General => "general",
            PostType::Other(s) => s.as_str(),
        };
        f.write_str(s)
    }
}

fn default_engagement_score() -> f64 {
    5.0
}

/// A generated message competing to be posted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidatePost {
    pub text: String,
    #[serde(default)]
    pub hashtags: Vec<String>,
    #[serde(rename = "type", default = "general_type")]
    pub post_type: PostType,
    /// Heuristic score in `[1.0, 10.0]`.
    #[serde(default = "default_engagement_score")]
    pub engagement_score: f64,
}

fn general_type() -> PostType {
    PostType::General
}

impl CandidatePost {
    /// The plain `title + link` message used when generation fails.
    pub fn fallback(article: &Article) -> Self {
        Self {
            text: article.fallback_message(),
            hashtags: Vec::new(),
            post_type: PostType::General,
            engagement_score: default_engagement_score(),
        }
    }
}

/// The single message produced by summarizing an article.
#[derive(Debug, Clone, PartialEq)]
pub struct SocialPost {
    pub social_post: String,
    pub hashtags: Vec<String>,
}

impl From<SocialPost> for CandidatePost {
    fn from(post: SocialPost) -> Self {
        CandidatePost {
            text: post.social_post,
            hashtags: post.hashtags,
            post_type: PostType::General,
            engagement_score: default_engagement_score(),
        }
    }
}

/// The outcome of sending one message to one platform.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishResult {
    pub platform: String,
    pub success: bool,
    pub provider_id: Option<String>,
    pub error: Option<String>,
}

impl PublishResult {
    pub fn ok(platform: &str, provider_id: String) -> Self {
        Self {
            platform: platform.to_string(),
            success: true,
            provider_id: Some(provider_id),
            error: None,
        }
    }

    pub fn failed(platform: &str, error: String) -> Self {
        Self {
            platform: platform.to_string(),
            success: false,
            provider_id: None,
            error: Some(error),
        }
    }
}
