//! Error types for every stage of a publishing cycle.
//!
//! The stages recover differently:
//! - [`FetchError`] aborts the cycle
//! - [`GenerationError`] is replaced by a fallback message
//! - [`PublishError`] is isolated to the platform that raised it
//! - [`HistoryError`] on write is logged and the cycle continues
//! - [`ConfigError`] stops the binary before a cycle starts

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("feed unavailable: {0}")]
    FeedUnavailable(#[from] reqwest::Error),

    #[error("feed contains no usable entries")]
    FeedEmpty,

    #[error("invalid feed URL: {0}")]
    InvalidFeedUrl(String),

    #[error("feed XML parse error: {0}")]
    Parse(#[from] quick_xml::Error),
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("LLM request failed: {0}")]
    Llm(String),

    #[error("LLM response could not be parsed: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned no posts")]
    Empty,

    #[error("content generator is not configured")]
    Unavailable,
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{platform} API returned {status}: {body}")]
    Api {
        platform: &'static str,
        status: u16,
        body: String,
    },

    #[error("could not fetch image {url}: {reason}")]
    ImageFetch { url: String, reason: String },

    #[error("unexpected {platform} response: {detail}")]
    InvalidResponse {
        platform: &'static str,
        detail: String,
    },
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("could not read history file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not write history file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
