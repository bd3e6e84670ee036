//! Social platform publishers.
//!
//! Every platform implements [`Publisher`]: one `send` call posts one message
//! and returns the provider's id for the new post. The orchestrator holds them
//! as `Box<dyn Publisher>` in configuration order.
//!
//! | Platform | Link | Image | Max chars |
//! |----------|------|-------|-----------|
//! | Facebook | yes | yes | - |
//! | X | no | no | 280 |
//! | LinkedIn | yes | no | 3000 |
//! | Telegram | yes | yes | 1024 |
//!
//! Shared rules:
//! - `dry_run` returns [`DRY_RUN_ID`] before any network call
//! - When an image is sent, the link is dropped from the payload
//! - A failed image download degrades to a text post
//! - Adapters never truncate; length is the caller's job
//! - No retries

pub mod facebook;
pub mod linkedin;
pub mod telegram;
pub mod x;

use crate::config::Config;
use crate::error::PublishError;
use async_trait::async_trait;
use reqwest::{Client, Response};
use tracing::{debug, instrument};

/// Provider id returned by every publisher in dry-run mode.
pub const DRY_RUN_ID: &str = "dry_run";

/// What a platform accepts alongside the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub link: bool,
    pub image: bool,
    pub max_chars: Option<usize>,
}

#[async_trait]
pub trait Publisher: Send + Sync {
    fn name(&self) -> &'static str;

    fn capabilities(&self) -> Capabilities;

    /// Post `message`, returning the provider id of the created post.
    async fn send(
        &self,
        message: &str,
        link: Option<&str>,
        image_url: Option<&str>,
        dry_run: bool,
    ) -> Result<String, PublishError>;
}

/// Build a publisher for each configured platform, in publishing order.
pub fn from_config(config: &Config, client: &Client) -> Vec<Box<dyn Publisher>> {
    let mut publishers: Vec<Box<dyn Publisher>> = Vec::new();
    if let Some(fb) = &config.facebook {
        publishers.push(Box::new(facebook::FacebookPublisher::new(
            client.clone(),
            fb.clone(),
        )));
    }
    if let Some(x) = &config.x {
        publishers.push(Box::new(x::XPublisher::new(client.clone(), x.clone())));
    }
    if let Some(li) = &config.linkedin {
        publishers.push(Box::new(linkedin::LinkedInPublisher::new(
            client.clone(),
            li.clone(),
        )));
    }
    if let Some(tg) = &config.telegram {
        publishers.push(Box::new(telegram::TelegramPublisher::new(
            client.clone(),
            tg.clone(),
        )));
    }
    publishers
}

/// A downloaded image ready for a multipart upload.
#[derive(Debug, Clone)]
pub struct ImageData {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub file_name: String,
}

impl ImageData {
    pub fn into_part(self) -> Result<reqwest::multipart::Part, PublishError> {
        let part = reqwest::multipart::Part::bytes(self.bytes)
            .file_name(self.file_name)
            .mime_str(&self.content_type)?;
        Ok(part)
    }
}

/// Download the image at `url`.
///
/// # Errors
///
/// [`PublishError::ImageFetch`] on a network error or a non-2xx status.
#[instrument(level = "debug", skip(client))]
pub async fn fetch_image(client: &Client, url: &str) -> Result<ImageData, PublishError> {
    let fail = |reason: String| PublishError::ImageFetch {
        url: url.to_string(),
        reason,
    };

    let resp = client.get(url).send().await.map_err(|e| fail(e.to_string()))?;
    let status = resp.status();
    if !status.is_success() {
        return Err(fail(format!("status {status}")));
    }

    let content_type = resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
        .filter(|v| v.starts_with("image/"))
        .unwrap_or_else(|| "image/jpeg".to_string());
    let file_name = url
        .split(['?', '#'])
        .next()
        .and_then(|p| p.rsplit('/').next())
        .filter(|name| !name.is_empty())
        .unwrap_or("image.jpg")
        .to_string();
    let bytes = resp.bytes().await.map_err(|e| fail(e.to_string()))?.to_vec();

    debug!(size = bytes.len(), %content_type, "Downloaded image");
    Ok(ImageData {
        bytes,
        content_type,
        file_name,
    })
}

/// Pass 2xx responses through; turn anything else into [`PublishError::Api`].
pub(crate) async fn ensure_success(
    platform: &'static str,
    resp: Response,
) -> Result<Response, PublishError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(PublishError::Api {
        platform,
        status: status.as_u16(),
        body,
    })
}
