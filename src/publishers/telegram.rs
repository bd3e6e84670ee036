//! Telegram Bot API publisher.
//!
//! With a cover image the message becomes the caption of `sendPhoto`;
//! otherwise it goes out through `sendMessage` with the link appended.
//! Messages are sent as plain text (no `parse_mode`).

use super::{Capabilities, DRY_RUN_ID, ImageData, Publisher, ensure_success, fetch_image};
use crate::config::TelegramConfig;
use crate::error::PublishError;
use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::Form;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

const NAME: &str = "telegram";

/// Photo captions are limited to 1024 characters. Text-only posts through
/// `sendMessage` allow 4096, but the caption limit applies to every post so
/// a message fits whichever method sends it.
pub const MAX_CHARS: usize = 1024;

pub struct TelegramPublisher {
    client: Client,
    config: TelegramConfig,
}

#[derive(Debug, Deserialize)]
struct BotResponse {
    ok: bool,
    description: Option<String>,
    error_code: Option<u16>,
    result: Option<SentMessage>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
}

impl TelegramPublisher {
    pub fn new(client: Client, config: TelegramConfig) -> Self {
        Self { client, config }
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{method}",
            self.config.api_base.trim_end_matches('/'),
            self.config.bot_token
        )
    }

    async fn send_message(&self, text: &str) -> Result<String, PublishError> {
        let resp = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&json!({ "chat_id": self.config.chat_id, "text": text }))
            .send()
            .await?;
        Self::message_id(resp).await
    }

    async fn send_photo(&self, caption: &str, image: ImageData) -> Result<String, PublishError> {
        let form = Form::new()
            .text("chat_id", self.config.chat_id.clone())
            .text("caption", caption.to_string())
            .part("photo", image.into_part()?);
        let resp = self
            .client
            .post(self.method_url("sendPhoto"))
            .multipart(form)
            .send()
            .await?;
        Self::message_id(resp).await
    }

    async fn message_id(resp: reqwest::Response) -> Result<String, PublishError> {
        let status = resp.status().as_u16();
        let reply: BotResponse = ensure_success(NAME, resp).await?.json().await?;
        if !reply.ok {
            return Err(PublishError::Api {
                platform: NAME,
                status: reply.error_code.unwrap_or(status),
                body: reply.description.unwrap_or_default(),
            });
        }
        reply
            .result
            .map(|m| m.message_id.to_string())
            .ok_or_else(|| PublishError::InvalidResponse {
                platform: NAME,
                detail: "ok response without result".to_string(),
            })
    }
}

/// `message` with `link` on its own paragraph, unless it already contains it.
fn with_link(message: &str, link: Option<&str>) -> String {
    match link {
        Some(link) if !message.contains(link) => format!("{message}\n\n{link}"),
        _ => message.to_string(),
    }
}

#[async_trait]
impl Publisher for TelegramPublisher {
    fn name(&self) -> &'static str {
        NAME
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            link: true,
            image: true,
            max_chars: Some(MAX_CHARS),
        }
    }

    #[instrument(level = "info", skip_all, fields(platform = NAME, chat_id = %self.config.chat_id))]
    async fn send(
        &self,
        message: &str,
        link: Option<&str>,
        image_url: Option<&str>,
        dry_run: bool,
    ) -> Result<String, PublishError> {
        if dry_run {
            info!(chars = message.chars().count(), "Dry run; not posting");
            return Ok(DRY_RUN_ID.to_string());
        }

        if let Some(url) = image_url {
            match fetch_image(&self.client, url).await {
                Ok(image) => {
                    let id = self.send_photo(message, image).await?;
                    info!(message_id = %id, "Sent photo");
                    return Ok(id);
                }
                Err(e) => warn!(error = %e, "Image unavailable; sending text only"),
            }
        }

        let id = self.send_message(&with_link(message, link)).await?;
        info!(message_id = %id, "Sent message");
        Ok(id)
    }
}
