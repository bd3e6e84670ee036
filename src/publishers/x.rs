//! X (Twitter) publisher: `POST {api_base}/2/tweets` with a user-context
//! bearer token. Text only; links belong in the text.

use super::{Capabilities, DRY_RUN_ID, Publisher, ensure_success};
use crate::config::XConfig;
use crate::error::PublishError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

const NAME: &str = "x";

/// Hard length limit of a standard post.
pub const MAX_CHARS: usize = 280;

pub struct XPublisher {
    client: Client,
    config: XConfig,
}

#[derive(Debug, Deserialize)]
struct CreateTweetResponse {
    data: Option<TweetData>,
}

#[derive(Debug, Deserialize)]
struct TweetData {
    id: String,
}

impl XPublisher {
    pub fn new(client: Client, config: XConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl Publisher for XPublisher {
    fn name(&self) -> &'static str {
        NAME
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            link: false,
            image: false,
            max_chars: Some(MAX_CHARS),
        }
    }

    #[instrument(level = "info", skip_all, fields(platform = NAME))]
    async fn send(
        &self,
        message: &str,
        _link: Option<&str>,
        _image_url: Option<&str>,
        dry_run: bool,
    ) -> Result<String, PublishError> {
        if dry_run {
            info!(chars = message.chars().count(), "Dry run; not posting");
            return Ok(DRY_RUN_ID.to_string());
        }

        let url = format!("{}/2/tweets", self.config.api_base.trim_end_matches('/'));
        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.config.access_token)
            .json(&json!({ "text": message }))
            .send()
            .await?;
        let created: CreateTweetResponse = ensure_success(NAME, resp).await?.json().await?;
        let id = created
            .data
            .map(|d| d.id)
            .ok_or_else(|| PublishError::InvalidResponse {
                platform: NAME,
                detail: "response has no data.id".to_string(),
            })?;
        info!(post_id = %id, "Posted");
        Ok(id)
    }
}
