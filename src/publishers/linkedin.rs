//! LinkedIn organization page publisher (UGC Posts API).
//!
//! A post with a link is shared as an `ARTICLE` so LinkedIn renders a link
//! preview; without one it is a plain text share.

use super::{Capabilities, DRY_RUN_ID, Publisher, ensure_success};
use crate::config::LinkedInConfig;
use crate::error::PublishError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{info, instrument};

const NAME: &str = "linkedin";

pub const MAX_CHARS: usize = 3000;

pub struct LinkedInPublisher {
    client: Client,
    config: LinkedInConfig,
}

impl LinkedInPublisher {
    pub fn new(client: Client, config: LinkedInConfig) -> Self {
        Self { client, config }
    }

    fn payload(&self, message: &str, link: Option<&str>) -> Value {
        let mut share = json!({
            "shareCommentary": { "text": message },
            "shareMediaCategory": "NONE",
        });
        if let Some(link) = link {
            share["shareMediaCategory"] = json!("ARTICLE");
            share["media"] = json!([{ "status": "READY", "originalUrl": link }]);
        }

        json!({
            "author": format!("urn:li:organization:{}", self.config.organization_id),
            "lifecycleState": "PUBLISHED",
            "specificContent": { "com.linkedin.ugc.ShareContent": share },
            "visibility": { "com.linkedin.ugc.MemberNetworkVisibility": "PUBLIC" },
        })
    }
}

#[async_trait]
impl Publisher for LinkedInPublisher {
    fn name(&self) -> &'static str {
        NAME
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            link: true,
            image: false,
            max_chars: Some(MAX_CHARS),
        }
    }

    #[instrument(level = "info", skip_all, fields(platform = NAME))]
    async fn send(
        &self,
        message: &str,
        link: Option<&str>,
        _image_url: Option<&str>,
        dry_run: bool,
    ) -> Result<String, PublishError> {
        if dry_run {
            info!(chars = message.chars().count(), "Dry run; not posting");
            return Ok(DRY_RUN_ID.to_string());
        }

        let url = format!("{}/v2/ugcPosts", self.config.api_base.trim_end_matches('/'));
        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.config.access_token)
            .header("X-Restli-Protocol-Version", "2.0.0")
            .json(&self.payload(message, link))
            .send()
            .await?;
        let resp = ensure_success(NAME, resp).await?;

        // The created URN comes back in a header; some API versions also echo it in the body.
        let header_id = resp
            .headers()
            .get("x-restli-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp.text().await?;
        let body_id = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.get("id").and_then(Value::as_str).map(str::to_string));

        let id = body_id
            .or(header_id)
            .ok_or_else(|| PublishError::InvalidResponse {
                platform: NAME,
                detail: "no id in body or x-restli-id header".to_string(),
            })?;
        info!(post_id = %id, "Posted");
        Ok(id)
    }
}
