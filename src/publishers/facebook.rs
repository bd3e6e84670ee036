//! Facebook Page publisher (Graph API).
//!
//! Text posts go to `POST {api_base}/{page_id}/feed` as a form with `message`
//! and an optional `link`. Image posts upload the photo to
//! `POST {api_base}/{page_id}/photos` as multipart with a `caption`.

use super::{Capabilities, DRY_RUN_ID, ImageData, Publisher, ensure_success, fetch_image};
use crate::config::FacebookConfig;
use crate::error::PublishError;
use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::Form;
use serde::Deserialize;
use tracing::{info, instrument, warn};

const NAME: &str = "facebook";

pub struct FacebookPublisher {
    client: Client,
    config: FacebookConfig,
}

#[derive(Debug, Deserialize)]
struct GraphResponse {
    id: Option<String>,
    /// Set by `/photos`: the id of the feed story wrapping the photo.
    post_id: Option<String>,
}

impl FacebookPublisher {
    pub fn new(client: Client, config: FacebookConfig) -> Self {
        Self { client, config }
    }

    fn endpoint(&self, edge: &str) -> String {
        format!(
            "{}/{}/{edge}",
            self.config.api_base.trim_end_matches('/'),
            self.config.page_id
        )
    }

    async fn post_feed(&self, message: &str, link: Option<&str>) -> Result<String, PublishError> {
        let mut params = vec![
            ("message", message),
            ("access_token", self.config.access_token.as_str()),
        ];
        if let Some(link) = link {
            params.push(("link", link));
        }

        let resp = self
            .client
            .post(self.endpoint("feed"))
            .form(&params)
            .send()
            .await?;
        let graph: GraphResponse = ensure_success(NAME, resp).await?.json().await?;
        graph.id.ok_or_else(|| PublishError::InvalidResponse {
            platform: NAME,
            detail: "feed response has no id".to_string(),
        })
    }

    async fn post_photo(&self, caption: &str, image: ImageData) -> Result<String, PublishError> {
        let form = Form::new()
            .text("caption", caption.to_string())
            .text("access_token", self.config.access_token.clone())
            .part("source", image.into_part()?);

        let resp = self
            .client
            .post(self.endpoint("photos"))
            .multipart(form)
            .send()
            .await?;
        let graph: GraphResponse = ensure_success(NAME, resp).await?.json().await?;
        graph
            .post_id
            .or(graph.id)
            .ok_or_else(|| PublishError::InvalidResponse {
                platform: NAME,
                detail: "photo response has no id".to_string(),
            })
    }
}

#[async_trait]
impl Publisher for FacebookPublisher {
    fn name(&self) -> &'static str {
        NAME
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            link: true,
            image: true,
            max_chars: None,
        }
    }

    #[instrument(level = "info", skip_all, fields(platform = NAME, page_id = %self.config.page_id))]
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
                    let id = self.post_photo(message, image).await?;
                    info!(post_id = %id, "Posted photo");
                    return Ok(id);
                }
                Err(e) => warn!(error = %e, "Image unavailable; posting text only"),
            }
        }

        let id = self.post_feed(message, link).await?;
        info!(post_id = %id, "Posted to page feed");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{any, body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn publisher(server: &MockServer) -> FacebookPublisher {
        FacebookPublisher::new(
            Client::new(),
            FacebookConfig {
                page_id: "123".to_string(),
                access_token: "page-token".to_string(),
                api_base: server.uri(),
            },
        )
    }

    #[tokio::test]
    async fn test_dry_run_makes_no_requests() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let image = format!("{}/cover.jpg", server.uri());
        let id = publisher(&server)
            .send("hello", Some("https://x/a1"), Some(&image), true)
            .await
            .unwrap();
        assert_eq!(id, DRY_RUN_ID);
    }

    #[tokio::test]
    async fn test_text_post_with_link() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/123/feed"))
            .and(body_string_contains("message=hello"))
            .and(body_string_contains("link=https%3A%2F%2Fx%2Fa1"))
            .and(body_string_contains("access_token=page-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "123_456"})))
            .expect(1)
            .mount(&server)
            .await;

        let id = publisher(&server)
            .send("hello", Some("https://x/a1"), None, false)
            .await
            .unwrap();
        assert_eq!(id, "123_456");
    }

    #[tokio::test]
    async fn test_image_post_drops_link() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cover.jpg"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/jpeg")
                    .set_body_bytes(vec![0xFF, 0xD8, 0xFF]),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/123/photos"))
            .and(body_string_contains("name=\"caption\""))
            .and(body_string_contains("name=\"source\""))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": "photo1", "post_id": "123_789"})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/123/feed"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let image = format!("{}/cover.jpg", server.uri());
        let id = publisher(&server)
            .send("hello", Some("https://x/a1"), Some(&image), false)
            .await
            .unwrap();
        assert_eq!(id, "123_789");
    }

    #[tokio::test]
    async fn test_image_fetch_failure_falls_back_to_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cover.jpg"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/123/photos"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/123/feed"))
            .and(body_string_contains("link=https%3A%2F%2Fx%2Fa1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "123_1"})))
            .expect(1)
            .mount(&server)
            .await;

        let image = format!("{}/cover.jpg", server.uri());
        let id = publisher(&server)
            .send("hello", Some("https://x/a1"), Some(&image), false)
            .await
            .unwrap();
        assert_eq!(id, "123_1");
    }

    #[tokio::test]
    async fn test_api_error_carries_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/123/feed"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid token"))
            .mount(&server)
            .await;

        let err = publisher(&server)
            .send("hello", None, None, false)
            .await
            .unwrap_err();
        match err {
            PublishError::Api {
                platform,
                status,
                body,
            } => {
                assert_eq!(platform, "facebook");
                assert_eq!(status, 400);
                assert_eq!(body, "invalid token");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
