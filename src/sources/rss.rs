//! RSS 2.0 / Atom feed source.
//!
//! Feed entries become [`Article`]s:
//!
//! | Field | RSS 2.0 | Atom |
//! |-------|---------|------|
//! | title | `<title>` | `<title>` |
//! | link | `<link>` text | `<link href>` (`rel="alternate"` or no rel) |
//! | content | `<content:encoded>`, else `<description>` | `<content>`, else `<summary>` |
//! | published | `<pubDate>` (RFC 2822) | `<published>`, else `<updated>` (RFC 3339) |
//! | cover image | `<enclosure>`, `<media:content>`, `<media:thumbnail>` | `<link rel="enclosure">` |
//!
//! When no cover image is declared, the first `<img>` in the content is used.
//! Entries without a valid absolute link are skipped.

use super::ArticleSource;
use super::extract::{fetch_page, first_image_src};
use crate::config::FeedConfig;
use crate::error::FetchError;
use crate::models::Article;
use crate::utils::clean_html;
use chrono::{DateTime, FixedOffset};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use rand::{Rng, rng};
use reqwest::Client;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Fetches articles from one feed URL.
#[derive(Debug, Clone)]
pub struct RssSource {
    client: Client,
    feed_url: Url,
    enrich_from_page: bool,
}

impl RssSource {
    pub fn new(client: Client, feed: &FeedConfig) -> Result<Self, FetchError> {
        let feed_url = Url::parse(feed.url.trim())
            .map_err(|e| FetchError::InvalidFeedUrl(format!("{}: {e}", feed.url)))?;
        Ok(Self {
            client,
            feed_url,
            enrich_from_page: feed.enrich_from_page,
        })
    }

    #[instrument(level = "info", skip_all, fields(feed_url = %self.feed_url))]
    async fn fetch_entries(&self) -> Result<Vec<Article>, FetchError> {
        let body = self
            .client
            .get(self.feed_url.as_str())
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let entries = parse_feed(&body)?;
        info!(count = entries.len(), "Parsed feed entries");
        if entries.is_empty() {
            return Err(FetchError::FeedEmpty);
        }
        Ok(entries)
    }

    /// Fill in the cover image and fuller text from the article page.
    async fn enrich(&self, mut article: Article) -> Article {
        if !self.enrich_from_page {
            return article;
        }
        let page = match fetch_page(&self.client, &article.link).await {
            Ok(page) => page,
            Err(e) => {
                warn!(article_id = %article.id, error = %e, "Could not enrich article from its page");
                return article;
            }
        };

        if article.cover_image.is_none() {
            article.cover_image = page
                .image
                .as_deref()
                .and_then(|src| article.link.join(src).ok());
        }
        if page.content.chars().count() > article.content.chars().count() {
            article.content = page.content;
        }
        if article.title.trim().is_empty() {
            if let Some(title) = page.title {
                article.title = title;
            }
        }
        debug!(
            article_id = %article.id,
            has_cover = article.cover_image.is_some(),
            "Enriched article"
        );
        article
    }
}

impl ArticleSource for RssSource {
    async fn fetch_latest(&self) -> Result<Article, FetchError> {
        let entries = self.fetch_entries().await?;
        let article = pick_latest(entries).ok_or(FetchError::FeedEmpty)?;
        info!(article_id = %article.id, title = %article.title, "Selected latest article");
        Ok(self.enrich(article).await)
    }

    async fn fetch_random(&self) -> Result<Article, FetchError> {
        let mut entries = self.fetch_entries().await?;
        let idx = rng().random_range(0..entries.len());
        let article = entries.swap_remove(idx);
        info!(article_id = %article.id, title = %article.title, "Selected random article");
        Ok(self.enrich(article).await)
    }
}

/// The entry with the newest publication date, or the first entry when no
/// entry is dated. Ties go to the earlier entry.
pub fn pick_latest(mut entries: Vec<Article>) -> Option<Article> {
    if entries.is_empty() {
        return None;
    }
    let idx = entries
        .iter()
        .enumerate()
        .filter_map(|(i, a)| a.published.map(|p| (i, p)))
        .max_by(|(ia, a), (ib, b)| a.cmp(b).then(ib.cmp(ia)))
        .map(|(i, _)| i)
        .unwrap_or(0);
    Some(entries.swap_remove(idx))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Encoded,
    Description,
    Content,
    Summary,
    PubDate,
    Published,
    Updated,
}

impl Field {
    fn from_name(name: &[u8]) -> Option<Self> {
        Some(match name {
            b"title" => Field::Title,
            b"link" => Field::Link,
            b"content:encoded" => Field::Encoded,
            b"description" => Field::Description,
            b"content" => Field::Content,
            b"summary" => Field::Summary,
            b"pubDate" => Field::PubDate,
            b"published" => Field::Published,
            b"updated" => Field::Updated,
            _ => return None,
        })
    }
}

#[derive(Debug, Default)]
struct EntryDraft {
    title: String,
    link: Option<String>,
    encoded: Option<String>,
    description: Option<String>,
    content: Option<String>,
    summary: Option<String>,
    pub_date: Option<String>,
    published: Option<String>,
    updated: Option<String>,
    cover: Option<String>,
}

impl EntryDraft {
    fn set(&mut self, field: Field, value: String) {
        let value = value.trim().to_string();
        if value.is_empty() {
            return;
        }
        match field {
            Field::Title => self.title = value,
            Field::Link => {
                self.link.get_or_insert(value);
            }
            Field::Encoded => self.encoded = Some(value),
            Field::Description => self.description = Some(value),
            Field::Content => self.content = Some(value),
            Field::Summary => self.summary = Some(value),
            Field::PubDate => self.pub_date = Some(value),
            Field::Published => self.published = Some(value),
            Field::Updated => self.updated = Some(value),
        }
    }

    /// Handle attribute-carrying elements: Atom links, enclosures, media tags.
    fn apply_attributes(&mut self, e: &BytesStart<'_>) {
        let name = e.name();
        let attr = |key: &str| attribute(e, key);
        let is_image_type = |t: Option<String>| t.is_some_and(|t| t.starts_with("image/"));

        match name.as_ref() {
            b"link" => {
                let Some(href) = attr("href") else { return };
                match attr("rel").as_deref() {
                    None | Some("alternate") => {
                        if attr("rel").is_some() || self.link.is_none() {
                            // An explicit alternate link wins over an earlier bare one.
                            self.link = Some(href);
                        }
                    }
                    Some("enclosure") if is_image_type(attr("type")) => {
                        self.cover.get_or_insert(href);
                    }
                    _ => {}
                }
            }
            b"enclosure" => {
                if let Some(url) = attr("url") {
                    let image = match attr("type") {
                        Some(t) => t.starts_with("image/"),
                        None => looks_like_image(&url),
                    };
                    if image {
                        self.cover.get_or_insert(url);
                    }
                }
            }
            b"media:content" => {
                let image = attr("medium").as_deref() == Some("image")
                    || is_image_type(attr("type"));
                if let (true, Some(url)) = (image, attr("url")) {
                    self.cover.get_or_insert(url);
                }
            }
            b"media:thumbnail" => {
                if let Some(url) = attr("url") {
                    self.cover.get_or_insert(url);
                }
            }
            _ => {}
        }
    }

    fn into_article(self) -> Option<Article> {
        let Some(raw_link) = self.link else {
            warn!(title = %self.title, "Skipping feed entry without a link");
            return None;
        };
        let link = match Url::parse(&raw_link) {
            Ok(link) => link,
            Err(e) => {
                warn!(link = %raw_link, error = %e, "Skipping feed entry with an invalid link");
                return None;
            }
        };

        let html = self
            .encoded
            .or(self.content)
            .or(self.description)
            .or(self.summary)
            .unwrap_or_default();
        let cover_image = self
            .cover
            .or_else(|| first_image_src(&html))
            .and_then(|src| link.join(&src).ok());
        let published = self
            .pub_date
            .as_deref()
            .and_then(|d| DateTime::parse_from_rfc2822(d).ok())
            .or_else(|| {
                self.published
                    .as_deref()
                    .or(self.updated.as_deref())
                    .and_then(|d| DateTime::<FixedOffset>::parse_from_rfc3339(d).ok())
            });

        let mut article = Article::new(clean_html(&self.title), link, clean_html(&html));
        article.cover_image = cover_image;
        article.published = published;
        Some(article)
    }
}

fn attribute(e: &BytesStart<'_>, key: &str) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key.as_bytes())
        .and_then(|a| a.unescape_value().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn looks_like_image(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or(url).to_lowercase();
    [".jpg", ".jpeg", ".png", ".gif", ".webp"]
        .iter()
        .any(|ext| path.ends_with(ext))
}

/// Parse an RSS 2.0 or Atom document into articles, in document order.
///
/// # Errors
///
/// Returns [`FetchError::Parse`] if the XML is malformed.
pub fn parse_feed(xml: &str) -> Result<Vec<Article>, FetchError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut articles = Vec::new();
    let mut draft: Option<EntryDraft> = None;
    let mut field: Option<Field> = None;
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"item" | b"entry" => {
                    draft = Some(EntryDraft::default());
                    field = None;
                }
                name => {
                    if let Some(entry) = draft.as_mut() {
                        entry.apply_attributes(&e);
                        if let Some(f) = Field::from_name(name) {
                            field = Some(f);
                            text.clear();
                        }
                    }
                }
            },
            Ok(Event::Empty(e)) => {
                if let Some(entry) = draft.as_mut() {
                    entry.apply_attributes(&e);
                }
            }
            Ok(Event::Text(e)) => {
                if field.is_some() {
                    let unescaped = e.unescape().unwrap_or_default();
                    text.push_str(&unescaped);
                }
            }
            Ok(Event::CData(e)) => {
                if field.is_some() {
                    text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"item" | b"entry" => {
                    if let Some(article) = draft.take().and_then(EntryDraft::into_article) {
                        articles.push(article);
                    }
                    field = None;
                }
                name => {
                    if let (Some(f), Some(entry)) = (field, draft.as_mut()) {
                        if Field::from_name(name) == Some(f) {
                            entry.set(f, std::mem::take(&mut text));
                            field = None;
                        }
                    }
                }
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(FetchError::Parse(e)),
            _ => {}
        }
    }

    debug!(count = articles.len(), "Feed entries normalized");
    Ok(articles)
}
