//! Article page extraction.
//!
//! Pulls the title, main text and cover image (`og:image`) out of an article
//! page. Main text comes from the first matching container in
//! [`CONTENT_SELECTORS`], then from all `<p>` elements, then from `<body>`.
//! Text inside `script`, `style`, `nav`, `header`, `footer` and `aside` is
//! skipped.

use crate::utils::collapse_whitespace;
use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument};
use url::Url;

/// Extracted text longer than this is cut.
pub const MAX_CONTENT_CHARS: usize = 8000;

const CONTENT_SELECTORS: &[&str] = &[
    "article",
    "[role=\"main\"]",
    ".article-content",
    ".post-content",
    ".entry-content",
    ".content",
    ".main-content",
    ".article-body",
    ".post-body",
    ".story-body",
    "main",
];

const SKIPPED_TAGS: &[&str] = &["script", "style", "nav", "header", "footer", "aside"];

static CONTENT: Lazy<Vec<Selector>> = Lazy::new(|| {
    CONTENT_SELECTORS
        .iter()
        .map(|s| Selector::parse(s).unwrap())
        .collect()
});
static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());
static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").unwrap());
static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());
static OG_TITLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("meta[property=\"og:title\"]").unwrap());
static OG_IMAGE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("meta[property=\"og:image\"]").unwrap());
static IMG: Lazy<Selector> = Lazy::new(|| Selector::parse("img[src]").unwrap());

/// What an article page yields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageExtract {
    pub title: Option<String>,
    /// Plain text, whitespace collapsed, at most [`MAX_CONTENT_CHARS`].
    pub content: String,
    /// `og:image` as written in the page, possibly relative.
    pub image: Option<String>,
}

/// Download `url` and extract it.
#[instrument(level = "info", skip_all, fields(%url))]
pub async fn fetch_page(client: &Client, url: &Url) -> Result<PageExtract, reqwest::Error> {
    let body = client
        .get(url.as_str())
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    let page = extract_page(&body);
    debug!(
        chars = page.content.chars().count(),
        has_image = page.image.is_some(),
        "Extracted article page"
    );
    Ok(page)
}

pub fn extract_page(html: &str) -> PageExtract {
    let document = Html::parse_document(html);

    let title = meta_content(&document, &OG_TITLE).or_else(|| {
        document
            .select(&TITLE)
            .next()
            .map(|t| collapse_whitespace(&t.text().collect::<String>()))
            .filter(|t| !t.is_empty())
    });

    let content = main_text(&document);
    let content: String = content.chars().take(MAX_CONTENT_CHARS).collect();

    PageExtract {
        title,
        content,
        image: meta_content(&document, &OG_IMAGE),
    }
}

/// The `src` of the first `<img>` in an HTML fragment, such as a feed item's
/// content.
pub fn first_image_src(html: &str) -> Option<String> {
    let fragment = Html::parse_fragment(html);
    fragment
        .select(&IMG)
        .filter_map(|img| img.value().attr("src"))
        .map(str::trim)
        .find(|src| !src.is_empty())
        .map(str::to_string)
}

fn meta_content(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .filter_map(|m| m.value().attr("content"))
        .map(str::trim)
        .find(|c| !c.is_empty())
        .map(str::to_string)
}

fn main_text(document: &Html) -> String {
    for selector in CONTENT.iter() {
        if let Some(container) = document.select(selector).next() {
            let text = visible_text(container);
            if !text.is_empty() {
                return text;
            }
        }
    }

    let paragraphs = document
        .select(&PARAGRAPH)
        .map(visible_text)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if !paragraphs.is_empty() {
        return paragraphs;
    }

    document
        .select(&BODY)
        .next()
        .map(visible_text)
        .unwrap_or_default()
}

fn visible_text(root: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| SKIPPED_TAGS.contains(&e.name()))
        });
        if !hidden {
            out.push_str(text);
            out.push(' ');
        }
    }
    collapse_whitespace(&out)
}
