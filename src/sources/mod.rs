//! Article sources: where a cycle gets the article it publishes.
//!
//! [`rss::RssSource`] is the production source. It runs in two phases:
//!
//! 1. **Feed**: Download the RSS/Atom feed and normalize its entries
//! 2. **Enrichment** (optional): Fetch the chosen article's page with
//!    [`extract`] for a cover image and fuller text
//!
//! Enrichment failures are logged and the feed's own data is used.

pub mod extract;
pub mod rss;

use crate::error::FetchError;
use crate::models::Article;

pub trait ArticleSource {
    /// The newest entry of the feed.
    async fn fetch_latest(&self) -> Result<Article, FetchError>;

    /// A uniformly random entry of the feed.
    async fn fetch_random(&self) -> Result<Article, FetchError>;
}
