use std::time::Duration;

use async_trait::async_trait;

use crate::types::RawArticle;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Feed,
    Listing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceMetadata {
    pub name: &'static str,
    pub base_url: &'static str,
    pub kind: SourceKind,
    /// Minimum pause before every request to this source
    pub rate_limit: Duration,
}

#[async_trait]
pub trait Scraper: Send + Sync {
    fn source_metadata(&self) -> SourceMetadata;

    /// Returns the name of the news source
    fn source(&self) -> &'static str {
        self.source_metadata().name
    }

    /// Returns a list of CLI shorthand names for this scraper
    fn cli_names(&self) -> Vec<&str> {
        vec![]
    }

    /// Fetch up to `max_articles` of the newest articles.
    ///
    /// Empty feeds, timeouts and HTTP errors produce an empty list; `Err` is
    /// reserved for faults the scraper cannot account for.
    async fn scrape(&self, max_articles: usize) -> Result<Vec<RawArticle>>;
}
