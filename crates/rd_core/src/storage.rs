use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::models::{ArticleDetail, ArticlePage, ArticleQuery, CategoryCount, SourceCount};
use crate::types::{Article, GeneratedSummary, RawArticle, TrendingTopic};
use crate::{Category, Result};

/// Result of a conditional insert keyed on the article URL.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    Inserted(Article),
    /// Another row already holds this URL; nothing was written.
    AlreadyExists,
}

#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Id of the article stored under this URL
    async fn find_by_url(&self, url: &str) -> Result<Option<i64>>;

    /// Store an article unless its URL is already present
    async fn insert_article(&self, article: &RawArticle) -> Result<InsertOutcome>;

    async fn attach_category(&self, article_id: i64, category: Category, confidence: f32) -> Result<()>;

    /// Store the article's summary. A second summary for the same article is ignored.
    async fn insert_summary(&self, article_id: i64, summary: &GeneratedSummary) -> Result<()>;

    /// Count a mention of `topic` by `article_id` on `date`
    async fn upsert_trending(&self, topic: &str, article_id: i64, date: NaiveDate) -> Result<()>;

    async fn get_article(&self, id: i64) -> Result<Option<ArticleDetail>>;

    async fn list_articles(&self, query: &ArticleQuery) -> Result<ArticlePage>;

    /// Topics seen on or after `since`, most mentioned first
    async fn trending_topics(&self, since: NaiveDate, limit: usize) -> Result<Vec<TrendingTopic>>;

    async fn category_counts(&self) -> Result<Vec<CategoryCount>>;

    async fn source_counts(&self) -> Result<Vec<SourceCount>>;

    /// Remove articles scraped before `cutoff`, with their summaries and categories
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}
