//! Enrichment capabilities applied to stored articles.
//!
//! None of these report errors: a back end that is unconfigured, unreachable
//! or answers with garbage yields an empty result, so enrichment can never
//! block ingestion.

use async_trait::async_trait;

use crate::types::{Article, GeneratedSummary};
use crate::CategoryScore;

#[async_trait]
pub trait Summarizer: Send + Sync {
    fn name(&self) -> &str;

    async fn summarize(&self, article: &Article) -> Option<GeneratedSummary>;
}

#[async_trait]
pub trait Categorizer: Send + Sync {
    fn name(&self) -> &str;

    /// Category labels in the back end's order of relevance
    async fn categorize(&self, article: &Article) -> Vec<CategoryScore>;
}

#[async_trait]
pub trait TopicExtractor: Send + Sync {
    fn name(&self) -> &str;

    /// Companies, technologies and application areas mentioned by the article
    async fn extract_topics(&self, article: &Article) -> Vec<String>;
}
