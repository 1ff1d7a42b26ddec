use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Article, Category, Summary};

pub const DEFAULT_PAGE_LIMIT: u32 = 20;
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Filters and paging for article listings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArticleQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub category: Option<String>,
    pub source: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    /// Matched against title, excerpt and summary text.
    #[serde(rename = "q")]
    pub search: Option<String>,
}

impl ArticleQuery {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> u32 {
        self.limit
            .unwrap_or(DEFAULT_PAGE_LIMIT)
            .clamp(1, MAX_PAGE_LIMIT)
    }

    /// Rows skipped before this page.
    pub fn offset(&self) -> u64 {
        (self.page() as u64 - 1) * self.limit() as u64
    }

    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleDetail {
    #[serde(flatten)]
    pub article: Article,
    pub categories: Vec<Category>,
    pub summary: Option<Summary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticlePage {
    pub articles: Vec<ArticleDetail>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
}

impl ArticlePage {
    pub fn new(articles: Vec<ArticleDetail>, total: u64, query: &ArticleQuery) -> Self {
        let limit = query.limit();
        Self {
            articles,
            total,
            page: query.page(),
            limit,
            total_pages: total.div_ceil(limit as u64),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: Category,
    pub description: String,
    pub article_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceCount {
    pub source: String,
    pub article_count: u64,
}
