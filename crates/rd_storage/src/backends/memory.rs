use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rd_core::{
    Article, ArticleDetail, ArticlePage, ArticleQuery, ArticleStore, Category, CategoryAssignment,
    CategoryCount, Error, GeneratedSummary, InsertOutcome, RawArticle, Result, SourceCount,
    Summary, TrendingTopic,
};
use tokio::sync::RwLock;

use crate::StorageBackend;

#[derive(Debug, Default)]
pub struct MemoryStore {
    articles: Vec<Article>,
    summaries: Vec<Summary>,
    categories: Vec<CategoryAssignment>,
    trending: Vec<TrendingTopic>,
    last_id: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn ensure_article(&self, article_id: i64) -> Result<()> {
        if self.articles.iter().any(|a| a.id == article_id) {
            Ok(())
        } else {
            Err(Error::Storage(format!("No article with id {}", article_id)))
        }
    }

    pub fn find_by_url(&self, url: &str) -> Option<i64> {
        self.articles.iter().find(|a| a.url == url).map(|a| a.id)
    }

    pub fn insert_article(&mut self, raw: &RawArticle) -> InsertOutcome {
        if self.find_by_url(raw.url.trim()).is_some() {
            return InsertOutcome::AlreadyExists;
        }
        let id = self.next_id();
        let article = Article::from_raw(id, raw, Utc::now());
        self.articles.push(article.clone());
        InsertOutcome::Inserted(article)
    }

    pub fn attach_category(&mut self, article_id: i64, category: Category, confidence: f32) -> Result<()> {
        self.ensure_article(article_id)?;
        let confidence = confidence.clamp(0.0, 1.0);
        match self
            .categories
            .iter_mut()
            .find(|c| c.article_id == article_id && c.category == category)
        {
            Some(existing) => existing.confidence = confidence,
            None => self.categories.push(CategoryAssignment {
                article_id,
                category,
                confidence,
            }),
        }
        Ok(())
    }

    pub fn insert_summary(&mut self, article_id: i64, summary: &GeneratedSummary) -> Result<()> {
        self.ensure_article(article_id)?;
        if self.summaries.iter().any(|s| s.article_id == article_id) {
            return Ok(());
        }
        let id = self.next_id();
        self.summaries.push(Summary {
            id,
            article_id,
            summary: summary.text.clone(),
            key_insights: summary.key_insights.clone(),
            generated_date: Utc::now(),
            model_used: summary.model_used.clone(),
        });
        Ok(())
    }

    pub fn upsert_trending(&mut self, topic: &str, article_id: i64, date: NaiveDate) {
        if let Some(existing) = self
            .trending
            .iter_mut()
            .find(|t| t.topic_name == topic && t.date == date)
        {
            existing.record_mention(article_id);
            return;
        }
        let id = self.next_id();
        self.trending.push(TrendingTopic {
            id,
            topic_name: topic.to_string(),
            mention_count: 1,
            date,
            related_articles: vec![article_id],
        });
    }

    fn detail(&self, article: &Article) -> ArticleDetail {
        ArticleDetail {
            article: article.clone(),
            categories: self
                .categories
                .iter()
                .filter(|c| c.article_id == article.id)
                .map(|c| c.category)
                .collect(),
            summary: self
                .summaries
                .iter()
                .find(|s| s.article_id == article.id)
                .cloned(),
        }
    }

    pub fn get_article(&self, id: i64) -> Option<ArticleDetail> {
        self.articles
            .iter()
            .find(|a| a.id == id)
            .map(|a| self.detail(a))
    }

    fn matches(&self, article: &Article, query: &ArticleQuery) -> bool {
        if let Some(category) = &query.category {
            let filed = self
                .categories
                .iter()
                .any(|c| c.article_id == article.id && c.category.name() == category);
            if !filed {
                return false;
            }
        }
        if let Some(source) = &query.source {
            if &article.source != source {
                return false;
            }
        }
        if query.date_from.is_some() || query.date_to.is_some() {
            let Some(published) = article.published_date else {
                return false;
            };
            if query.date_from.is_some_and(|from| published < from)
                || query.date_to.is_some_and(|to| published > to)
            {
                return false;
            }
        }
        if let Some(term) = query.search_term() {
            let term = term.to_lowercase();
            let summary = self
                .summaries
                .iter()
                .find(|s| s.article_id == article.id)
                .map(|s| s.summary.as_str());
            let hit = [Some(article.title.as_str()), article.excerpt.as_deref(), summary]
                .into_iter()
                .flatten()
                .any(|text| text.to_lowercase().contains(&term));
            if !hit {
                return false;
            }
        }
        true
    }

    pub fn list_articles(&self, query: &ArticleQuery) -> ArticlePage {
        let mut matching: Vec<&Article> = self
            .articles
            .iter()
            .filter(|a| self.matches(a, query))
            .collect();
        // Newest first; undated articles last.
        matching.sort_by(|a, b| {
            b.published_date
                .is_some()
                .cmp(&a.published_date.is_some())
                .then(b.published_date.cmp(&a.published_date))
                .then(b.id.cmp(&a.id))
        });

        let total = matching.len() as u64;
        let articles = matching
            .into_iter()
            .skip(usize::try_from(query.offset()).unwrap_or(usize::MAX))
            .take(query.limit() as usize)
            .map(|a| self.detail(a))
            .collect();
        ArticlePage::new(articles, total, query)
    }

    pub fn trending_topics(&self, since: NaiveDate, limit: usize) -> Vec<TrendingTopic> {
        let mut topics: Vec<TrendingTopic> = self
            .trending
            .iter()
            .filter(|t| t.date >= since)
            .cloned()
            .collect();
        topics.sort_by(|a, b| {
            b.mention_count
                .cmp(&a.mention_count)
                .then_with(|| a.topic_name.cmp(&b.topic_name))
        });
        topics.truncate(limit);
        topics
    }

    pub fn category_counts(&self) -> Vec<CategoryCount> {
        Category::ALL
            .into_iter()
            .map(|category| CategoryCount {
                category,
                description: category.description().to_string(),
                article_count: self
                    .categories
                    .iter()
                    .filter(|c| c.category == category)
                    .count() as u64,
            })
            .collect()
    }

    pub fn source_counts(&self) -> Vec<SourceCount> {
        let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
        for article in &self.articles {
            *counts.entry(article.source.as_str()).or_insert(0) += 1;
        }
        counts
            .into_iter()
            .map(|(source, article_count)| SourceCount {
                source: source.to_string(),
                article_count,
            })
            .collect()
    }

    pub fn delete_older_than(&mut self, cutoff: DateTime<Utc>) -> u64 {
        let stale: Vec<i64> = self
            .articles
            .iter()
            .filter(|a| a.scraped_date < cutoff)
            .map(|a| a.id)
            .collect();
        self.articles.retain(|a| !stale.contains(&a.id));
        self.summaries.retain(|s| !stale.contains(&s.article_id));
        self.categories.retain(|c| !stale.contains(&c.article_id));
        stale.len() as u64
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryStorage {
    store: Arc<RwLock<MemoryStore>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageBackend for InMemoryStorage {
    fn get_error_message() -> &'static str {
        "Memory storage should be available"
    }

    async fn open(_url: Option<&str>) -> Result<Self> {
        Ok(Self::new())
    }
}

#[async_trait]
impl ArticleStore for InMemoryStorage {
    async fn find_by_url(&self, url: &str) -> Result<Option<i64>> {
        Ok(self.store.read().await.find_by_url(url))
    }

    async fn insert_article(&self, article: &RawArticle) -> Result<InsertOutcome> {
        Ok(self.store.write().await.insert_article(article))
    }

    async fn attach_category(&self, article_id: i64, category: Category, confidence: f32) -> Result<()> {
        self.store
            .write()
            .await
            .attach_category(article_id, category, confidence)
    }

    async fn insert_summary(&self, article_id: i64, summary: &GeneratedSummary) -> Result<()> {
        self.store.write().await.insert_summary(article_id, summary)
    }

    async fn upsert_trending(&self, topic: &str, article_id: i64, date: NaiveDate) -> Result<()> {
        self.store.write().await.upsert_trending(topic, article_id, date);
        Ok(())
    }

    async fn get_article(&self, id: i64) -> Result<Option<ArticleDetail>> {
        Ok(self.store.read().await.get_article(id))
    }

    async fn list_articles(&self, query: &ArticleQuery) -> Result<ArticlePage> {
        Ok(self.store.read().await.list_articles(query))
    }

    async fn trending_topics(&self, since: NaiveDate, limit: usize) -> Result<Vec<TrendingTopic>> {
        Ok(self.store.read().await.trending_topics(since, limit))
    }

    async fn category_counts(&self) -> Result<Vec<CategoryCount>> {
        Ok(self.store.read().await.category_counts())
    }

    async fn source_counts(&self) -> Result<Vec<SourceCount>> {
        Ok(self.store.read().await.source_counts())
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        Ok(self.store.write().await.delete_older_than(cutoff))
    }
}
