//! Per-article ingestion: validation, deduplication, persistence and the
//! three enrichment stages.

use std::sync::Arc;

use chrono::Utc;
use rd_core::category::retain_known;
use rd_core::{
    Article, ArticleStore, IngestError, IngestOutcome, InsertOutcome, RawArticle, Result,
};
use rd_inference::Enrichers;

/// Decides whether a URL is already stored.
#[derive(Clone)]
pub struct DedupGate {
    store: Arc<dyn ArticleStore>,
}

impl DedupGate {
    pub fn new(store: Arc<dyn ArticleStore>) -> Self {
        Self { store }
    }

    pub async fn is_duplicate(&self, url: &str) -> Result<bool> {
        Ok(self.store.find_by_url(url.trim()).await?.is_some())
    }
}

#[derive(Clone)]
pub struct ArticleIngestor {
    store: Arc<dyn ArticleStore>,
    gate: DedupGate,
    enrichers: Enrichers,
}

impl ArticleIngestor {
    pub fn new(store: Arc<dyn ArticleStore>, enrichers: Enrichers) -> Self {
        Self {
            gate: DedupGate::new(store.clone()),
            store,
            enrichers,
        }
    }

    pub async fn ingest(&self, raw: &RawArticle) -> IngestOutcome {
        match self.persist(raw).await {
            Ok(article) => {
                tracing::info!("🆕 {} - {}", article.title, article.url);
                self.enrich(&article).await;
                IngestOutcome::New(article.id)
            }
            Err(IngestError::DuplicateUrl(url)) => {
                tracing::debug!("⏭️ Already stored: {}", url);
                IngestOutcome::Duplicate
            }
            Err(e) => {
                tracing::warn!("❌ {}: {}", raw.url, e);
                IngestOutcome::Error(e)
            }
        }
    }

    async fn persist(&self, raw: &RawArticle) -> std::result::Result<Article, IngestError> {
        if let Some(field) = raw.missing_field() {
            return Err(IngestError::MissingField(field));
        }
        if self
            .gate
            .is_duplicate(&raw.url)
            .await
            .map_err(IngestError::persistence)?
        {
            return Err(IngestError::DuplicateUrl(raw.url.clone()));
        }
        match self
            .store
            .insert_article(raw)
            .await
            .map_err(IngestError::persistence)?
        {
            InsertOutcome::Inserted(article) => Ok(article),
            InsertOutcome::AlreadyExists => Err(IngestError::DuplicateUrl(raw.url.clone())),
        }
    }

    /// Summarize, categorize, then extract topics. No stage can fail the
    /// article; storage errors inside a stage are logged per item.
    async fn enrich(&self, article: &Article) {
        let Enrichers {
            summarizer,
            categorizer,
            topics,
        } = &self.enrichers;

        match summarizer.summarize(article).await {
            Some(summary) => {
                if let Err(e) = self.store.insert_summary(article.id, &summary).await {
                    tracing::warn!("Failed to store summary for {}: {}", article.url, e);
                }
            }
            None => tracing::debug!("No summary from {} for {}", summarizer.name(), article.url),
        }

        for (category, confidence) in retain_known(categorizer.categorize(article).await) {
            if let Err(e) = self
                .store
                .attach_category(article.id, category, confidence)
                .await
            {
                tracing::warn!("Failed to attach {} to {}: {}", category, article.url, e);
            }
        }

        let today = Utc::now().date_naive();
        for topic in topics.extract_topics(article).await {
            if let Err(e) = self.store.upsert_trending(&topic, article.id, today).await {
                tracing::warn!("Failed to record topic {} for {}: {}", topic, article.url, e);
            }
        }
    }
}
