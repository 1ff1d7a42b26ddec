use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use rd_core::{Article, ArticleStore, Error, Result, RunReport, Scraper, SourceStats};
use rd_inference::models::trending::batch_extract;
use rd_inference::Enrichers;
use tokio::sync::Mutex;

use crate::fetch::ScraperConfig;
use crate::ingest::ArticleIngestor;
use crate::scrapers::default_scrapers;

type BoxedScraper = Box<dyn Scraper>;

/// Runs the configured sources one after another and ingests what they return.
pub struct ScraperManager {
    ingestor: ArticleIngestor,
    enrichers: Enrichers,
    scrapers: Vec<BoxedScraper>,
    run_lock: Mutex<()>,
}

impl ScraperManager {
    pub fn new(store: Arc<dyn ArticleStore>, enrichers: Enrichers, scrapers: Vec<BoxedScraper>) -> Self {
        Self {
            ingestor: ArticleIngestor::new(store, enrichers.clone()),
            enrichers,
            scrapers,
            run_lock: Mutex::new(()),
        }
    }

    pub fn with_default_sources(
        store: Arc<dyn ArticleStore>,
        enrichers: Enrichers,
        config: &ScraperConfig,
    ) -> Result<Self> {
        Ok(Self::new(store, enrichers, default_scrapers(config)?))
    }

    pub fn scrapers(&self) -> &[BoxedScraper] {
        &self.scrapers
    }

    fn find_scraper(&self, name: &str) -> Result<&dyn Scraper> {
        let wanted = name.trim().to_lowercase();
        self.scrapers
            .iter()
            .find(|s| {
                s.source().to_lowercase() == wanted
                    || s.cli_names().iter().any(|alias| *alias == wanted)
            })
            .map(|s| s.as_ref())
            .ok_or_else(|| Error::Scraping(format!("No scraper found for source: {}", name)))
    }

    /// Scrape and ingest every configured source in order.
    pub async fn run_all(&self, max_articles: usize) -> RunReport {
        let _guard = self.run_lock.lock().await;
        let started = Instant::now();
        let mut report = RunReport::start(Utc::now());
        tracing::info!("🚀 Starting scrape of {} sources", self.scrapers.len());

        for scraper in &self.scrapers {
            self.run_one(scraper.as_ref(), max_articles, &mut report).await;
        }

        report.finish(started.elapsed());
        tracing::info!(
            "✅ Scrape finished in {:.1}s: {} scraped, {} new, {} duplicates, {} errors",
            report.duration_seconds,
            report.total_scraped,
            report.total_new,
            report.total_duplicates,
            report.total_errors
        );
        report
    }

    /// Scrape and ingest a single source, looked up by name or CLI alias.
    pub async fn run_source(&self, name: &str, max_articles: usize) -> Result<RunReport> {
        let scraper = self.find_scraper(name)?;
        let _guard = self.run_lock.lock().await;
        let started = Instant::now();
        let mut report = RunReport::start(Utc::now());
        self.run_one(scraper, max_articles, &mut report).await;
        report.finish(started.elapsed());
        Ok(report)
    }

    async fn run_one(&self, scraper: &dyn Scraper, max_articles: usize, report: &mut RunReport) {
        let source = scraper.source();
        let started = Instant::now();
        tracing::info!("📰 Scraping {}", source);

        let articles = match scraper.scrape(max_articles).await {
            Ok(articles) => articles,
            Err(e) => {
                tracing::error!("❌ {} failed: {}", source, e);
                report.record_failure(source, e.to_string());
                return;
            }
        };

        let mut stats = SourceStats {
            scraped: articles.len(),
            ..Default::default()
        };
        for raw in &articles {
            stats.record(&self.ingestor.ingest(raw).await);
        }

        tracing::info!(
            "✨ {}: {} new, {} duplicates, {} errors ({:.1}s)",
            source,
            stats.new,
            stats.duplicates,
            stats.errors,
            started.elapsed().as_secs_f64()
        );
        report.record_source(source, stats);
    }

    /// Topics the configured extractor finds in one source's current articles,
    /// without storing anything.
    pub async fn preview_topics(&self, name: &str, max_articles: usize) -> Result<Vec<(String, u32)>> {
        let scraper = self.find_scraper(name)?;
        let now = Utc::now();
        let articles: Vec<Article> = scraper
            .scrape(max_articles)
            .await?
            .iter()
            .enumerate()
            .map(|(i, raw)| Article::from_raw(i as i64, raw, now))
            .collect();
        tracing::info!("🔍 Extracting topics from {} {} articles", articles.len(), scraper.source());
        Ok(batch_extract(self.enrichers.topics.as_ref(), &articles).await)
    }

    pub fn list_scrapers(&self) -> Vec<String> {
        self.scrapers
            .iter()
            .map(|scraper| {
                let meta = scraper.source_metadata();
                format!(
                    "{} ({:?}, {}) aliases: {}",
                    meta.name,
                    meta.kind,
                    meta.base_url,
                    scraper.cli_names().join(", ")
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::tests::MockInference;
    use async_trait::async_trait;
    use rd_core::{ArticleQuery, RawArticle, SourceKind, SourceMetadata};
    use rd_storage::InMemoryStorage;
    use std::time::Duration;

    struct MockScraper {
        name: &'static str,
        articles: Vec<RawArticle>,
        fail: bool,
    }

    impl MockScraper {
        fn boxed(name: &'static str, urls: &[&str]) -> BoxedScraper {
            Box::new(Self {
                name,
                articles: urls
                    .iter()
                    .map(|url| RawArticle::new(format!("Story at {}", url), *url, name))
                    .collect(),
                fail: false,
            })
        }

        fn failing(name: &'static str) -> BoxedScraper {
            Box::new(Self {
                name,
                articles: Vec::new(),
                fail: true,
            })
        }
    }

    #[async_trait]
    impl Scraper for MockScraper {
        fn source_metadata(&self) -> SourceMetadata {
            SourceMetadata {
                name: self.name,
                base_url: "https://mock.test",
                kind: SourceKind::Feed,
                rate_limit: Duration::ZERO,
            }
        }

        fn cli_names(&self) -> Vec<&str> {
            vec!["mock"]
        }

        async fn scrape(&self, max_articles: usize) -> Result<Vec<RawArticle>> {
            if self.fail {
                return Err(Error::Scraping("connection reset".to_string()));
            }
            Ok(self.articles.iter().take(max_articles).cloned().collect())
        }
    }

    fn manager(store: Arc<InMemoryStorage>, scrapers: Vec<BoxedScraper>) -> ScraperManager {
        ScraperManager::new(store, MockInference::silent().into_enrichers(), scrapers)
    }

    #[tokio::test]
    async fn test_second_run_only_finds_duplicates() {
        let store = Arc::new(InMemoryStorage::new());
        let manager = manager(
            store.clone(),
            vec![MockScraper::boxed("Alpha", &["https://a.test/1", "https://a.test/2"])],
        );

        let first = manager.run_all(20).await;
        assert_eq!(first.total_new, 2);

        let second = manager.run_all(20).await;
        assert_eq!(second.total_scraped, 2);
        assert_eq!(second.total_new, 0);
        assert_eq!(second.total_duplicates, 2);
        assert_eq!(store.list_articles(&ArticleQuery::default()).await.unwrap().total, 2);
    }

    #[tokio::test]
    async fn test_failing_source_does_not_stop_the_run() {
        let store = Arc::new(InMemoryStorage::new());
        let manager = manager(
            store,
            vec![
                MockScraper::failing("Broken"),
                MockScraper::boxed("Alpha", &["https://a.test/1", "", "https://a.test/1"]),
            ],
        );

        let report = manager.run_all(20).await;
        assert_eq!(
            report.source("Broken").and_then(|o| o.error()),
            Some("Scraping error: connection reset")
        );
        let alpha = report.source("Alpha").and_then(|o| o.stats()).unwrap();
        assert_eq!(
            *alpha,
            SourceStats {
                scraped: 3,
                new: 1,
                duplicates: 1,
                errors: 1
            }
        );
        assert_eq!(report.total_scraped, 3);
        assert_eq!(report.sources[0].0, "Broken");
    }

    #[tokio::test]
    async fn test_run_source_by_alias() {
        let store = Arc::new(InMemoryStorage::new());
        let manager = manager(
            store,
            vec![MockScraper::boxed("Alpha", &["https://a.test/1", "https://a.test/2"])],
        );

        let report = manager.run_source("MOCK", 1).await.unwrap();
        assert_eq!(report.total_new, 1);
        assert!(manager.run_source("nope", 1).await.is_err());
    }

    #[tokio::test]
    async fn test_preview_does_not_store() {
        let store = Arc::new(InMemoryStorage::new());
        let manager = manager(store.clone(), vec![MockScraper::boxed("Alpha", &["https://a.test/1"])]);

        let topics = manager.preview_topics("alpha", 5).await.unwrap();
        assert!(topics.is_empty());
        assert_eq!(store.list_articles(&ArticleQuery::default()).await.unwrap().total, 0);
    }

    #[test]
    fn test_list_scrapers_names_default_sources() {
        let manager = ScraperManager::with_default_sources(
            Arc::new(InMemoryStorage::new()),
            MockInference::silent().into_enrichers(),
            &ScraperConfig::default(),
        )
        .unwrap();
        let listed = manager.list_scrapers();
        assert_eq!(listed.len(), 5);
        assert!(listed[0].starts_with("IEEE Spectrum"));
        assert!(listed[3].contains("techcrunch, tc"));
    }
}
