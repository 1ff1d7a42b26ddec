use std::sync::Arc;

use rd_core::{Categorizer, Result, Summarizer, TopicExtractor};

use crate::client::{ChatClient, ChatModel};
use crate::InferenceConfig;

pub mod categorizer;
pub mod summarizer;
pub mod trending;

pub use categorizer::ArticleCategorizer;
pub use summarizer::ArticleSummarizer;
pub use trending::TrendingDetector;

/// The three enrichment stages run on every newly stored article.
#[derive(Clone)]
pub struct Enrichers {
    pub summarizer: Arc<dyn Summarizer>,
    pub categorizer: Arc<dyn Categorizer>,
    pub topics: Arc<dyn TopicExtractor>,
}

impl Enrichers {
    /// Build all three stages over a shared chat model, or none.
    pub fn with_chat(chat: Option<Arc<dyn ChatModel>>) -> Self {
        Self {
            summarizer: Arc::new(ArticleSummarizer::new(chat.clone())),
            categorizer: Arc::new(ArticleCategorizer::new(chat.clone())),
            topics: Arc::new(TrendingDetector::new(chat)),
        }
    }
}

pub fn create_enrichers(config: &InferenceConfig) -> Result<Enrichers> {
    let chat = ChatClient::from_config(config)?.map(|c| Arc::new(c) as Arc<dyn ChatModel>);
    Ok(Enrichers::with_chat(chat))
}


#[cfg(test)]
mod tests {
    use super::*;
    use rd_core::{Article, RawArticle};

    #[tokio::test]
    async fn test_enrichers_without_key_degrade() {
        let enrichers = create_enrichers(&InferenceConfig::default()).unwrap();
        let mut raw = RawArticle::new(
            "Boston Dynamics retires hydraulic Atlas",
            "https://example.com/atlas",
            "IEEE Spectrum",
        );
        raw.excerpt = Some("The humanoid robots era continues".to_string());
        let article = Article::from_raw(1, &raw, chrono::Utc::now());

        assert!(enrichers.summarizer.summarize(&article).await.is_none());
        assert!(enrichers.categorizer.categorize(&article).await.is_empty());
        let topics = enrichers.topics.extract_topics(&article).await;
        assert!(topics.contains(&"Boston Dynamics".to_string()));
        assert!(topics.contains(&"Humanoid Robots".to_string()));
    }
}
