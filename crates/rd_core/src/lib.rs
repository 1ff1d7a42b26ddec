pub mod category;
pub mod error;
pub mod inference;
pub mod models;
pub mod report;
pub mod scraper;
pub mod storage;
pub mod types;

pub use category::{Category, CategoryScore, MAX_CATEGORIES_PER_ARTICLE};
pub use error::{Error, IngestError};
pub use inference::{Categorizer, Summarizer, TopicExtractor};
pub use models::{ArticleDetail, ArticlePage, ArticleQuery, CategoryCount, SourceCount};
pub use report::{RunReport, SourceOutcome, SourceStats};
pub use scraper::{Scraper, SourceKind, SourceMetadata};
pub use storage::{ArticleStore, InsertOutcome};
pub use types::{
    estimate_read_time, Article, CategoryAssignment, GeneratedSummary, IngestOutcome,
    KeyInsights, RawArticle, Summary, TrendingTopic,
};

pub type Result<T> = std::result::Result<T, Error>;
