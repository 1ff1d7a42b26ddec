use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{Category, IngestError};

/// An article as produced by a source adapter, before persistence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawArticle {
    pub title: String,
    pub url: String,
    pub source: String,
    pub author: Option<String>,
    pub published_date: Option<DateTime<Utc>>,
    pub excerpt: Option<String>,
    pub full_text: Option<String>,
    pub image_url: Option<String>,
}

impl RawArticle {
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            source: source.into(),
            ..Default::default()
        }
    }

    /// Name of the first required field that is empty, if any.
    pub fn missing_field(&self) -> Option<&'static str> {
        [
            ("title", &self.title),
            ("url", &self.url),
            ("source", &self.source),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
    }

    pub fn is_valid(&self) -> bool {
        self.missing_field().is_none()
    }

    pub fn read_time_minutes(&self) -> u32 {
        body_text(self.full_text.as_deref(), self.excerpt.as_deref())
            .map(estimate_read_time)
            .unwrap_or(0)
    }
}

/// Reading time in minutes at 200 words per minute; at least one minute for
/// any non-empty text.
pub fn estimate_read_time(text: &str) -> u32 {
    let words = text.split_whitespace().count();
    if words == 0 {
        return 0;
    }
    ((words as f64 / 200.0).round() as u32).max(1)
}

fn body_text<'a>(full_text: Option<&'a str>, excerpt: Option<&'a str>) -> Option<&'a str> {
    full_text
        .filter(|t| !t.trim().is_empty())
        .or(excerpt.filter(|t| !t.trim().is_empty()))
}

/// A stored article. `id` and `url` never change once assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub source: String,
    pub author: Option<String>,
    pub published_date: Option<DateTime<Utc>>,
    pub scraped_date: DateTime<Utc>,
    pub excerpt: Option<String>,
    pub full_text: Option<String>,
    pub image_url: Option<String>,
    pub read_time_minutes: u32,
}

impl Article {
    pub fn from_raw(id: i64, raw: &RawArticle, scraped_date: DateTime<Utc>) -> Self {
        Self {
            id,
            title: raw.title.trim().to_string(),
            url: raw.url.trim().to_string(),
            source: raw.source.trim().to_string(),
            author: raw.author.clone(),
            published_date: raw.published_date,
            scraped_date,
            excerpt: raw.excerpt.clone(),
            full_text: raw.full_text.clone(),
            image_url: raw.image_url.clone(),
            read_time_minutes: raw.read_time_minutes(),
        }
    }

    /// Full text when present, otherwise the excerpt.
    pub fn body(&self) -> Option<&str> {
        body_text(self.full_text.as_deref(), self.excerpt.as_deref())
    }

    pub fn excerpt_or_empty(&self) -> &str {
        self.excerpt.as_deref().unwrap_or("")
    }
}

/// Structured facts pulled out of an article alongside its summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyInsights {
    #[serde(default)]
    pub companies: Vec<String>,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default)]
    pub applications: Vec<String>,
    #[serde(default)]
    pub significance: Option<String>,
}

/// Summarizer output, ready to be stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedSummary {
    pub text: String,
    pub key_insights: Option<KeyInsights>,
    pub model_used: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub id: i64,
    pub article_id: i64,
    pub summary: String,
    pub key_insights: Option<KeyInsights>,
    pub generated_date: DateTime<Utc>,
    pub model_used: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryAssignment {
    pub article_id: i64,
    pub category: Category,
    pub confidence: f32,
}

/// Mentions of one topic on one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingTopic {
    pub id: i64,
    pub topic_name: String,
    pub mention_count: u32,
    pub date: NaiveDate,
    pub related_articles: Vec<i64>,
}

impl TrendingTopic {
    /// Counts one more mention; the article id is recorded once per row.
    pub fn record_mention(&mut self, article_id: i64) {
        self.mention_count += 1;
        if !self.related_articles.contains(&article_id) {
            self.related_articles.push(article_id);
        }
    }
}

/// What happened to one raw article handed to the ingestion coordinator.
#[derive(Debug)]
pub enum IngestOutcome {
    New(i64),
    Duplicate,
    Error(IngestError),
}

impl From<IngestError> for IngestOutcome {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::DuplicateUrl(_) => IngestOutcome::Duplicate,
            other => IngestOutcome::Error(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_reports_first_empty_required_field() {
        let article = RawArticle::new("Title", "", "Source");
        assert_eq!(article.missing_field(), Some("url"));

        let article = RawArticle::new("  ", "https://example.com/a", "");
        assert_eq!(article.missing_field(), Some("title"));

        let article = RawArticle::new("Title", "https://example.com/a", "Source");
        assert!(article.is_valid());
    }

    #[test]
    fn test_estimate_read_time() {
        assert_eq!(estimate_read_time(""), 0);
        assert_eq!(estimate_read_time("just a few words"), 1);
        let long = vec!["word"; 650].join(" ");
        assert_eq!(estimate_read_time(&long), 3);
    }

    #[test]
    fn test_read_time_prefers_full_text() {
        let mut article = RawArticle::new("Title", "https://example.com/a", "Source");
        article.excerpt = Some("short".to_string());
        article.full_text = Some(vec!["word"; 1000].join(" "));
        assert_eq!(article.read_time_minutes(), 5);

        article.full_text = Some("   ".to_string());
        assert_eq!(article.read_time_minutes(), 1);
    }

    #[test]
    fn test_record_mention_keeps_article_ids_unique() {
        let mut topic = TrendingTopic {
            id: 1,
            topic_name: "LiDAR".to_string(),
            mention_count: 1,
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            related_articles: vec![7],
        };
        topic.record_mention(7);
        topic.record_mention(9);
        assert_eq!(topic.mention_count, 3);
        assert_eq!(topic.related_articles, vec![7, 9]);
    }

    #[test]
    fn test_duplicate_error_maps_to_duplicate_outcome() {
        let outcome: IngestOutcome = IngestError::DuplicateUrl("u".to_string()).into();
        assert!(matches!(outcome, IngestOutcome::Duplicate));
        let outcome: IngestOutcome = IngestError::MissingField("url").into();
        assert!(matches!(outcome, IngestOutcome::Error(IngestError::MissingField("url"))));
    }
}
