use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rd_core::{Article, TopicExtractor};
use serde_json::Value;

use crate::client::{ChatModel, Prompt};
use crate::parse::{strip_code_blocks, title_case, truncate_to_char_boundary};

pub const MAX_TOPICS: usize = 7;
const MAX_CONTENT_BYTES: usize = 800;

const SYSTEM: &str =
    "You are an expert at extracting structured information from robotics articles.";

const COMPANIES: &[&str] = &[
    "boston dynamics",
    "figure",
    "tesla",
    "nvidia",
    "amazon robotics",
    "abb",
    "fanuc",
    "universal robots",
    "agility robotics",
    "waymo",
    "cruise",
    "zoox",
    "spot",
    "atlas",
    "optimus",
    "digit",
];

const TECHNOLOGIES: &[&str] = &[
    "computer vision",
    "lidar",
    "machine learning",
    "deep learning",
    "reinforcement learning",
    "slam",
    "path planning",
    "grasping",
    "manipulation",
    "autonomous navigation",
    "sensor fusion",
];

const APPLICATIONS: &[&str] = &[
    "warehouse automation",
    "delivery robots",
    "surgical robotics",
    "agricultural robots",
    "self-driving",
    "humanoid robots",
    "industrial automation",
    "collaborative robots",
    "drones",
];

/// Keep candidates of 3 to 49 characters, dropping exact repeats, at most seven.
pub fn filter_topics<I>(candidates: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut topics: Vec<String> = Vec::new();
    for candidate in candidates {
        let topic = candidate.trim();
        let len = topic.chars().count();
        if !(3..=49).contains(&len) || topics.iter().any(|t| t == topic) {
            continue;
        }
        topics.push(topic.to_string());
        if topics.len() == MAX_TOPICS {
            break;
        }
    }
    topics
}

/// Parse a JSON array reply. `None` when the reply is not an array at all.
pub fn parse_topics(text: &str) -> Option<Vec<String>> {
    let items: Vec<Value> = serde_json::from_str(strip_code_blocks(text)).ok()?;
    let candidates = items.into_iter().filter_map(|item| match item {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    });
    Some(filter_topics(candidates))
}

/// Known companies, technologies and application areas mentioned in the text.
pub fn keyword_topics(title: &str, excerpt: &str) -> Vec<String> {
    let text = format!("{} {}", title, excerpt).to_lowercase();
    let hits = COMPANIES
        .iter()
        .chain(TECHNOLOGIES)
        .chain(APPLICATIONS)
        .filter(|keyword| text.contains(*keyword))
        .map(|keyword| title_case(keyword));
    filter_topics(hits)
}

/// Mention counts across `topic_lists`, most mentioned first.
pub fn count_topics<I>(topic_lists: I) -> Vec<(String, u32)>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let counts = topic_lists
        .into_iter()
        .flatten()
        .fold(HashMap::<String, u32>::new(), |mut acc, topic| {
            *acc.entry(topic).or_default() += 1;
            acc
        });
    let mut counts: Vec<(String, u32)> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}

/// Topics for every article, tallied. Used for previews that never touch
/// storage.
pub async fn batch_extract(extractor: &dyn TopicExtractor, articles: &[Article]) -> Vec<(String, u32)> {
    let mut lists = Vec::with_capacity(articles.len());
    for article in articles {
        lists.push(extractor.extract_topics(article).await);
    }
    count_topics(lists)
}

#[derive(Debug)]
pub struct TrendingDetector {
    chat: Option<Arc<dyn ChatModel>>,
}

impl TrendingDetector {
    pub fn new(chat: Option<Arc<dyn ChatModel>>) -> Self {
        Self { chat }
    }

    fn prompt(content: &str) -> String {
        format!(
            "Extract key topics from this robotics article. Focus on:\n\
             - Company names\n\
             - Robot models or product names\n\
             - Technologies (e.g., \"computer vision\", \"LiDAR\", \"grasping\")\n\
             - Application areas (e.g., \"warehouse automation\", \"surgical robotics\")\n\n\
             Article: {}\n\n\
             Return only a JSON array of topic strings, like:\n\
             [\"Company Name\", \"Technology\", \"Application\"]\n\n\
             Maximum 5-7 topics. Return only the JSON array, no additional text.",
            content
        )
    }
}

#[async_trait]
impl TopicExtractor for TrendingDetector {
    fn name(&self) -> &str {
        "DeepSeek topic extractor"
    }

    async fn extract_topics(&self, article: &Article) -> Vec<String> {
        let fallback = || keyword_topics(&article.title, article.excerpt_or_empty());
        let Some(chat) = self.chat.as_deref() else {
            return fallback();
        };

        let content = format!("{}. {}", article.title, article.excerpt_or_empty());
        let prompt = Prompt {
            system: SYSTEM,
            user: Self::prompt(truncate_to_char_boundary(&content, MAX_CONTENT_BYTES)),
            max_tokens: 150,
            temperature: 0.3,
        };

        match chat.complete(&prompt).await {
            Ok(reply) => match parse_topics(&reply) {
                Some(topics) => {
                    tracing::debug!("Extracted {} topics: {:?}", topics.len(), topics);
                    topics
                }
                None => {
                    tracing::warn!("Topic reply was not a JSON array, using keywords");
                    fallback()
                }
            },
            Err(e) => {
                tracing::warn!("AI topic extraction failed: {}", e);
                fallback()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::mock::MockChat;
    use rd_core::RawArticle;

    fn article(title: &str, excerpt: &str) -> Article {
        let mut raw = RawArticle::new(title, format!("https://example.com/{}", title.len()), "MIT News");
        raw.excerpt = Some(excerpt.to_string());
        Article::from_raw(1, &raw, chrono::Utc::now())
    }

    #[test]
    fn test_filter_bounds_dedup_and_cap() {
        let long = "x".repeat(50);
        let edge = "y".repeat(49);
        let topics = filter_topics(
            ["AI", "LiDAR", "LiDAR", "lidar", long.as_str(), edge.as_str(), "a", "b1c", "d2e", "f3g", "h4i", "j5k"]
                .into_iter()
                .map(String::from),
        );
        assert_eq!(topics.len(), MAX_TOPICS);
        assert_eq!(&topics[..3], &["LiDAR".to_string(), "lidar".to_string(), edge]);
        assert!(!topics.contains(&"AI".to_string()));
    }

    #[test]
    fn test_parse_topics_requires_array() {
        assert_eq!(
            parse_topics("```json\n[\"Boston Dynamics\", \"Atlas\", 42, null]\n```").unwrap(),
            vec!["Boston Dynamics", "Atlas", "42"]
        );
        assert!(parse_topics("{\"topics\": []}").is_none());
        assert!(parse_topics("Boston Dynamics, Atlas").is_none());
    }

    #[test]
    fn test_keyword_topics() {
        let topics = keyword_topics(
            "NVIDIA brings LiDAR to self-driving trucks",
            "Sensor fusion at the edge",
        );
        assert_eq!(topics, vec!["Nvidia", "Lidar", "Sensor Fusion", "Self-Driving"]);
    }

    #[test]
    fn test_count_topics_orders_by_mentions() {
        let counts = count_topics(vec![
            vec!["Atlas".to_string(), "Spot".to_string()],
            vec!["Spot".to_string()],
        ]);
        assert_eq!(counts[0], ("Spot".to_string(), 2));
        assert_eq!(counts[1], ("Atlas".to_string(), 1));
    }

    #[tokio::test]
    async fn test_extract_uses_fallback_on_bad_reply_and_fault() {
        let a = article("Waymo expands", "Self-driving taxis in more cities");

        let detector = TrendingDetector::new(Some(Arc::new(MockChat::replying(&["not json"]))));
        assert_eq!(detector.extract_topics(&a).await, vec!["Waymo", "Self-Driving"]);

        let detector = TrendingDetector::new(Some(Arc::new(MockChat::failing())));
        assert_eq!(detector.extract_topics(&a).await, vec!["Waymo", "Self-Driving"]);
    }

    #[tokio::test]
    async fn test_extract_with_model() {
        let chat = Arc::new(MockChat::replying(&[r#"["Waymo", "Robotaxi", "Waymo"]"#]));
        let detector = TrendingDetector::new(Some(chat));
        let topics = detector
            .extract_topics(&article("Waymo expands", "More cities"))
            .await;
        assert_eq!(topics, vec!["Waymo", "Robotaxi"]);
    }

    #[tokio::test]
    async fn test_batch_extract_counts_across_articles() {
        let detector = TrendingDetector::new(None);
        let counts = batch_extract(
            &detector,
            &[
                article("Tesla Optimus walks", ""),
                article("Optimus folds laundry", "Tesla demo"),
            ],
        )
        .await;
        assert_eq!(counts[0], ("Optimus".to_string(), 2));
        assert_eq!(counts[1], ("Tesla".to_string(), 2));
    }
}
