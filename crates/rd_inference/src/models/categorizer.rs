use std::sync::Arc;

use async_trait::async_trait;
use rd_core::{Article, Categorizer, Category, CategoryScore, MAX_CATEGORIES_PER_ARTICLE};
use serde::Deserialize;

use crate::client::{ChatModel, Prompt};
use crate::parse::{strip_code_blocks, truncate_to_char_boundary};

const MAX_CONTENT_BYTES: usize = 500;

const SYSTEM: &str = "You are an expert robotics analyst who categorizes robotics news \
articles into appropriate categories.";

#[derive(Deserialize)]
struct CategoryReply {
    #[serde(default)]
    categories: Vec<ScoredName>,
}

#[derive(Deserialize)]
struct ScoredName {
    #[serde(default)]
    name: String,
    #[serde(default)]
    confidence: f32,
}

/// Turn a categorizer reply into at most three known categories.
///
/// A JSON `{"categories": [{"name", "confidence"}]}` reply is trusted for
/// confidences; anything else is scanned for category names.
pub fn parse_categories(text: &str) -> Vec<CategoryScore> {
    match serde_json::from_str::<CategoryReply>(strip_code_blocks(text)) {
        Ok(reply) => reply
            .categories
            .into_iter()
            .filter(|scored| {
                let known = Category::from_name(&scored.name).is_some();
                if !known {
                    tracing::warn!("Invalid category returned: {}", scored.name);
                }
                known
            })
            .take(MAX_CATEGORIES_PER_ARTICLE)
            .map(|scored| CategoryScore::new(scored.name, scored.confidence))
            .collect(),
        Err(_) => {
            tracing::warn!("Failed to parse categorizer JSON, scanning text instead");
            fallback_categories(text)
        }
    }
}

fn fallback_categories(text: &str) -> Vec<CategoryScore> {
    let text = text.to_lowercase();
    Category::ALL
        .into_iter()
        .filter(|c| text.contains(&c.name().to_lowercase()))
        .take(MAX_CATEGORIES_PER_ARTICLE)
        .enumerate()
        .map(|(i, c)| CategoryScore::new(c.name(), if i == 0 { 0.9 } else { 0.7 }))
        .collect()
}

#[derive(Debug)]
pub struct ArticleCategorizer {
    chat: Option<Arc<dyn ChatModel>>,
}

impl ArticleCategorizer {
    pub fn new(chat: Option<Arc<dyn ChatModel>>) -> Self {
        Self { chat }
    }

    fn prompt(content: &str) -> String {
        let list = Category::ALL
            .iter()
            .map(|c| format!("- {}", c.name()))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "Categorize this robotics article into 1-3 most relevant categories from the list below.\n\
             Provide categories in order of relevance with confidence scores (0.0-1.0).\n\n\
             Available categories:\n{}\n\n\
             Article: {}\n\n\
             Respond in JSON format:\n\
             {{\n  \"categories\": [\n    {{\"name\": \"Category Name\", \"confidence\": 0.95}},\n    \
             {{\"name\": \"Category Name\", \"confidence\": 0.80}}\n  ]\n}}\n\n\
             Only include categories that are truly relevant. Respond with valid JSON only.",
            list, content
        )
    }
}

#[async_trait]
impl Categorizer for ArticleCategorizer {
    fn name(&self) -> &str {
        "DeepSeek categorizer"
    }

    async fn categorize(&self, article: &Article) -> Vec<CategoryScore> {
        let Some(chat) = self.chat.as_deref() else {
            return Vec::new();
        };
        let content = format!("{}. {}", article.title, article.excerpt_or_empty());
        let prompt = Prompt {
            system: SYSTEM,
            user: Self::prompt(truncate_to_char_boundary(&content, MAX_CONTENT_BYTES)),
            max_tokens: 150,
            temperature: 0.3,
        };

        match chat.complete(&prompt).await {
            Ok(reply) => {
                let categories = parse_categories(&reply);
                tracing::info!(
                    "Categorized '{}' into: {:?}",
                    article.title,
                    categories.iter().map(|c| c.name.as_str()).collect::<Vec<_>>()
                );
                categories
            }
            Err(e) => {
                tracing::warn!("Categorization failed for {}: {}", article.url, e);
                Vec::new()
            }
        }
    }
}
