use std::sync::Arc;

use async_trait::async_trait;
use rd_core::{Article, GeneratedSummary, KeyInsights, Summarizer};
use serde::Deserialize;

use crate::client::{ChatModel, Prompt};
use crate::parse::{clip_for_prompt, strip_code_blocks};

const MAX_CONTENT_BYTES: usize = 2000;

const SUMMARY_SYSTEM: &str = "You are an expert robotics journalist who creates concise, \
informative summaries of robotics news articles.";

const INSIGHTS_SYSTEM: &str = "You are a robotics analyst extracting structured insights from articles.";

#[derive(Deserialize)]
struct StructuredSummary {
    summary: String,
    #[serde(default)]
    key_insights: Option<KeyInsights>,
}

/// Interpret a summary reply: a `{"summary", "key_insights"}` object when the
/// model returned one, otherwise the trimmed text itself.
pub fn parse_summary_response(text: &str) -> Option<(String, Option<KeyInsights>)> {
    if let Ok(structured) = serde_json::from_str::<StructuredSummary>(strip_code_blocks(text)) {
        let summary = structured.summary.trim();
        if !summary.is_empty() {
            return Some((summary.to_string(), structured.key_insights));
        }
    }
    let text = text.trim();
    (!text.is_empty()).then(|| (text.to_string(), None))
}

pub fn parse_key_insights(text: &str) -> Option<KeyInsights> {
    serde_json::from_str(strip_code_blocks(text)).ok()
}

#[derive(Debug)]
pub struct ArticleSummarizer {
    chat: Option<Arc<dyn ChatModel>>,
}

impl ArticleSummarizer {
    pub fn new(chat: Option<Arc<dyn ChatModel>>) -> Self {
        Self { chat }
    }

    fn summary_prompt(title: &str, content: &str) -> String {
        format!(
            "Summarize this robotics article in 2-3 concise sentences. Focus on:\n\
             - What was announced, discovered, or developed\n\
             - Why it matters to the robotics field\n\
             - Key technical details or implications\n\n\
             Title: {}\n\n\
             Content: {}\n\n\
             Provide only the summary, without any introduction or extra text.",
            title, content
        )
    }

    fn insights_prompt(title: &str, content: &str) -> String {
        format!(
            "Analyze this robotics article and extract key insights in JSON format:\n\n\
             Title: {}\n\
             Content: {}\n\n\
             Provide a JSON object with these fields:\n\
             - companies: List of companies mentioned\n\
             - technologies: List of technologies discussed\n\
             - applications: List of robotics applications\n\
             - significance: One sentence on why this matters\n\n\
             Return only valid JSON, no additional text.",
            title, content
        )
    }

    async fn key_insights(&self, chat: &dyn ChatModel, title: &str, content: &str) -> Option<KeyInsights> {
        let prompt = Prompt {
            system: INSIGHTS_SYSTEM,
            user: Self::insights_prompt(title, content),
            max_tokens: 200,
            temperature: 0.3,
        };
        match chat.complete(&prompt).await {
            Ok(reply) => {
                let insights = parse_key_insights(&reply);
                if insights.is_none() {
                    tracing::warn!("Key insights reply was not valid JSON for: {}", title);
                }
                insights
            }
            Err(e) => {
                tracing::warn!("Key insights generation failed: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl Summarizer for ArticleSummarizer {
    fn name(&self) -> &str {
        "DeepSeek summarizer"
    }

    async fn summarize(&self, article: &Article) -> Option<GeneratedSummary> {
        let chat = self.chat.as_deref()?;
        let Some(body) = article.body() else {
            tracing::warn!("No content to summarize for article: {}", article.title);
            return None;
        };
        let content = clip_for_prompt(body, MAX_CONTENT_BYTES);

        let prompt = Prompt {
            system: SUMMARY_SYSTEM,
            user: Self::summary_prompt(&article.title, &content),
            max_tokens: 150,
            temperature: 0.5,
        };
        let reply = match chat.complete(&prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!("Summary generation failed for {}: {}", article.url, e);
                return None;
            }
        };

        let (text, key_insights) = parse_summary_response(&reply)?;
        let key_insights = match key_insights {
            Some(insights) => Some(insights),
            None => self.key_insights(chat, &article.title, &content).await,
        };

        tracing::info!("Generated summary for: {}", article.title);
        Some(GeneratedSummary {
            text,
            key_insights,
            model_used: chat.model_name().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::mock::MockChat;
    use rd_core::RawArticle;

    fn article(excerpt: Option<&str>, full_text: Option<&str>) -> Article {
        let mut raw = RawArticle::new("Figure raises Series C", "https://example.com/f", "TechCrunch");
        raw.excerpt = excerpt.map(str::to_string);
        raw.full_text = full_text.map(str::to_string);
        Article::from_raw(1, &raw, chrono::Utc::now())
    }

    #[test]
    fn test_parse_structured_summary() {
        let reply = "```json\n{\"summary\": \"Figure raised money.\", \"key_insights\": {\"companies\": [\"Figure\"]}}\n```";
        let (text, insights) = parse_summary_response(reply).unwrap();
        assert_eq!(text, "Figure raised money.");
        assert_eq!(insights.unwrap().companies, vec!["Figure"]);
    }

    #[test]
    fn test_parse_plain_summary_falls_back_to_text() {
        let (text, insights) = parse_summary_response("  Figure raised money.\n").unwrap();
        assert_eq!(text, "Figure raised money.");
        assert!(insights.is_none());
        assert!(parse_summary_response("   ").is_none());
    }

    #[tokio::test]
    async fn test_summarize_makes_second_call_for_insights() {
        let chat = Arc::new(MockChat::replying(&[
            "Figure raised a large round.",
            r#"{"companies": ["Figure"], "technologies": [], "applications": ["humanoids"], "significance": "Capital keeps flowing."}"#,
        ]));
        let summarizer = ArticleSummarizer::new(Some(chat.clone()));
        let summary = summarizer
            .summarize(&article(Some("excerpt"), Some("full text")))
            .await
            .unwrap();

        assert_eq!(summary.text, "Figure raised a large round.");
        assert_eq!(summary.model_used, "mock-chat");
        let insights = summary.key_insights.unwrap();
        assert_eq!(insights.applications, vec!["humanoids"]);
        assert_eq!(chat.prompt_count(), 2);
        assert!(chat.prompts.lock().unwrap()[0].contains("full text"));
    }

    #[tokio::test]
    async fn test_bad_insights_keep_summary() {
        let chat = Arc::new(MockChat::replying(&["A summary.", "not json"]));
        let summarizer = ArticleSummarizer::new(Some(chat));
        let summary = summarizer.summarize(&article(Some("excerpt"), None)).await.unwrap();
        assert_eq!(summary.text, "A summary.");
        assert!(summary.key_insights.is_none());
    }

    #[tokio::test]
    async fn test_no_content_or_fault_yields_nothing() {
        let chat = Arc::new(MockChat::replying(&["unused"]));
        let summarizer = ArticleSummarizer::new(Some(chat.clone()));
        assert!(summarizer.summarize(&article(None, None)).await.is_none());
        assert_eq!(chat.prompt_count(), 0);

        let summarizer = ArticleSummarizer::new(Some(Arc::new(MockChat::failing())));
        assert!(summarizer.summarize(&article(Some("x"), None)).await.is_none());

        let summarizer = ArticleSummarizer::new(None);
        assert!(summarizer.summarize(&article(Some("x"), None)).await.is_none());
    }

    #[tokio::test]
    async fn test_long_content_is_clipped() {
        let chat = Arc::new(MockChat::replying(&["ok", "{}"]));
        let summarizer = ArticleSummarizer::new(Some(chat.clone()));
        let long = "a".repeat(5000);
        summarizer.summarize(&article(None, Some(&long))).await.unwrap();
        let prompt = chat.prompts.lock().unwrap()[0].clone();
        assert!(prompt.contains(&format!("{}...", "a".repeat(2000))));
        assert!(!prompt.contains(&"a".repeat(2001)));
    }
}
