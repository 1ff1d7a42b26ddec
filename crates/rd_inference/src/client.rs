use std::fmt;

use async_trait::async_trait;
use rd_core::{Error, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::InferenceConfig;

/// One system + user exchange sent to a chat model.
#[derive(Debug, Clone)]
pub struct Prompt<'a> {
    pub system: &'a str,
    pub user: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// A chat-completion back end. Implemented by [`ChatClient`] and by test mocks.
#[async_trait]
pub trait ChatModel: Send + Sync + fmt::Debug {
    fn model_name(&self) -> &str;

    async fn complete(&self, prompt: &Prompt<'_>) -> Result<String>;
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    content: Option<String>,
}

/// OpenAI-compatible chat client pointed at DeepSeek by default.
pub struct ChatClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatClient")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl ChatClient {
    pub fn new(config: &InferenceConfig, api_key: &str) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            api_key: api_key.to_string(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// `None` when no API key is configured.
    pub fn from_config(config: &InferenceConfig) -> Result<Option<Self>> {
        match config.api_key.as_deref() {
            Some(key) => Self::new(config, key).map(Some),
            None => {
                tracing::warn!("DEEPSEEK_API_KEY not set; AI enrichment will degrade");
                Ok(None)
            }
        }
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|e| Error::Config(format!("Invalid API key header: {}", e)))?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

#[async_trait]
impl ChatModel for ChatClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &Prompt<'_>) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            max_tokens: prompt.max_tokens,
            temperature: prompt.temperature,
        };

        tracing::debug!(model = %self.model, "Chat completion request");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .headers(self.headers()?)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Inference(format!(
                "DeepSeek API error ({}): {}",
                status, body
            )));
        }

        let response: ChatResponse = response.json().await?;
        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| Error::Inference("No response content from DeepSeek".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_requires_api_key() {
        let config = InferenceConfig::default();
        assert!(ChatClient::from_config(&config).unwrap().is_none());

        let config = InferenceConfig::default().with_api_key(Some("test-key".to_string()));
        let client = ChatClient::from_config(&config).unwrap().unwrap();
        assert_eq!(client.model_name(), "deepseek-chat");
    }

    #[test]
    fn test_debug_hides_key() {
        let config = InferenceConfig {
            base_url: "http://localhost:9999/".to_string(),
            ..InferenceConfig::default()
        };
        let client = ChatClient::new(&config, "sk-secret").unwrap();
        let printed = format!("{:?}", client);
        assert!(!printed.contains("sk-secret"));
        assert!(printed.contains("http://localhost:9999\""));
    }

    #[test]
    fn test_response_envelope_parsing() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"hi"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("hi"));
    }
}
