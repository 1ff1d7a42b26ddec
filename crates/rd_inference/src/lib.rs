use std::time::Duration;

pub mod client;
pub mod models;
pub mod parse;

pub const DEFAULT_MODEL: &str = "deepseek-chat";
pub const DEFAULT_BASE_URL: &str = "https://api.deepseek.com";

#[derive(Clone)]
pub struct InferenceConfig {
    /// Without a key no client is built and the enrichers degrade.
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for InferenceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceConfig")
            .field("api_key", &self.api_key.as_deref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl InferenceConfig {
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.trim().is_empty());
        self
    }
}

pub mod prelude {
    pub use super::client::{ChatClient, ChatModel, Prompt};
    pub use super::models::{create_enrichers, Enrichers};
    pub use super::InferenceConfig;
    pub use rd_core::{Categorizer, Error, Result, Summarizer, TopicExtractor};
}

pub use models::{create_enrichers, Enrichers};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_api_key_is_treated_as_missing() {
        let config = InferenceConfig::default().with_api_key(Some("  ".to_string()));
        assert!(config.api_key.is_none());
        let config = InferenceConfig::default().with_api_key(Some("sk-test".to_string()));
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = InferenceConfig::default().with_api_key(Some("sk-secret".to_string()));
        let printed = format!("{:?}", config);
        assert!(!printed.contains("sk-secret"));
        assert!(printed.contains("<redacted>"));
    }
}
