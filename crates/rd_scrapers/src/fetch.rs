use std::time::Duration;

use rd_core::Result;
use reqwest::Client;

use crate::logging::Logger;

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
(KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Settings shared by every source's HTTP client.
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            user_agent: BROWSER_USER_AGENT.to_string(),
        }
    }
}

/// Rate-limited GETs for one source. Failures are logged and yield `None`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    rate_limit: Duration,
    logger: Logger,
}

impl HttpFetcher {
    pub fn new(config: &ScraperConfig, source: &str, rate_limit: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self {
            client,
            rate_limit,
            logger: Logger::for_source(source),
        })
    }

    async fn get(&self, url: &str) -> Option<reqwest::Response> {
        self.logger.info(&format!("Fetching: {}", url));
        tokio::time::sleep(self.rate_limit).await;

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                self.logger.error(&format!("Request failed for {}: {}", url, e));
                return None;
            }
        };
        if !response.status().is_success() {
            self.logger
                .error(&format!("Request failed for {}: HTTP {}", url, response.status()));
            return None;
        }
        Some(response)
    }

    pub async fn fetch_text(&self, url: &str) -> Option<String> {
        let response = self.get(url).await?;
        match response.text().await {
            Ok(text) => Some(text),
            Err(e) => {
                self.logger.error(&format!("Failed to read body of {}: {}", url, e));
                None
            }
        }
    }

    pub async fn fetch_bytes(&self, url: &str) -> Option<Vec<u8>> {
        let response = self.get(url).await?;
        match response.bytes().await {
            Ok(bytes) => Some(bytes.to_vec()),
            Err(e) => {
                self.logger.error(&format!("Failed to read body of {}: {}", url, e));
                None
            }
        }
    }
}
