use async_trait::async_trait;
use feed_rs::model::Entry;
use feed_rs::parser;
use rd_core::{RawArticle, Result, Scraper, SourceMetadata};

use super::utils::{clean_text, strip_html};
use super::{log_scrape_results, validate_article};
use crate::fetch::{HttpFetcher, ScraperConfig};
use crate::logging::Logger;

/// An RSS or Atom source.
#[derive(Debug, Clone, Copy)]
pub struct FeedSource {
    pub metadata: SourceMetadata,
    pub feed_url: &'static str,
    pub cli_names: &'static [&'static str],
}

pub struct FeedScraper {
    source: FeedSource,
    fetcher: HttpFetcher,
    logger: Logger,
}

impl FeedScraper {
    pub fn new(source: FeedSource, config: &ScraperConfig) -> Result<Self> {
        let metadata = source.metadata;
        Ok(Self {
            source,
            fetcher: HttpFetcher::new(config, metadata.name, metadata.rate_limit)?,
            logger: Logger::for_source(metadata.name),
        })
    }
}

#[async_trait]
impl Scraper for FeedScraper {
    fn source_metadata(&self) -> SourceMetadata {
        self.source.metadata
    }

    fn cli_names(&self) -> Vec<&str> {
        self.source.cli_names.to_vec()
    }

    async fn scrape(&self, max_articles: usize) -> Result<Vec<RawArticle>> {
        self.logger.info("Starting scrape...");
        let articles = match self.fetcher.fetch_bytes(self.source.feed_url).await {
            Some(bytes) => parse_feed(&bytes, self.source.metadata.name, max_articles, &self.logger),
            None => Vec::new(),
        };
        log_scrape_results(&self.logger, &articles);
        Ok(articles)
    }
}

/// Normalise up to `max_articles` entries of a feed document. A document that
/// does not parse yields no articles.
pub fn parse_feed(bytes: &[u8], source_name: &str, max_articles: usize, logger: &Logger) -> Vec<RawArticle> {
    let feed = match parser::parse(bytes) {
        Ok(feed) => feed,
        Err(e) => {
            logger.error(&format!("RSS feed parsing failed: {}", e));
            return Vec::new();
        }
    };
    if feed.entries.is_empty() {
        logger.warn("No articles found in RSS feed");
    }

    feed.entries
        .into_iter()
        .take(max_articles)
        .map(|entry| entry_to_article(entry, source_name))
        .filter(|article| validate_article(logger, article))
        .collect()
}

fn entry_to_article(entry: Entry, source_name: &str) -> RawArticle {
    let image_url = entry_image(&entry);
    RawArticle {
        title: entry
            .title
            .map(|t| clean_text(&t.content))
            .unwrap_or_default(),
        url: entry
            .links
            .first()
            .map(|l| l.href.trim().to_string())
            .unwrap_or_default(),
        source: source_name.to_string(),
        author: entry
            .authors
            .first()
            .map(|a| clean_text(&a.name))
            .filter(|name| !name.is_empty()),
        published_date: entry.published.or(entry.updated),
        excerpt: entry
            .summary
            .map(|s| strip_html(&s.content))
            .filter(|text| !text.is_empty()),
        full_text: None,
        image_url,
    }
}

/// Thumbnail first, then any image-typed (or untyped) media attachment.
fn entry_image(entry: &Entry) -> Option<String> {
    let thumbnail = entry
        .media
        .iter()
        .flat_map(|m| m.thumbnails.iter())
        .map(|t| t.image.uri.clone())
        .next();
    thumbnail.or_else(|| {
        entry
            .media
            .iter()
            .flat_map(|m| m.content.iter())
            .filter(|c| {
                c.content_type
                    .as_ref()
                    .map_or(true, |t| t.to_string().starts_with("image/"))
            })
            .find_map(|c| c.url.as_ref().map(|u| u.to_string()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    const FIXTURE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:media="http://search.yahoo.com/mrss/">
  <channel>
    <title>Robotics</title>
    <link>https://spectrum.ieee.org</link>
    <description>Robotics news</description>
    <item>
      <title>  Video Friday:
        Humanoids  </title>
      <link>https://spectrum.ieee.org/video-friday</link>
      <description>&lt;p&gt;Your weekly &lt;b&gt;selection&lt;/b&gt; of robot videos&lt;/p&gt;</description>
      <pubDate>Fri, 03 May 2024 16:00:00 GMT</pubDate>
      <media:thumbnail url="https://spectrum.ieee.org/thumb.jpg" />
    </item>
    <item>
      <title>Untitled link</title>
      <description>no link here</description>
    </item>
    <item>
      <title>Third</title>
      <link>https://spectrum.ieee.org/third</link>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_parse_feed_normalises_entries() {
        let logger = Logger::for_source("IEEE Spectrum");
        let articles = parse_feed(FIXTURE.as_bytes(), "IEEE Spectrum", 20, &logger);

        assert_eq!(articles.len(), 2);
        let first = &articles[0];
        assert_eq!(first.title, "Video Friday: Humanoids");
        assert_eq!(first.url, "https://spectrum.ieee.org/video-friday");
        assert_eq!(first.source, "IEEE Spectrum");
        assert_eq!(first.excerpt.as_deref(), Some("Your weekly selection of robot videos"));
        assert_eq!(
            first.published_date,
            Some(Utc.with_ymd_and_hms(2024, 5, 3, 16, 0, 0).unwrap())
        );
        assert_eq!(first.image_url.as_deref(), Some("https://spectrum.ieee.org/thumb.jpg"));
        assert!(articles[1].excerpt.is_none());
    }

    #[test]
    fn test_parse_feed_respects_max() {
        let logger = Logger::for_source("IEEE Spectrum");
        let articles = parse_feed(FIXTURE.as_bytes(), "IEEE Spectrum", 1, &logger);
        assert_eq!(articles.len(), 1);
    }

    #[test]
    fn test_garbage_feed_is_empty() {
        let logger = Logger::for_source("MIT News");
        assert!(parse_feed(b"<html>not a feed</html>", "MIT News", 20, &logger).is_empty());
    }
}
