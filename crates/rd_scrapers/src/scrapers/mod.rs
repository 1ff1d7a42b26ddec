use rd_core::{RawArticle, Result, Scraper};

use crate::fetch::ScraperConfig;
use crate::logging::Logger;

pub mod feed;
pub mod listing;
pub mod sources;

pub use feed::{FeedScraper, FeedSource};
pub use listing::{CardLayout, ListingScraper, ListingSource};

pub type ScraperFactory = fn(&ScraperConfig) -> Result<Box<dyn Scraper>>;

/// Every configured source, in run order.
pub fn get_scraper_factories() -> Vec<ScraperFactory> {
    let factories: [ScraperFactory; 5] = [
        sources::ieee_spectrum,
        sources::mit_news,
        sources::nvidia_blog,
        sources::techcrunch,
        sources::robot_report,
    ];
    factories.to_vec()
}

pub fn default_scrapers(config: &ScraperConfig) -> Result<Vec<Box<dyn Scraper>>> {
    get_scraper_factories()
        .into_iter()
        .map(|factory| factory(config))
        .collect()
}

/// Drop articles missing a required field, logging which one.
pub fn validate_article(logger: &Logger, article: &RawArticle) -> bool {
    match article.missing_field() {
        Some(field) => {
            logger.warn(&format!("Article missing required field: {}", field));
            false
        }
        None => true,
    }
}

pub fn log_scrape_results(logger: &Logger, articles: &[RawArticle]) {
    logger.info("Scraping complete:");
    logger.info(&format!("  - Total articles scraped: {}", articles.len()));
    if articles.is_empty() {
        return;
    }
    let count = |pred: fn(&RawArticle) -> bool| articles.iter().filter(|a| pred(a)).count();
    logger.info(&format!("  - With images: {}", count(|a| a.image_url.is_some())));
    logger.info(&format!("  - With dates: {}", count(|a| a.published_date.is_some())));
    logger.info(&format!("  - With authors: {}", count(|a| a.author.is_some())));
}

/// Common utilities for scrapers
pub mod utils {
    use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
    use rd_core::{Error, Result};
    use scraper::{ElementRef, Html, Selector};
    use url::Url;

    pub fn selector(css: &str) -> Result<Selector> {
        Selector::parse(css).map_err(|e| Error::Scraping(format!("Invalid selector {}: {}", css, e)))
    }

    /// Collapse runs of whitespace into single spaces.
    pub fn clean_text(text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    pub fn element_text(element: &ElementRef) -> String {
        clean_text(&element.text().collect::<String>())
    }

    pub fn strip_html(html: &str) -> String {
        let fragment = Html::parse_fragment(html);
        clean_text(&fragment.root_element().text().collect::<String>())
    }

    /// Try RFC 3339 first, then each strftime format in turn. Offset-less
    /// values are taken as UTC.
    pub fn parse_date(text: &str, formats: &[&str]) -> Option<DateTime<Utc>> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
            return Some(parsed.with_timezone(&Utc));
        }
        formats.iter().find_map(|format| {
            DateTime::parse_from_str(text, format)
                .map(|d| d.with_timezone(&Utc))
                .or_else(|_| NaiveDateTime::parse_from_str(text, format).map(|d| d.and_utc()))
                .ok()
                .or_else(|| {
                    NaiveDate::parse_from_str(text, format)
                        .ok()
                        .and_then(|d| d.and_hms_opt(0, 0, 0))
                        .map(|d| d.and_utc())
                })
        })
    }

    /// Resolve protocol-relative and root-relative links against `base`.
    pub fn absolutize(href: &str, base: &str) -> String {
        let href = href.trim();
        if let Some(rest) = href.strip_prefix("//") {
            return format!("https://{}", rest);
        }
        match Url::parse(base).and_then(|base| base.join(href)) {
            Ok(url) => url.to_string(),
            Err(_) => href.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::utils::*;
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  Spot \n\t learns   stairs "), "Spot learns stairs");
        assert_eq!(clean_text(""), "");
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(
            strip_html("<p>Robots <b>walk</b></p>\n<p>again</p>"),
            "Robots walk again"
        );
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap();
        assert_eq!(parse_date("2024-03-05", &["%Y-%m-%d"]), Some(expected));
        assert_eq!(parse_date("March 5, 2024", &["%Y-%m-%d", "%B %d, %Y"]), Some(expected));
        assert_eq!(parse_date("03/05/2024", &["%m/%d/%Y"]), Some(expected));
        assert_eq!(
            parse_date("2024-03-05T10:00:00+02:00", &[]),
            Some(Utc.with_ymd_and_hms(2024, 3, 5, 8, 0, 0).unwrap())
        );
        assert_eq!(
            parse_date("2024-03-05T10:00:00", &["%Y-%m-%dT%H:%M:%S"]),
            Some(Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap())
        );
        assert_eq!(parse_date("yesterday", &["%Y-%m-%d"]), None);
    }

    #[test]
    fn test_absolutize() {
        let base = "https://www.therobotreport.com";
        assert_eq!(absolutize("/news/a", base), "https://www.therobotreport.com/news/a");
        assert_eq!(absolutize("//cdn.test/i.png", base), "https://cdn.test/i.png");
        assert_eq!(absolutize("https://other.test/x", base), "https://other.test/x");
    }

    #[test]
    fn test_validate_article() {
        let logger = Logger::for_source("Test");
        assert!(validate_article(&logger, &RawArticle::new("t", "https://u", "s")));
        assert!(!validate_article(&logger, &RawArticle::new("t", "", "s")));
    }

    #[test]
    fn test_default_scrapers_in_run_order() {
        let scrapers = default_scrapers(&ScraperConfig::default()).unwrap();
        let names: Vec<&str> = scrapers.iter().map(|s| s.source()).collect();
        assert_eq!(
            names,
            vec!["IEEE Spectrum", "MIT News", "NVIDIA Blog", "TechCrunch", "The Robot Report"]
        );
    }
}
