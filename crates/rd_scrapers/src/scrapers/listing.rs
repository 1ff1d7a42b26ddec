use async_trait::async_trait;
use rd_core::{RawArticle, Result, Scraper, SourceMetadata};
use scraper::{ElementRef, Html, Selector};

use super::utils::{absolutize, element_text, parse_date, selector};
use super::{log_scrape_results, validate_article};
use crate::fetch::{HttpFetcher, ScraperConfig};
use crate::logging::Logger;

/// Where to find each field inside an article card.
///
/// Every list is tried in order and the first selector that matches wins, so
/// specific selectors go before generic ones.
#[derive(Debug, Clone, Copy)]
pub struct CardLayout {
    pub cards: &'static [&'static str],
    pub title: &'static [&'static str],
    pub excerpt: &'static [&'static str],
    pub author: &'static [&'static str],
    /// Elements whose text holds a human-readable date, used when the card
    /// has no `<time datetime>`.
    pub date: &'static [&'static str],
    pub datetime_formats: &'static [&'static str],
    pub text_date_formats: &'static [&'static str],
}

/// An HTML listing page of article cards.
#[derive(Debug, Clone, Copy)]
pub struct ListingSource {
    pub metadata: SourceMetadata,
    pub listing_url: &'static str,
    pub cli_names: &'static [&'static str],
    pub layout: CardLayout,
}

pub struct ListingScraper {
    source: ListingSource,
    fetcher: HttpFetcher,
    logger: Logger,
}

impl ListingScraper {
    pub fn new(source: ListingSource, config: &ScraperConfig) -> Result<Self> {
        let metadata = source.metadata;
        Ok(Self {
            source,
            fetcher: HttpFetcher::new(config, metadata.name, metadata.rate_limit)?,
            logger: Logger::for_source(metadata.name),
        })
    }
}

#[async_trait]
impl Scraper for ListingScraper {
    fn source_metadata(&self) -> SourceMetadata {
        self.source.metadata
    }

    fn cli_names(&self) -> Vec<&str> {
        self.source.cli_names.to_vec()
    }

    async fn scrape(&self, max_articles: usize) -> Result<Vec<RawArticle>> {
        self.logger.info("Starting scrape...");
        let Some(html) = self.fetcher.fetch_text(self.source.listing_url).await else {
            self.logger.error("Failed to fetch main page");
            log_scrape_results(&self.logger, &[]);
            return Ok(Vec::new());
        };
        let articles = parse_listing(&html, &self.source, max_articles, &self.logger)?;
        log_scrape_results(&self.logger, &articles);
        Ok(articles)
    }
}

fn compile(selectors: &[&str]) -> Result<Vec<Selector>> {
    selectors.iter().map(|css| selector(css)).collect()
}

fn first_match<'a>(card: &ElementRef<'a>, selectors: &[Selector]) -> Option<ElementRef<'a>> {
    selectors.iter().find_map(|s| card.select(s).next())
}

/// First match whose text is not blank.
fn first_text(card: &ElementRef, selectors: &[Selector]) -> Option<String> {
    selectors.iter().find_map(|s| {
        card.select(s)
            .map(|el| element_text(&el))
            .find(|text| !text.is_empty())
    })
}

struct CompiledLayout {
    cards: Vec<Selector>,
    title: Vec<Selector>,
    excerpt: Vec<Selector>,
    author: Vec<Selector>,
    date: Vec<Selector>,
    link: Selector,
    image: Selector,
    time: Selector,
}

impl CompiledLayout {
    fn new(layout: &CardLayout) -> Result<Self> {
        Ok(Self {
            cards: compile(layout.cards)?,
            title: compile(layout.title)?,
            excerpt: compile(layout.excerpt)?,
            author: compile(layout.author)?,
            date: compile(layout.date)?,
            link: selector("a[href]")?,
            image: selector("img[src], img[data-src]")?,
            time: selector("time[datetime]")?,
        })
    }
}

/// Extract up to `max_articles` cards from a listing page. Only an invalid
/// selector is an error; cards that lack required fields are skipped.
pub fn parse_listing(
    html: &str,
    source: &ListingSource,
    max_articles: usize,
    logger: &Logger,
) -> Result<Vec<RawArticle>> {
    let compiled = CompiledLayout::new(&source.layout)?;
    let document = Html::parse_document(html);
    let root = document.root_element();

    let cards: Vec<ElementRef> = compiled
        .cards
        .iter()
        .map(|s| root.select(s).collect::<Vec<_>>())
        .find(|cards| !cards.is_empty())
        .unwrap_or_default();

    if cards.is_empty() {
        logger.warn("No article cards found");
        return Ok(Vec::new());
    }

    Ok(cards
        .into_iter()
        .take(max_articles)
        .map(|card| parse_card(&card, &compiled, source))
        .filter(|article| validate_article(logger, article))
        .collect())
}

fn parse_card(card: &ElementRef, compiled: &CompiledLayout, source: &ListingSource) -> RawArticle {
    let base = source.metadata.base_url;
    let title_el = first_match(card, &compiled.title);
    let title = title_el.as_ref().map(element_text).unwrap_or_default();

    let href = title_el
        .and_then(|el| el.select(&compiled.link).next())
        .or_else(|| card.select(&compiled.link).next())
        .and_then(|a| a.value().attr("href"))
        .map(|href| absolutize(href, base))
        .unwrap_or_default();

    let image_url = card
        .select(&compiled.image)
        .next()
        .and_then(|img| {
            let value = img.value();
            value
                .attr("src")
                .filter(|s| !s.trim().is_empty())
                .or_else(|| value.attr("data-src"))
        })
        .map(|src| absolutize(src, base));

    let published_date = match card.select(&compiled.time).next() {
        Some(time) => time
            .value()
            .attr("datetime")
            .and_then(|text| parse_date(text, source.layout.datetime_formats)),
        None => first_text(card, &compiled.date)
            .and_then(|text| parse_date(&text, source.layout.text_date_formats)),
    };

    RawArticle {
        title,
        url: href,
        source: source.metadata.name.to_string(),
        author: first_text(card, &compiled.author),
        published_date,
        excerpt: first_text(card, &compiled.excerpt),
        full_text: None,
        image_url,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::sources::{NVIDIA_BLOG, ROBOT_REPORT, TECHCRUNCH};
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_robot_report_cards() {
        let html = r#"
            <html><body>
              <article class="post">
                <h2 class="entry-title"><a href="/amr-fleet-grows/">AMR   fleet grows</a></h2>
                <div class="byline">Steve Crowe</div>
                <p class="meta"> </p>
                <p>Locus passes a milestone.</p>
                <img data-src="//cdn.therobotreport.com/a.jpg">
                <time datetime="2024-04-02T09:30:00+00:00">April 2, 2024</time>
              </article>
              <article class="post">
                <h2>No link here</h2>
                <span class="entry-date">04/01/2024</span>
              </article>
            </body></html>"#;
        let logger = Logger::for_source("The Robot Report");
        let articles = parse_listing(html, &ROBOT_REPORT, 20, &logger).unwrap();

        assert_eq!(articles.len(), 1);
        let article = &articles[0];
        assert_eq!(article.title, "AMR fleet grows");
        assert_eq!(article.url, "https://www.therobotreport.com/amr-fleet-grows/");
        assert_eq!(article.author.as_deref(), Some("Steve Crowe"));
        assert_eq!(article.excerpt.as_deref(), Some("Locus passes a milestone."));
        assert_eq!(article.image_url.as_deref(), Some("https://cdn.therobotreport.com/a.jpg"));
        assert_eq!(
            article.published_date,
            Some(Utc.with_ymd_and_hms(2024, 4, 2, 9, 30, 0).unwrap())
        );
    }

    #[test]
    fn test_techcrunch_prefers_post_blocks() {
        let html = r#"
            <html><body>
              <article class="promo"><h2><a href="https://techcrunch.com/ad">Ad</a></h2></article>
              <div class="wp-block-post">
                <h3 class="post-block__title"><a href="https://techcrunch.com/2024/05/01/figure/">Figure raises</a></h3>
                <div class="post-block__content">Humanoid startup closes round.</div>
                <span class="post-block__author">Brian Heater</span>
                <span class="date">May 1, 2024</span>
              </div>
            </body></html>"#;
        let logger = Logger::for_source("TechCrunch");
        let articles = parse_listing(html, &TECHCRUNCH, 20, &logger).unwrap();

        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].title, "Figure raises");
        assert_eq!(articles[0].excerpt.as_deref(), Some("Humanoid startup closes round."));
        assert_eq!(articles[0].author.as_deref(), Some("Brian Heater"));
        assert_eq!(
            articles[0].published_date,
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_nvidia_caps_and_falls_back_to_divs() {
        let cards: String = (0..5)
            .map(|i| {
                format!(
                    r#"<div class="post"><h3><a href="/blog/post-{i}/">Post {i}</a></h3><p>Isaac update {i}</p></div>"#
                )
            })
            .collect();
        let html = format!("<html><body>{}</body></html>", cards);
        let logger = Logger::for_source("NVIDIA Blog");
        let articles = parse_listing(&html, &NVIDIA_BLOG, 3, &logger).unwrap();

        assert_eq!(articles.len(), 3);
        assert_eq!(articles[2].url, "https://blogs.nvidia.com/blog/post-2/");
        assert!(articles.iter().all(|a| a.author.is_none()));
    }

    #[test]
    fn test_page_without_cards_is_empty() {
        let logger = Logger::for_source("NVIDIA Blog");
        let articles = parse_listing("<html><body><p>maintenance</p></body></html>", &NVIDIA_BLOG, 20, &logger).unwrap();
        assert!(articles.is_empty());
    }
}
