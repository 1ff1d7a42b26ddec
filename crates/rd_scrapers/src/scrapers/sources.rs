use std::time::Duration;

use rd_core::{Result, Scraper, SourceKind, SourceMetadata};

use super::{CardLayout, FeedScraper, FeedSource, ListingScraper, ListingSource};
use crate::fetch::ScraperConfig;

const FEED_RATE_LIMIT: Duration = Duration::from_millis(500);
const PAGE_RATE_LIMIT: Duration = Duration::from_secs(1);

const MACHINE_DATES: &[&str] = &["%Y-%m-%dT%H:%M:%S%z", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d"];

pub const IEEE_SPECTRUM: FeedSource = FeedSource {
    metadata: SourceMetadata {
        name: "IEEE Spectrum",
        base_url: "https://spectrum.ieee.org",
        kind: SourceKind::Feed,
        rate_limit: FEED_RATE_LIMIT,
    },
    feed_url: "https://spectrum.ieee.org/feeds/topic/robotics.rss",
    cli_names: &["ieee", "spectrum"],
};

pub const MIT_NEWS: FeedSource = FeedSource {
    metadata: SourceMetadata {
        name: "MIT News",
        base_url: "https://news.mit.edu",
        kind: SourceKind::Feed,
        rate_limit: FEED_RATE_LIMIT,
    },
    feed_url: "https://news.mit.edu/rss/topic/robotics",
    cli_names: &["mit"],
};

pub const NVIDIA_BLOG: ListingSource = ListingSource {
    metadata: SourceMetadata {
        name: "NVIDIA Blog",
        base_url: "https://blogs.nvidia.com",
        kind: SourceKind::Listing,
        rate_limit: PAGE_RATE_LIMIT,
    },
    listing_url: "https://blogs.nvidia.com/blog/category/robotics/",
    cli_names: &["nvidia"],
    layout: CardLayout {
        cards: &["article", "div.post, div.entry, div.card"],
        title: &["h2", "h3", ".title, .entry-title, .post-title"],
        excerpt: &["p", ".excerpt, .summary, .description"],
        author: &[],
        date: &["time", ".date, .published, .post-date"],
        datetime_formats: &["%Y-%m-%d", "%B %d, %Y", "%b %d, %Y", "%Y-%m-%dT%H:%M:%S"],
        text_date_formats: &["%Y-%m-%d", "%B %d, %Y", "%b %d, %Y", "%Y-%m-%dT%H:%M:%S"],
    },
};

pub const TECHCRUNCH: ListingSource = ListingSource {
    metadata: SourceMetadata {
        name: "TechCrunch",
        base_url: "https://techcrunch.com",
        kind: SourceKind::Listing,
        rate_limit: PAGE_RATE_LIMIT,
    },
    listing_url: "https://techcrunch.com/category/robotics/",
    cli_names: &["techcrunch", "tc"],
    layout: CardLayout {
        cards: &[
            "article.post-block, div.post-block, article.wp-block-post, div.wp-block-post",
            "article",
        ],
        title: &["h2", "h3", ".post-block__title, .post__title"],
        excerpt: &[".post-block__content, .excerpt", "p"],
        author: &[".post-block__author, .author, .byline"],
        date: &[".date, .published"],
        datetime_formats: MACHINE_DATES,
        text_date_formats: &["%B %d, %Y", "%b %d, %Y", "%Y-%m-%d"],
    },
};

pub const ROBOT_REPORT: ListingSource = ListingSource {
    metadata: SourceMetadata {
        name: "The Robot Report",
        base_url: "https://www.therobotreport.com",
        kind: SourceKind::Listing,
        rate_limit: PAGE_RATE_LIMIT,
    },
    listing_url: "https://www.therobotreport.com/",
    cli_names: &["robotreport", "trr"],
    layout: CardLayout {
        cards: &["article", "div.post, div.entry, div.item"],
        title: &["h1, h2, h3", ".title, .entry-title, .post-title"],
        excerpt: &[".excerpt, .summary, .entry-content", "p"],
        author: &[".author, .byline, .post-author", "a[rel='author']"],
        date: &[".date, .published, .post-date, .entry-date"],
        datetime_formats: MACHINE_DATES,
        text_date_formats: &["%B %d, %Y", "%b %d, %Y", "%Y-%m-%d", "%m/%d/%Y"],
    },
};

pub fn ieee_spectrum(config: &ScraperConfig) -> Result<Box<dyn Scraper>> {
    Ok(Box::new(FeedScraper::new(IEEE_SPECTRUM, config)?))
}

pub fn mit_news(config: &ScraperConfig) -> Result<Box<dyn Scraper>> {
    Ok(Box::new(FeedScraper::new(MIT_NEWS, config)?))
}

pub fn nvidia_blog(config: &ScraperConfig) -> Result<Box<dyn Scraper>> {
    Ok(Box::new(ListingScraper::new(NVIDIA_BLOG, config)?))
}

pub fn techcrunch(config: &ScraperConfig) -> Result<Box<dyn Scraper>> {
    Ok(Box::new(ListingScraper::new(TECHCRUNCH, config)?))
}

pub fn robot_report(config: &ScraperConfig) -> Result<Box<dyn Scraper>> {
    Ok(Box::new(ListingScraper::new(ROBOT_REPORT, config)?))
}
