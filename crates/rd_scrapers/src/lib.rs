pub mod cli;
pub mod fetch;
pub mod ingest;
pub mod logging;
pub mod manager;
pub mod scrapers;

pub use cli::{handle_command, run_scrape, ScraperArgs, ScraperCommands};
pub use fetch::ScraperConfig;
pub use ingest::{ArticleIngestor, DedupGate};
pub use manager::ScraperManager;
pub use rd_core::Scraper;

pub mod prelude {
    pub use super::fetch::ScraperConfig;
    pub use super::manager::ScraperManager;
    pub use rd_core::{RawArticle, Result, Error, RunReport, Scraper};
}
