use std::sync::Arc;

use rd_core::ArticleStore;
use rd_scrapers::ScraperManager;

/// Maximum articles per source for scrapes triggered over HTTP.
pub const ADMIN_SCRAPE_MAX_ARTICLES: usize = 20;

pub struct AppState {
    pub store: Arc<dyn ArticleStore>,
    pub manager: Arc<ScraperManager>,
    /// `None` disables the admin endpoints.
    pub admin_api_key: Option<String>,
}
