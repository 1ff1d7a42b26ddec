use clap::{Args, Subcommand};
use rd_core::{Result, RunReport};

use crate::manager::ScraperManager;

pub const DEFAULT_MAX_ARTICLES: usize = 20;

#[derive(Args, Debug, Clone)]
pub struct ScraperArgs {
    /// Only scrape this source (name or alias, e.g. `ieee`, `techcrunch`). Scrapes all sources when omitted.
    #[arg(long)]
    pub source: Option<String>,
    /// Maximum number of articles taken from each source
    #[arg(long, default_value_t = DEFAULT_MAX_ARTICLES)]
    pub max_articles: usize,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ScraperCommands {
    /// List configured sources
    List,
    /// Show the topics found in a source's current articles without storing them
    Preview {
        source: String,
        #[arg(long, default_value_t = DEFAULT_MAX_ARTICLES)]
        max_articles: usize,
    },
}

/// One scrape cycle: every source, or the one named in `args`.
pub async fn run_scrape(args: &ScraperArgs, manager: &ScraperManager) -> Result<RunReport> {
    let report = match args.source.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(source) => manager.run_source(source, args.max_articles).await?,
        None => manager.run_all(args.max_articles).await,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(report)
}

pub async fn handle_command(command: ScraperCommands, manager: &ScraperManager) -> Result<()> {
    match command {
        ScraperCommands::List => {
            println!("Available scrapers:");
            for line in manager.list_scrapers() {
                println!("  - {}", line);
            }
        }
        ScraperCommands::Preview {
            source,
            max_articles,
        } => {
            let topics = manager.preview_topics(&source, max_articles).await?;
            if topics.is_empty() {
                println!("No topics found");
            }
            for (topic, count) in topics {
                println!("{:>4}  {}", count, topic);
            }
        }
    }
    Ok(())
}
