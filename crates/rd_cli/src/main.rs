use chrono::{DateTime, Utc};
use clap::Parser;
use rd_core::{ArticleStore, Error, Result};
use rd_inference::{create_enrichers, InferenceConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
use rd_scrapers::cli::{handle_command, run_scrape, ScraperArgs, ScraperCommands};
use rd_scrapers::{ScraperConfig, ScraperManager};
use rd_web::AppState;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// A duration written as `30m`, `1h15m`, `1d` or a bare number of seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HumanDuration(Duration);

impl FromStr for HumanDuration {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut total_seconds = 0u64;
        let mut current_number = String::new();
        let mut has_number = false;

        for c in s.chars() {
            if c.is_ascii_digit() {
                current_number.push(c);
                continue;
            }
            if c.is_whitespace() {
                continue;
            }
            let num: u64 = current_number
                .parse()
                .map_err(|_| format!("Invalid character in duration: {}", c))?;
            let unit = match c {
                's' => 1,
                'm' => 60,
                'h' => 3600,
                'd' => 86400,
                _ => return Err(format!("Invalid duration unit: {}", c)),
            };
            total_seconds = num
                .checked_mul(unit)
                .and_then(|secs| total_seconds.checked_add(secs))
                .ok_or_else(|| format!("Duration is too long: {}", s))?;
            current_number.clear();
            has_number = true;
        }

        // Trailing number without a unit counts as seconds
        if !current_number.is_empty() {
            let secs = current_number
                .parse::<u64>()
                .map_err(|_| "Invalid number in duration".to_string())?;
            total_seconds = total_seconds
                .checked_add(secs)
                .ok_or_else(|| format!("Duration is too long: {}", s))?;
            has_number = true;
        }

        if !has_number {
            return Err("Duration must include a number".to_string());
        }
        if total_seconds == 0 {
            return Err("Duration must be greater than zero".to_string());
        }

        Ok(HumanDuration(Duration::from_secs(total_seconds)))
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Robotics news ingestion and enrichment", long_about = None)]
struct Cli {
    /// Storage backend: sqlite or memory
    #[arg(long, env = "STORAGE", default_value = "sqlite")]
    storage: String,
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,
    #[arg(long, env = "DEEPSEEK_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
    #[arg(long, env = "DEEPSEEK_MODEL", default_value = DEFAULT_MODEL)]
    model: String,
    #[arg(long, env = "DEEPSEEK_BASE_URL", default_value = DEFAULT_BASE_URL)]
    model_url: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Scrape, store and enrich articles
    Scrape {
        #[command(flatten)]
        args: ScraperArgs,
        /// Keep running, scraping again after each interval (e.g. 30m, 1h, 1h15m)
        #[arg(long)]
        interval: Option<HumanDuration>,
    },
    #[command(flatten)]
    Scraper(ScraperCommands),
    /// Serve the HTTP API
    Serve {
        #[arg(long, default_value = "0.0.0.0:3000")]
        addr: SocketAddr,
        #[arg(long, env = "ADMIN_API_KEY", hide_env_values = true)]
        admin_api_key: Option<String>,
    },
    /// Show the most mentioned topics
    Trending {
        #[arg(long, default_value_t = 7)]
        days: u64,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Delete articles scraped more than `days` ago
    Cleanup {
        #[arg(long, default_value_t = 90)]
        days: i64,
    },
}

impl Cli {
    fn inference_config(&self) -> InferenceConfig {
        InferenceConfig {
            model: self.model.clone(),
            base_url: self.model_url.clone(),
            ..Default::default()
        }
        .with_api_key(self.api_key.clone())
    }

    fn manager(&self, store: Arc<dyn ArticleStore>) -> Result<ScraperManager> {
        let enrichers = create_enrichers(&self.inference_config())?;
        let manager = ScraperManager::with_default_sources(store, enrichers, &ScraperConfig::default())?;
        let names: Vec<&str> = manager.scrapers().iter().map(|s| s.source()).collect();
        info!("🦗 Scrapers initialized: {}", names.join(", "));
        Ok(manager)
    }
}

async fn scrape(args: ScraperArgs, interval: Option<HumanDuration>, manager: &ScraperManager) -> Result<()> {
    info!(
        "🦗 Scraping articles from {}",
        args.source.as_deref().unwrap_or("all sources")
    );
    let Some(HumanDuration(interval)) = interval else {
        run_scrape(&args, manager).await?;
        return Ok(());
    };

    info!("Running in periodic mode with {}s interval", interval.as_secs());
    loop {
        info!("Starting scrape cycle");
        if let Err(e) = run_scrape(&args, manager).await {
            error!("Error during scrape: {}", e);
        }
        info!("Waiting {}s before next scrape", interval.as_secs());
        tokio::time::sleep(interval).await;
    }
}

async fn trending(store: &dyn ArticleStore, days: u64, limit: usize) -> Result<()> {
    let today = Utc::now().date_naive();
    let since = today
        .checked_sub_days(chrono::Days::new(days))
        .unwrap_or(today);
    let topics = store.trending_topics(since, limit).await?;
    if topics.is_empty() {
        println!("No trending topics since {}", since);
    }
    for topic in topics {
        println!(
            "{:>4}  {}  ({}, {} articles)",
            topic.mention_count,
            topic.topic_name,
            topic.date,
            topic.related_articles.len()
        );
    }
    Ok(())
}

/// Scrape time before which `cleanup` deletes articles.
fn cleanup_cutoff(days: i64) -> Result<DateTime<Utc>> {
    if days < 0 {
        return Err(Error::Config(format!("--days must not be negative, got {}", days)));
    }
    chrono::Duration::try_days(days)
        .and_then(|age| Utc::now().checked_sub_signed(age))
        .ok_or_else(|| Error::Config(format!("--days is out of range: {}", days)))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let cli = Cli::parse();

    let store = rd_storage::create_storage(&cli.storage, cli.database_url.as_deref()).await?;
    info!("💾 Storage initialized (using {})", cli.storage);

    match cli.command {
        Commands::Scrape { ref args, interval } => {
            let manager = cli.manager(store)?;
            scrape(args.clone(), interval, &manager).await?;
        }
        Commands::Scraper(ref command) => {
            let manager = cli.manager(store)?;
            handle_command(command.clone(), &manager).await?;
        }
        Commands::Serve {
            addr,
            ref admin_api_key,
        } => {
            if admin_api_key.is_none() {
                info!("ADMIN_API_KEY not set, admin endpoints are disabled");
            }
            let state = AppState {
                manager: Arc::new(cli.manager(store.clone())?),
                store,
                admin_api_key: admin_api_key.clone(),
            };
            rd_web::serve(addr, state).await?;
        }
        Commands::Trending { days, limit } => trending(store.as_ref(), days, limit).await?,
        Commands::Cleanup { days } => {
            let cutoff = cleanup_cutoff(days)?;
            let deleted = store.delete_older_than(cutoff).await?;
            info!("🧹 Deleted {} articles scraped before {}", deleted, cutoff.date_naive());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_duration() {
        let parse = |s: &str| s.parse::<HumanDuration>().map(|d| d.0.as_secs());
        assert_eq!(parse("30m"), Ok(1800));
        assert_eq!(parse("1h15m"), Ok(4500));
        assert_eq!(parse("1d 2h"), Ok(93600));
        assert_eq!(parse("90"), Ok(90));
        assert!(parse("").is_err());
        assert!(parse("h").is_err());
        assert!(parse("5w").is_err());
        assert!(parse("0m").is_err());
        assert!(parse("999999999999999999d").is_err());
        assert!(parse("18446744073709551615s1s").is_err());
    }

    #[test]
    fn test_cleanup_cutoff_bounds() {
        let cutoff = cleanup_cutoff(90).unwrap();
        assert_eq!((Utc::now() - cutoff).num_days(), 90);
        assert!(cleanup_cutoff(0).unwrap() <= Utc::now());

        assert!(matches!(cleanup_cutoff(-1), Err(Error::Config(_))));
        assert!(matches!(cleanup_cutoff(999_999_999_999_999), Err(Error::Config(_))));
        assert!(matches!(cleanup_cutoff(i64::MAX), Err(Error::Config(_))));
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["rd", "--storage", "memory", "scrape", "--source", "mit", "--interval", "1h"]).unwrap();
        assert_eq!(cli.storage, "memory");
        match cli.command {
            Commands::Scrape { args, interval } => {
                assert_eq!(args.source.as_deref(), Some("mit"));
                assert_eq!(args.max_articles, 20);
                assert_eq!(interval, Some(HumanDuration(Duration::from_secs(3600))));
            }
            other => panic!("unexpected command: {:?}", other),
        }

        let cli = Cli::try_parse_from(["rd", "list"]).unwrap();
        assert!(matches!(cli.command, Commands::Scraper(ScraperCommands::List)));

        let cli = Cli::try_parse_from(["rd", "cleanup"]).unwrap();
        assert!(matches!(cli.command, Commands::Cleanup { days: 90 }));
    }
}
