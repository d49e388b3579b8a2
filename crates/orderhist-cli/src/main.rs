use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use orderhist_core::{load_app_config, load_credentials};
use orderhist_scraper::{OrderScraper, ScraperConfig, SessionStore};

#[derive(Debug, Parser)]
#[command(name = "orderhist")]
#[command(about = "Order history scraper command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Scrape the order history and print one JSON row per item.
    Orders {
        /// Maximum number of item rows to return.
        #[arg(long)]
        max_orders: Option<usize>,
        /// Run with a visible browser window.
        #[arg(long)]
        headed: bool,
    },
    /// Delete the persisted browser profile, forcing a fresh login.
    ResetSession,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let app_config = load_app_config().context("failed to load configuration")?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(app_config.log_level.clone())),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Orders { max_orders, headed } => {
            let credentials = load_credentials().context("failed to load credentials")?;
            let max_orders = max_orders.unwrap_or(app_config.max_orders);

            let mut config = ScraperConfig::from_app_config(&app_config);
            if headed {
                config.headless = false;
            }

            let scraper = OrderScraper::new(config);
            let rows = scraper
                .scrape_orders(&credentials, max_orders)
                .await
                .context("scrape failed")?;

            tracing::info!(rows = rows.len(), "scrape complete");
            let stdout = std::io::stdout();
            for row in &rows {
                serde_json::to_writer(stdout.lock(), row)?;
                println!();
            }
        }
        Commands::ResetSession => {
            let store = SessionStore::new(&app_config.session_dir);
            match std::fs::remove_dir_all(store.dir()) {
                Ok(()) => println!("session profile removed: {}", store.dir().display()),
                Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                    println!("no session profile at {}", store.dir().display());
                }
                Err(error) => {
                    return Err(error)
                        .context(format!("failed to remove {}", store.dir().display()));
                }
            }
        }
    }

    Ok(())
}
