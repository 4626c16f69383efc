use std::sync::{Arc, Mutex};

use clap::{Parser, Subcommand};

use tender_scraper::config::Config;
use tender_scraper::{db, fetch, pipeline, web};

#[derive(Parser)]
#[command(name = "tender_scraper", about = "Tender listing scraper with web view")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scrape pipeline once and print counts
    Scrape,
    /// Start the web server (listing, health check, manual trigger)
    Run,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let cfg = Config::from_env();

    match cli.command {
        Commands::Scrape => {
            let conn = db::connect(&cfg.db_path)?;
            db::init_schema(&conn)?;
            let client = fetch::build_client(&cfg)?;
            let report = pipeline::run(&client, &cfg, &conn).await?;
            println!("Found {} items, added {} new.", report.extracted, report.inserted);
            if report.used_fallback {
                println!("Live fetch failed; fallback content was ingested.");
            }
            Ok(())
        }
        Commands::Run => {
            let conn = db::connect(&cfg.db_path)?;
            db::init_schema(&conn)?;
            let client = fetch::build_client(&cfg)?;
            let state = web::AppState {
                conn: Arc::new(Mutex::new(conn)),
                cfg: Arc::new(cfg),
                client,
            };
            web::serve(state).await
        }
    }
}
