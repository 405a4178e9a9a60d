//! Bulk data importer
//!
//! Usage:
//! - `roomnest-import rooms listings.json` - scraped room listings
//! - `roomnest-import news daum.json`      - Daum news cluster export
//!
//! Uses the same configuration file and database as the server.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use roomnest::{
    config::Config,
    db::{
        self,
        repositories::{SqlxNewsRepository, SqlxReviewRepository, SqlxRoomRepository},
    },
    services::{NewsService, RoomService},
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Import room listings and news articles into Roomnest.")]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(long, env = "ROOMNEST_CONFIG", default_value = "config.yml")]
    config: PathBuf,

    /// Database URL, overriding the configuration.
    #[arg(long)]
    database: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import a JSON list of room listings (Korean or English keys).
    Rooms {
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
    /// Import a Daum news cluster export.
    News {
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
}

fn read_json(path: &Path) -> Result<Value> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("Invalid JSON in {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roomnest=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = Config::load_with_env(&cli.config)?;
    if let Some(url) = cli.database {
        config.database.url = url;
    }

    let pool = db::create_pool(&config.database).await?;
    db::migrations::run_migrations(&pool).await?;

    match cli.command {
        Command::Rooms { path } => {
            let payload = read_json(&path)?;
            let service = RoomService::new(
                SqlxRoomRepository::boxed(pool.clone()),
                SqlxReviewRepository::boxed(pool.clone()),
            );
            let summary = service
                .import(&payload)
                .await
                .with_context(|| format!("Room import from {} failed", path.display()))?;
            println!(
                "Imported rooms: {} created, {} updated",
                summary.created, summary.updated
            );
        }
        Command::News { path } => {
            let payload = read_json(&path)?;
            let service = NewsService::new(SqlxNewsRepository::boxed(pool.clone()));
            let created = service
                .import(&payload)
                .await
                .with_context(|| format!("News import from {} failed", path.display()))?;
            println!("Imported news: {} new articles", created);
        }
    }

    pool.close().await;
    Ok(())
}
