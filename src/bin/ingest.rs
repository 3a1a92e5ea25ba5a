//! Feed ingestion: `ingest <feed-file> [delimiter]`
//!
//! Reads a delimited game-results feed, upserts its games, and recomputes
//! the team-season aggregates for every season the feed touched. Set
//! `INGEST_SEASONS` to restrict which seasons are accepted from the feed.

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use spread_engine::config::{parse_seasons, Config};
use spread_engine::db;
use spread_engine::error::{AppError, Result};
use spread_engine::ingest::run_ingest;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Ingest failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    let mut args = std::env::args().skip(1);
    let path = args
        .next()
        .ok_or_else(|| AppError::Config("usage: ingest <feed-file> [delimiter]".to_string()))?;
    let delimiter = args
        .next()
        .and_then(|d| d.chars().next())
        .unwrap_or(',');
    let allowed_seasons = match std::env::var("INGEST_SEASONS") {
        Ok(raw) => Some(parse_seasons(&raw)?),
        Err(_) => None,
    };

    let content = tokio::fs::read_to_string(&path).await?;
    let pool = db::connect(&cfg.db_path, cfg.db_max_connections).await?;
    info!("Ingesting {path} into {} (delimiter '{delimiter}')", cfg.db_path);

    let summary = run_ingest(&pool, &content, delimiter, allowed_seasons).await?;
    info!(
        "Ingest complete: {} games upserted, seasons recomputed: {:?}",
        summary.games_upserted, summary.seasons_recomputed
    );
    Ok(())
}
