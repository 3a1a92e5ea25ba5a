pub mod aggregates;
pub mod parser;

use sqlx::SqlitePool;
use tracing::info;

use crate::db::games::GameRepository;
use crate::db::rankings::RankingsRepository;
use crate::error::Result;
use crate::ingest::parser::{FeedParser, ParseStats};

#[derive(Debug)]
pub struct IngestSummary {
    pub stats: ParseStats,
    pub games_upserted: usize,
    pub seasons_recomputed: Vec<i32>,
}

/// Parses a feed, upserts its games, and recomputes aggregates for every
/// season the feed touched. Aggregates are rebuilt from the full stored
/// season, not just the new rows, so corrections propagate.
pub async fn run_ingest(
    pool: &SqlitePool,
    content: &str,
    delimiter: char,
    allowed_seasons: Option<Vec<i32>>,
) -> Result<IngestSummary> {
    let mut parser = FeedParser::new(delimiter);
    if let Some(seasons) = allowed_seasons {
        parser = parser.with_seasons(seasons);
    }
    let (games, stats) = parser.parse(content);
    info!(
        "Feed parsed: kept={} of {} rows (short={} incomplete={} game_type={} season={} malformed={})",
        stats.kept,
        stats.total_rows,
        stats.rejected_short_row,
        stats.rejected_incomplete,
        stats.rejected_game_type,
        stats.rejected_season,
        stats.rejected_malformed,
    );

    let game_repo = GameRepository::new(pool.clone());
    let rankings_repo = RankingsRepository::new(pool.clone());
    let games_upserted = game_repo.upsert_all(&games).await?;

    let mut seasons: Vec<i32> = games.iter().map(|g| g.season).collect();
    seasons.sort_unstable();
    seasons.dedup();
    for &season in &seasons {
        let season_games = game_repo.games_for_season(season).await?;
        let rows = aggregates::compute_season_aggregates(season, &season_games);
        info!("Recomputed {} aggregate rows for season {season}", rows.len());
        rankings_repo.replace_season(season, &rows).await?;
    }

    Ok(IngestSummary { stats, games_upserted, seasons_recomputed: seasons })
}
