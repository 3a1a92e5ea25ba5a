use sqlx::SqlitePool;

use crate::error::Result;
use crate::types::TeamSeasonAggregate;

/// Write-side access to the `team_rankings` table. A season's rows are
/// derived wholesale from its games, so writes replace the whole season.
pub struct RankingsRepository {
    pool: SqlitePool,
}

impl RankingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Replaces every aggregate row for one season inside a transaction, so
    /// readers never observe a half-recomputed season.
    pub async fn replace_season(&self, season: i32, rows: &[TeamSeasonAggregate]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM team_rankings WHERE season = ?")
            .bind(season)
            .execute(&mut *tx)
            .await?;
        for row in rows {
            sqlx::query(
                r#"
                INSERT INTO team_rankings (
                    team_id, season, games_played, wins, losses, ties, win_rate,
                    total_points_scored, total_points_allowed,
                    avg_points_scored, avg_points_allowed,
                    point_differential, avg_point_differential,
                    offensive_rank, defensive_rank, overall_rank,
                    home_games, home_wins, home_losses, home_win_rate,
                    home_avg_points_scored, home_avg_points_allowed,
                    away_games, away_wins, away_losses, away_win_rate,
                    away_avg_points_scored, away_avg_points_allowed,
                    div_games, div_wins, div_losses, div_win_rate,
                    ats_wins, ats_losses, ats_pushes, ats_cover_rate,
                    avg_spread_line, avg_total_line, times_favored, times_underdog
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?,
                          ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&row.team_id)
            .bind(row.season)
            .bind(row.games_played)
            .bind(row.wins)
            .bind(row.losses)
            .bind(row.ties)
            .bind(row.win_rate)
            .bind(row.total_points_scored)
            .bind(row.total_points_allowed)
            .bind(row.avg_points_scored)
            .bind(row.avg_points_allowed)
            .bind(row.point_differential)
            .bind(row.avg_point_differential)
            .bind(row.offensive_rank)
            .bind(row.defensive_rank)
            .bind(row.overall_rank)
            .bind(row.home_games)
            .bind(row.home_wins)
            .bind(row.home_losses)
            .bind(row.home_win_rate)
            .bind(row.home_avg_points_scored)
            .bind(row.home_avg_points_allowed)
            .bind(row.away_games)
            .bind(row.away_wins)
            .bind(row.away_losses)
            .bind(row.away_win_rate)
            .bind(row.away_avg_points_scored)
            .bind(row.away_avg_points_allowed)
            .bind(row.div_games)
            .bind(row.div_wins)
            .bind(row.div_losses)
            .bind(row.div_win_rate)
            .bind(row.ats_wins)
            .bind(row.ats_losses)
            .bind(row.ats_pushes)
            .bind(row.ats_cover_rate)
            .bind(row.avg_spread_line)
            .bind(row.avg_total_line)
            .bind(row.times_favored)
            .bind(row.times_underdog)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn rankings_for_season(&self, season: i32) -> Result<Vec<TeamSeasonAggregate>> {
        let rows = sqlx::query_as::<_, TeamSeasonAggregate>(
            r#"
            SELECT team_id, season, games_played, wins, losses, ties, win_rate,
                   total_points_scored, total_points_allowed,
                   avg_points_scored, avg_points_allowed,
                   point_differential, avg_point_differential,
                   offensive_rank, defensive_rank, overall_rank,
                   home_games, home_wins, home_losses, home_win_rate,
                   home_avg_points_scored, home_avg_points_allowed,
                   away_games, away_wins, away_losses, away_win_rate,
                   away_avg_points_scored, away_avg_points_allowed,
                   div_games, div_wins, div_losses, div_win_rate,
                   ats_wins, ats_losses, ats_pushes, ats_cover_rate,
                   avg_spread_line, avg_total_line, times_favored, times_underdog
            FROM team_rankings
            WHERE season = ?
            ORDER BY overall_rank, team_id
            "#,
        )
        .bind(season)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
