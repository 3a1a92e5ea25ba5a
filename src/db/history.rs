use std::collections::HashMap;

use sqlx::SqlitePool;

use crate::db::season_list;
use crate::db::models::TeamWinRate;
use crate::error::Result;
use crate::types::{CompletedGame, TeamSeasonAggregate};

/// Read-only accessors the prediction engine draws history from. A team
/// with no qualifying rows yields an empty result, never an error.
#[derive(Clone)]
pub struct HistoryReader {
    pool: SqlitePool,
}

impl HistoryReader {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Liveness probe run once per prediction before any signal query.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Every completed regular-season game a team appeared in across the
    /// requested seasons, oldest first.
    pub async fn team_games(&self, team: &str, seasons: &[i32]) -> Result<Vec<CompletedGame>> {
        if seasons.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            r#"
            SELECT game_id, season, game_type, week, gameday, weekday, gametime,
                   away_team, away_score, home_team, home_score, location,
                   away_moneyline, home_moneyline, spread_line, total_line, div_game
            FROM games
            WHERE (home_team = ? OR away_team = ?)
              AND season IN ({})
              AND game_type = 'REG'
            ORDER BY season, week, gameday
            "#,
            season_list(seasons)
        );
        let games = sqlx::query_as::<_, CompletedGame>(&sql)
            .bind(team)
            .bind(team)
            .fetch_all(&self.pool)
            .await?;
        Ok(games)
    }

    /// Per-season aggregate rows for a pair of teams.
    pub async fn season_aggregates(
        &self,
        team_a: &str,
        team_b: &str,
        seasons: &[i32],
    ) -> Result<Vec<TeamSeasonAggregate>> {
        if seasons.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
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
            WHERE team_id IN (?, ?)
              AND season IN ({})
            ORDER BY team_id, season
            "#,
            season_list(seasons)
        );
        let rows = sqlx::query_as::<_, TeamSeasonAggregate>(&sql)
            .bind(team_a)
            .bind(team_b)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Season-pooled win rate per team, used to tier opponents by strength.
    pub async fn win_rates(&self, seasons: &[i32]) -> Result<HashMap<String, f64>> {
        if seasons.is_empty() {
            return Ok(HashMap::new());
        }
        let sql = format!(
            r#"
            SELECT team_id,
                   (CAST(SUM(wins) AS REAL) + 0.5 * SUM(ties)) / SUM(games_played) AS win_rate
            FROM team_rankings
            WHERE season IN ({})
            GROUP BY team_id
            HAVING SUM(games_played) > 0
            "#,
            season_list(seasons)
        );
        let rows = sqlx::query_as::<_, TeamWinRate>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|r| (r.team_id, r.win_rate)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::games::GameRepository;
    use crate::db::test_pool;

    fn game(id: &str, season: i32, week: i32, home: &str, away: &str) -> CompletedGame {
        CompletedGame {
            game_id: id.to_string(),
            season,
            game_type: "REG".to_string(),
            week,
            gameday: format!("2024-09-{:02}", week),
            weekday: None,
            gametime: None,
            away_team: away.to_string(),
            away_score: 17,
            home_team: home.to_string(),
            home_score: 24,
            location: None,
            away_moneyline: None,
            home_moneyline: None,
            spread_line: Some(3.0),
            total_line: None,
            div_game: false,
        }
    }

    #[tokio::test]
    async fn team_games_spans_both_sides_and_filters_seasons() {
        let pool = test_pool().await;
        let repo = GameRepository::new(pool.clone());
        repo.upsert(&game("2024_01_BUF_KC", 2024, 1, "KC", "BUF")).await.unwrap();
        repo.upsert(&game("2024_02_KC_DEN", 2024, 2, "DEN", "KC")).await.unwrap();
        repo.upsert(&game("2023_01_BUF_KC", 2023, 1, "KC", "BUF")).await.unwrap();

        let reader = HistoryReader::new(pool);
        let games = reader.team_games("KC", &[2024]).await.unwrap();
        assert_eq!(games.len(), 2);
        assert!(games.iter().all(|g| g.season == 2024));
        // Oldest first.
        assert_eq!(games[0].week, 1);

        assert!(reader.team_games("SEA", &[2024]).await.unwrap().is_empty());
        assert!(reader.team_games("KC", &[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn ping_succeeds_on_live_pool() {
        let pool = test_pool().await;
        HistoryReader::new(pool).ping().await.unwrap();
    }
}
