use sqlx::SqlitePool;

use crate::error::Result;
use crate::types::CompletedGame;

/// Write-side access to the `games` table. Rows are upserted by `game_id`;
/// re-ingesting a feed only corrects scores, never rewrites identity fields.
pub struct GameRepository {
    pool: SqlitePool,
}

impl GameRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn upsert(&self, game: &CompletedGame) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO games (
                game_id, season, game_type, week, gameday, weekday, gametime,
                away_team, away_score, home_team, home_score, location,
                away_moneyline, home_moneyline, spread_line, total_line, div_game
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(game_id) DO UPDATE SET
                home_score = excluded.home_score,
                away_score = excluded.away_score,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(&game.game_id)
        .bind(game.season)
        .bind(&game.game_type)
        .bind(game.week)
        .bind(&game.gameday)
        .bind(&game.weekday)
        .bind(&game.gametime)
        .bind(&game.away_team)
        .bind(game.away_score)
        .bind(&game.home_team)
        .bind(game.home_score)
        .bind(&game.location)
        .bind(game.away_moneyline)
        .bind(game.home_moneyline)
        .bind(game.spread_line)
        .bind(game.total_line)
        .bind(game.div_game)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn upsert_all(&self, games: &[CompletedGame]) -> Result<usize> {
        for game in games {
            self.upsert(game).await?;
        }
        Ok(games.len())
    }

    /// All completed regular-season games for one season, in schedule order.
    pub async fn games_for_season(&self, season: i32) -> Result<Vec<CompletedGame>> {
        let games = sqlx::query_as::<_, CompletedGame>(
            r#"
            SELECT game_id, season, game_type, week, gameday, weekday, gametime,
                   away_team, away_score, home_team, home_score, location,
                   away_moneyline, home_moneyline, spread_line, total_line, div_game
            FROM games
            WHERE season = ? AND game_type = 'REG'
            ORDER BY week, gameday, game_id
            "#,
        )
        .bind(season)
        .fetch_all(&self.pool)
        .await?;
        Ok(games)
    }

    /// Every team code that appears on either side of a stored game.
    pub async fn team_codes(&self) -> Result<Vec<String>> {
        let codes = sqlx::query_scalar::<_, String>(
            r#"
            SELECT home_team AS team FROM games
            UNION
            SELECT away_team FROM games
            ORDER BY 1
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(codes)
    }

    pub async fn game_count(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM games")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    fn fixture(game_id: &str, home_score: i32, away_score: i32) -> CompletedGame {
        CompletedGame {
            game_id: game_id.to_string(),
            season: 2024,
            game_type: "REG".to_string(),
            week: 1,
            gameday: "2024-09-08".to_string(),
            weekday: Some("Sunday".to_string()),
            gametime: Some("13:00".to_string()),
            away_team: "BUF".to_string(),
            away_score,
            home_team: "KC".to_string(),
            home_score,
            location: Some("Home".to_string()),
            away_moneyline: Some(120.0),
            home_moneyline: Some(-140.0),
            spread_line: Some(2.5),
            total_line: Some(47.5),
            div_game: false,
        }
    }

    #[tokio::test]
    async fn upsert_corrects_scores_without_duplicating() {
        let pool = test_pool().await;
        let repo = GameRepository::new(pool);

        repo.upsert(&fixture("2024_01_BUF_KC", 20, 17)).await.unwrap();
        repo.upsert(&fixture("2024_01_BUF_KC", 27, 17)).await.unwrap();

        assert_eq!(repo.game_count().await.unwrap(), 1);
        let games = repo.games_for_season(2024).await.unwrap();
        assert_eq!(games[0].home_score, 27);
    }

    #[tokio::test]
    async fn team_codes_are_distinct_and_sorted() {
        let pool = test_pool().await;
        let repo = GameRepository::new(pool);
        repo.upsert(&fixture("2024_01_BUF_KC", 20, 17)).await.unwrap();
        let mut other = fixture("2024_02_KC_DEN", 10, 24);
        other.home_team = "DEN".to_string();
        other.away_team = "KC".to_string();
        repo.upsert(&other).await.unwrap();

        assert_eq!(repo.team_codes().await.unwrap(), vec!["BUF", "DEN", "KC"]);
    }
}
