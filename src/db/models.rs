use serde::Serialize;

/// Season-pooled win rate per team, from the `team_rankings` table. Ties
/// count as half a win, matching the aggregation pipeline.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TeamWinRate {
    pub team_id: String,
    pub win_rate: f64,
}
