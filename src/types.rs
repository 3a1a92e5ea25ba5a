use serde::{Deserialize, Serialize};

use crate::config::{STRONG_TIER_MIN_WIN_RATE, WEAK_TIER_MAX_WIN_RATE};

// ---------------------------------------------------------------------------
// Completed games
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GameType {
    Reg,
    Post,
    Pre,
}

impl GameType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "REG" => Some(GameType::Reg),
            "POST" => Some(GameType::Post),
            "PRE" => Some(GameType::Pre),
            _ => None,
        }
    }
}

impl std::fmt::Display for GameType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GameType::Reg => "REG",
            GameType::Post => "POST",
            GameType::Pre => "PRE",
        };
        write!(f, "{s}")
    }
}

/// Immutable historical game record. Both scores are always present; the
/// feed parser drops rows for games that have not completed. Betting lines
/// may be absent for games without a market.
///
/// Spread convention: positive `spread_line` means the home team was favored
/// by that many points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CompletedGame {
    pub game_id: String,
    pub season: i32,
    pub game_type: String,
    pub week: i32,
    pub gameday: String,
    pub weekday: Option<String>,
    pub gametime: Option<String>,
    pub away_team: String,
    pub away_score: i32,
    pub home_team: String,
    pub home_score: i32,
    pub location: Option<String>,
    pub away_moneyline: Option<f64>,
    pub home_moneyline: Option<f64>,
    pub spread_line: Option<f64>,
    pub total_line: Option<f64>,
    pub div_game: bool,
}

/// How a single game resolved against the spread from one team's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtsOutcome {
    Cover,
    Loss,
    Push,
}

impl CompletedGame {
    pub fn home_margin(&self) -> i32 {
        self.home_score - self.away_score
    }

    pub fn home_won(&self) -> bool {
        self.home_score > self.away_score
    }

    pub fn tied(&self) -> bool {
        self.home_score == self.away_score
    }

    /// Whether the home side was the market favorite. None when the game
    /// carried no line or was a pick'em.
    pub fn home_favored(&self) -> Option<bool> {
        match self.spread_line {
            Some(line) if line > 0.0 => Some(true),
            Some(line) if line < 0.0 => Some(false),
            _ => None,
        }
    }

    /// ATS result from one side's perspective. The home side covers when its
    /// margin beats the line; the away side covers when the margin falls
    /// short of it; equal is a push. None when no line was posted.
    pub fn ats_outcome(&self, home_side: bool) -> Option<AtsOutcome> {
        let line = self.spread_line?;
        let margin = f64::from(self.home_margin());
        let outcome = if margin == line {
            AtsOutcome::Push
        } else if (margin > line) == home_side {
            AtsOutcome::Cover
        } else {
            AtsOutcome::Loss
        };
        Some(outcome)
    }
}

// ---------------------------------------------------------------------------
// Spread buckets (situation classifier)
// ---------------------------------------------------------------------------

/// Discretized spread magnitude used to scope the situational ATS signal.
/// Upper bounds are inclusive: 10.0 falls in `SevenToTen`, not `TenPlus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpreadBucket {
    /// magnitude in [0, 2]
    UpToTwo,
    /// magnitude in (2, 4]
    TwoToFour,
    /// magnitude in (4, 7]
    FourToSeven,
    /// magnitude in (7, 10]
    SevenToTen,
    /// magnitude above 10
    TenPlus,
}

impl SpreadBucket {
    pub fn from_magnitude(magnitude: f64) -> Self {
        if magnitude <= 2.0 {
            SpreadBucket::UpToTwo
        } else if magnitude <= 4.0 {
            SpreadBucket::TwoToFour
        } else if magnitude <= 7.0 {
            SpreadBucket::FourToSeven
        } else if magnitude <= 10.0 {
            SpreadBucket::SevenToTen
        } else {
            SpreadBucket::TenPlus
        }
    }

    /// (exclusive lower, inclusive upper) magnitude bounds for SQL range
    /// predicates. The first bucket's lower bound sits below zero so that a
    /// 0-point magnitude is admitted; the last bucket's upper bound is a
    /// sentinel no real spread reaches.
    pub fn bounds(&self) -> (f64, f64) {
        match self {
            SpreadBucket::UpToTwo => (-1.0, 2.0),
            SpreadBucket::TwoToFour => (2.0, 4.0),
            SpreadBucket::FourToSeven => (4.0, 7.0),
            SpreadBucket::SevenToTen => (7.0, 10.0),
            SpreadBucket::TenPlus => (10.0, 1000.0),
        }
    }
}

impl std::fmt::Display for SpreadBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SpreadBucket::UpToTwo => "0-2",
            SpreadBucket::TwoToFour => "2-4",
            SpreadBucket::FourToSeven => "4-7",
            SpreadBucket::SevenToTen => "7-10",
            SpreadBucket::TenPlus => "10+",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Locations and opponent tiers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    Home,
    Away,
}

impl Location {
    pub fn opposite(&self) -> Self {
        match self {
            Location::Home => Location::Away,
            Location::Away => Location::Home,
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Location::Home => write!(f, "Home"),
            Location::Away => write!(f, "Away"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OpponentTier {
    Strong,
    Weak,
    Mediocre,
}

impl OpponentTier {
    pub fn from_win_rate(win_rate: f64) -> Self {
        if win_rate > STRONG_TIER_MIN_WIN_RATE {
            OpponentTier::Strong
        } else if win_rate < WEAK_TIER_MAX_WIN_RATE {
            OpponentTier::Weak
        } else {
            OpponentTier::Mediocre
        }
    }
}

impl std::fmt::Display for OpponentTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OpponentTier::Strong => "Strong",
            OpponentTier::Weak => "Weak",
            OpponentTier::Mediocre => "Mediocre",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Team-season aggregates
// ---------------------------------------------------------------------------

/// One row per (team, season), derived wholesale from that season's games.
/// Owned by the aggregation pipeline; the prediction engine only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct TeamSeasonAggregate {
    pub team_id: String,
    pub season: i32,
    pub games_played: i32,
    pub wins: i32,
    pub losses: i32,
    pub ties: i32,
    pub win_rate: f64,
    pub total_points_scored: i32,
    pub total_points_allowed: i32,
    pub avg_points_scored: f64,
    pub avg_points_allowed: f64,
    pub point_differential: i32,
    pub avg_point_differential: f64,
    pub offensive_rank: i32,
    pub defensive_rank: i32,
    pub overall_rank: i32,
    pub home_games: i32,
    pub home_wins: i32,
    pub home_losses: i32,
    pub home_win_rate: f64,
    pub home_avg_points_scored: f64,
    pub home_avg_points_allowed: f64,
    pub away_games: i32,
    pub away_wins: i32,
    pub away_losses: i32,
    pub away_win_rate: f64,
    pub away_avg_points_scored: f64,
    pub away_avg_points_allowed: f64,
    pub div_games: i32,
    pub div_wins: i32,
    pub div_losses: i32,
    pub div_win_rate: f64,
    pub ats_wins: i32,
    pub ats_losses: i32,
    pub ats_pushes: i32,
    pub ats_cover_rate: f64,
    pub avg_spread_line: Option<f64>,
    pub avg_total_line: Option<f64>,
    pub times_favored: i32,
    pub times_underdog: i32,
}

// ---------------------------------------------------------------------------
// Signal results
// ---------------------------------------------------------------------------

/// Pairwise comparison produced by one signal calculator. The normalized
/// scores always sum to 1.0; missing data yields the uninformative 0.5/0.5
/// pair instead of an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalResult {
    pub favored_rate: f64,
    pub underdog_rate: f64,
    pub favored_normalized: f64,
    pub underdog_normalized: f64,
    pub favored_record: String,
    pub underdog_record: String,
    /// Combined sample size behind both rates.
    pub sample_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub situation: Option<String>,
}

impl SignalResult {
    /// Normalize a favored/underdog rate pair. Both rates are non-negative;
    /// when the denominator is zero the signal is uninformative and both
    /// sides get 0.5.
    pub fn pairwise(
        favored_rate: f64,
        underdog_rate: f64,
        favored_record: String,
        underdog_record: String,
        sample_size: u32,
        situation: Option<String>,
    ) -> Self {
        let total = favored_rate + underdog_rate;
        let (favored_normalized, underdog_normalized) = if total > 0.0 {
            (favored_rate / total, underdog_rate / total)
        } else {
            (0.5, 0.5)
        };
        Self {
            favored_rate: round3(favored_rate),
            underdog_rate: round3(underdog_rate),
            favored_normalized,
            underdog_normalized,
            favored_record,
            underdog_record,
            sample_size,
            situation,
        }
    }

    /// Neutral result used when a signal's queries failed or timed out.
    pub fn neutral() -> Self {
        Self::pairwise(0.5, 0.5, "N/A".to_string(), "N/A".to_string(), 0, None)
    }
}

// ---------------------------------------------------------------------------
// Prediction request / result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct PredictionRequest {
    pub team_a: String,
    pub team_b: String,
    /// Negative = team_a favored (market convention for a team_a line).
    pub spread: f64,
    pub team_a_home: bool,
    /// Seasons to draw history from; server default applied when omitted.
    #[serde(default)]
    pub seasons: Vec<i32>,
    /// Season/week of the game being predicted; bounds the recent-form window.
    pub current_season: Option<i32>,
    pub current_week: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    pub favored_cover_probability: f64,
    pub underdog_cover_probability: f64,
    pub recommended_bet: String,
    pub confidence: f64,
    pub edge: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DivisionalSummary {
    pub is_divisional: bool,
    pub divisional_ats: f64,
    pub non_divisional_ats: f64,
    pub divisional_games: u32,
    pub non_divisional_games: u32,
    /// Applied to the favorite's probability (direct-weighted policy).
    pub adjustment: f64,
}

impl DivisionalSummary {
    pub fn neutral() -> Self {
        Self {
            is_divisional: false,
            divisional_ats: 0.5,
            non_divisional_ats: 0.5,
            divisional_games: 0,
            non_divisional_games: 0,
            adjustment: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OpponentStrengthSummary {
    pub opponent_tier: OpponentTier,
    pub opponent_win_rate: f64,
    /// The favorite's historical cover rate against this tier.
    pub ats_vs_tier: f64,
    pub games_vs_tier: u32,
    pub adjustment: f64,
}

impl OpponentStrengthSummary {
    pub fn neutral() -> Self {
        Self {
            opponent_tier: OpponentTier::Mediocre,
            opponent_win_rate: 0.5,
            ats_vs_tier: 0.5,
            games_vs_tier: 0,
            adjustment: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictionBreakdown {
    pub situational_ats: SignalResult,
    pub overall_ats: SignalResult,
    pub home_away: SignalResult,
    pub recent_form: SignalResult,
    pub divisional: DivisionalSummary,
    pub opponent_strength: OpponentStrengthSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictionResult {
    /// "AWAY @ HOME"
    pub matchup: String,
    /// Line from the favorite's perspective, e.g. "KC -2.5".
    pub spread_line: String,
    pub favored_team: String,
    pub underdog_team: String,
    pub prediction: Prediction,
    pub breakdown: PredictionBreakdown,
}

pub(crate) fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(home_score: i32, away_score: i32, spread_line: Option<f64>) -> CompletedGame {
        CompletedGame {
            game_id: "2024_01_BUF_KC".to_string(),
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
            location: None,
            away_moneyline: None,
            home_moneyline: None,
            spread_line,
            total_line: None,
            div_game: false,
        }
    }

    #[test]
    fn bucket_upper_bounds_are_inclusive() {
        assert_eq!(SpreadBucket::from_magnitude(0.0), SpreadBucket::UpToTwo);
        assert_eq!(SpreadBucket::from_magnitude(2.0), SpreadBucket::UpToTwo);
        assert_eq!(SpreadBucket::from_magnitude(2.5), SpreadBucket::TwoToFour);
        assert_eq!(SpreadBucket::from_magnitude(4.0), SpreadBucket::TwoToFour);
        assert_eq!(SpreadBucket::from_magnitude(7.0), SpreadBucket::FourToSeven);
        assert_eq!(SpreadBucket::from_magnitude(10.0), SpreadBucket::SevenToTen);
        assert_eq!(SpreadBucket::from_magnitude(10.5), SpreadBucket::TenPlus);
    }

    #[test]
    fn ats_outcome_home_favorite() {
        // Home favored by 3, wins by 7: home covers, away loses.
        let g = game(27, 20, Some(3.0));
        assert_eq!(g.ats_outcome(true), Some(AtsOutcome::Cover));
        assert_eq!(g.ats_outcome(false), Some(AtsOutcome::Loss));
    }

    #[test]
    fn ats_outcome_push_and_missing_line() {
        let g = game(23, 20, Some(3.0));
        assert_eq!(g.ats_outcome(true), Some(AtsOutcome::Push));
        assert_eq!(g.ats_outcome(false), Some(AtsOutcome::Push));
        assert_eq!(game(23, 20, None).ats_outcome(true), None);
    }

    #[test]
    fn ats_outcome_home_underdog_covers_by_losing_close() {
        // Away favored by 6 (line -6), home loses by 3: home covers.
        let g = game(17, 20, Some(-6.0));
        assert_eq!(g.ats_outcome(true), Some(AtsOutcome::Cover));
        assert_eq!(g.ats_outcome(false), Some(AtsOutcome::Loss));
    }

    #[test]
    fn pairwise_normalization_sums_to_one() {
        let s = SignalResult::pairwise(
            0.667,
            0.4,
            "4-2".to_string(),
            "2-3".to_string(),
            11,
            None,
        );
        assert!((s.favored_normalized + s.underdog_normalized - 1.0).abs() < 1e-12);
        assert!((s.favored_normalized - 0.625).abs() < 0.001);
    }

    #[test]
    fn pairwise_zero_denominator_goes_neutral() {
        let s = SignalResult::pairwise(0.0, 0.0, "0-0".to_string(), "0-0".to_string(), 0, None);
        assert_eq!(s.favored_normalized, 0.5);
        assert_eq!(s.underdog_normalized, 0.5);
    }

    #[test]
    fn tier_boundaries() {
        assert_eq!(OpponentTier::from_win_rate(0.70), OpponentTier::Strong);
        assert_eq!(OpponentTier::from_win_rate(10.0 / 17.0), OpponentTier::Mediocre);
        assert_eq!(OpponentTier::from_win_rate(0.5), OpponentTier::Mediocre);
        assert_eq!(OpponentTier::from_win_rate(0.30), OpponentTier::Weak);
    }
}
