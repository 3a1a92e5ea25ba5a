//! Signal calculators. Each one turns already-fetched history into a
//! pairwise comparison (or a small fixed adjustment) between the favorite
//! and the underdog. All of them are pure functions over slices, so sparse
//! data degrades to a neutral result instead of erroring.

use std::collections::HashMap;

use crate::config::{
    DIVISIONAL_FAVORITE_PENALTY, RECENT_FORM_WINDOW, STRONG_OPPONENT_ADJUSTMENT,
    WEAK_OPPONENT_ADJUSTMENT,
};
use crate::types::{
    round3, AtsOutcome, CompletedGame, DivisionalSummary, Location, OpponentStrengthSummary,
    OpponentTier, SignalResult, SpreadBucket, TeamSeasonAggregate,
};

fn rate_or_neutral(wins: u32, total: u32) -> f64 {
    if total > 0 {
        f64::from(wins) / f64::from(total)
    } else {
        0.5
    }
}

fn record(wins: u32, total: u32) -> String {
    format!("{}-{}", wins, total - wins)
}

/// Whether `team` played the home side of `game`.
fn played_home(team: &str, game: &CompletedGame) -> bool {
    game.home_team == team
}

/// Whether `team` was the market favorite in `game`. None for pick'ems and
/// games without a line.
fn was_favorite(team: &str, game: &CompletedGame) -> Option<bool> {
    game.home_favored().map(|home| home == played_home(team, game))
}

/// ATS result for `team`'s side of `game`, only when the team held the given
/// role (favorite or underdog). A push counts as a non-cover, matching how
/// the records are reported.
fn covered_in_role(team: &str, game: &CompletedGame, as_favorite: bool) -> Option<bool> {
    if was_favorite(team, game)? != as_favorite {
        return None;
    }
    let outcome = game.ats_outcome(played_home(team, game))?;
    Some(outcome == AtsOutcome::Cover)
}

fn count_ats(results: impl Iterator<Item = bool>) -> (u32, u32) {
    let mut wins = 0;
    let mut total = 0;
    for covered in results {
        total += 1;
        if covered {
            wins += 1;
        }
    }
    (wins, total)
}

// ---------------------------------------------------------------------------
// Situational ATS
// ---------------------------------------------------------------------------

/// Cover rate for the favorite as a favorite of this spread bucket at its
/// actual location, against the underdog's cover rate as an underdog of the
/// same bucket at the opposite location.
pub fn situational_ats(
    favored: &str,
    favored_games: &[CompletedGame],
    underdog: &str,
    underdog_games: &[CompletedGame],
    favored_home: bool,
    bucket: SpreadBucket,
) -> SignalResult {
    let (lower, upper) = bucket.bounds();
    let in_bucket = |game: &CompletedGame| {
        game.spread_line
            .map(|line| line.abs() > lower && line.abs() <= upper)
            .unwrap_or(false)
    };

    let (fav_wins, fav_total) = count_ats(favored_games.iter().filter_map(|g| {
        if played_home(favored, g) != favored_home || !in_bucket(g) {
            return None;
        }
        covered_in_role(favored, g, true)
    }));
    let (und_wins, und_total) = count_ats(underdog_games.iter().filter_map(|g| {
        if played_home(underdog, g) == favored_home || !in_bucket(g) {
            return None;
        }
        covered_in_role(underdog, g, false)
    }));

    let fav_loc = if favored_home { Location::Home } else { Location::Away };
    let und_loc = fav_loc.opposite();
    SignalResult::pairwise(
        rate_or_neutral(fav_wins, fav_total),
        rate_or_neutral(und_wins, und_total),
        record(fav_wins, fav_total),
        record(und_wins, und_total),
        fav_total + und_total,
        Some(format!(
            "{favored} {fav_loc} Favorite {bucket}, {underdog} {und_loc} Underdog {bucket}"
        )),
    )
}

// ---------------------------------------------------------------------------
// Overall ATS
// ---------------------------------------------------------------------------

/// Season-weighted ATS cover rate per team, weighted by games played.
pub fn overall_ats(
    favored: &str,
    underdog: &str,
    aggregates: &[TeamSeasonAggregate],
) -> SignalResult {
    let weighted = |team: &str| {
        let rows: Vec<&TeamSeasonAggregate> =
            aggregates.iter().filter(|a| a.team_id == team).collect();
        let games: i32 = rows.iter().map(|a| a.games_played).sum();
        if games == 0 {
            return (0.5, 0, 0, 0);
        }
        let rate = rows
            .iter()
            .map(|a| a.ats_cover_rate * f64::from(a.games_played))
            .sum::<f64>()
            / f64::from(games);
        let wins: i32 = rows.iter().map(|a| a.ats_wins).sum();
        let losses: i32 = rows.iter().map(|a| a.ats_losses).sum();
        (rate, wins, losses, games)
    };

    let (fav_rate, fav_wins, fav_losses, fav_games) = weighted(favored);
    let (und_rate, und_wins, und_losses, und_games) = weighted(underdog);
    let fav_record =
        if fav_games > 0 { format!("{fav_wins}-{fav_losses}") } else { "N/A".to_string() };
    let und_record =
        if und_games > 0 { format!("{und_wins}-{und_losses}") } else { "N/A".to_string() };

    SignalResult::pairwise(
        fav_rate,
        und_rate,
        fav_record,
        und_record,
        (fav_games + und_games) as u32,
        None,
    )
}

// ---------------------------------------------------------------------------
// Home/away performance
// ---------------------------------------------------------------------------

/// Season-weighted win rate at the location each team will actually occupy.
pub fn home_away(
    favored: &str,
    underdog: &str,
    favored_home: bool,
    aggregates: &[TeamSeasonAggregate],
) -> SignalResult {
    let weighted = |team: &str, home: bool| {
        let rows = aggregates.iter().filter(|a| a.team_id == team);
        let (mut rate_sum, mut games, mut wins, mut losses) = (0.0, 0, 0, 0);
        for a in rows {
            if home {
                rate_sum += a.home_win_rate * f64::from(a.home_games);
                games += a.home_games;
                wins += a.home_wins;
                losses += a.home_losses;
            } else {
                rate_sum += a.away_win_rate * f64::from(a.away_games);
                games += a.away_games;
                wins += a.away_wins;
                losses += a.away_losses;
            }
        }
        if games == 0 {
            (0.5, 0, "N/A".to_string())
        } else {
            (rate_sum / f64::from(games), games, format!("{wins}-{losses}"))
        }
    };

    let (fav_rate, fav_games, fav_record) = weighted(favored, favored_home);
    let (und_rate, und_games, und_record) = weighted(underdog, !favored_home);

    SignalResult::pairwise(
        fav_rate,
        und_rate,
        fav_record,
        und_record,
        (fav_games + und_games) as u32,
        None,
    )
}

// ---------------------------------------------------------------------------
// Recent form
// ---------------------------------------------------------------------------

/// Outright win rate over each team's last few completed games before the
/// cutoff. `games` must be in schedule order (oldest first).
pub fn recent_form(
    favored: &str,
    favored_games: &[CompletedGame],
    underdog: &str,
    underdog_games: &[CompletedGame],
    cutoff: Option<(i32, i32)>,
) -> SignalResult {
    let form = |team: &str, games: &[CompletedGame]| {
        let window: Vec<&CompletedGame> = games
            .iter()
            .filter(|g| match cutoff {
                Some((season, week)) => {
                    g.season < season || (g.season == season && g.week < week)
                }
                None => true,
            })
            .collect();
        let recent: Vec<&CompletedGame> = window
            .iter()
            .rev()
            .take(RECENT_FORM_WINDOW as usize)
            .copied()
            .collect();
        let total = recent.len() as u32;
        let wins = recent
            .iter()
            .filter(|g| {
                let home = played_home(team, g);
                (home && g.home_won()) || (!home && !g.home_won() && !g.tied())
            })
            .count() as u32;
        (wins, total)
    };

    let (fav_wins, fav_total) = form(favored, favored_games);
    let (und_wins, und_total) = form(underdog, underdog_games);

    SignalResult::pairwise(
        rate_or_neutral(fav_wins, fav_total),
        rate_or_neutral(und_wins, und_total),
        record(fav_wins, fav_total),
        record(und_wins, und_total),
        fav_total + und_total,
        None,
    )
}

// ---------------------------------------------------------------------------
// Divisional adjustment
// ---------------------------------------------------------------------------

/// Flags divisional rivalries and reports the favorite's ATS split between
/// divisional and non-divisional games (favorite role only). Divisional
/// underdogs cover more often, so a divisional matchup costs the favorite a
/// fixed penalty.
pub fn divisional(
    favored: &str,
    favored_games: &[CompletedGame],
    underdog: &str,
) -> DivisionalSummary {
    let is_divisional = favored_games
        .iter()
        .find(|g| g.home_team == underdog || g.away_team == underdog)
        .map(|g| g.div_game)
        .unwrap_or(false);

    let split = |div: bool| {
        count_ats(
            favored_games
                .iter()
                .filter(|g| g.div_game == div)
                .filter_map(|g| covered_in_role(favored, g, true)),
        )
    };
    let (div_wins, div_total) = split(true);
    let (non_div_wins, non_div_total) = split(false);

    DivisionalSummary {
        is_divisional,
        divisional_ats: round3(rate_or_neutral(div_wins, div_total)),
        non_divisional_ats: round3(rate_or_neutral(non_div_wins, non_div_total)),
        divisional_games: div_total,
        non_divisional_games: non_div_total,
        adjustment: if is_divisional { DIVISIONAL_FAVORITE_PENALTY } else { 0.0 },
    }
}

// ---------------------------------------------------------------------------
// Opponent strength
// ---------------------------------------------------------------------------

/// Tiers the underdog by season win rate, then reports the favorite's ATS
/// record against opponents of that tier and the fixed adjustment the tier
/// carries. Opponents missing from the win-rate map default to Mediocre.
pub fn opponent_strength(
    favored: &str,
    favored_games: &[CompletedGame],
    underdog: &str,
    win_rates: &HashMap<String, f64>,
) -> OpponentStrengthSummary {
    let opponent_win_rate = win_rates.get(underdog).copied().unwrap_or(0.5);
    let tier = OpponentTier::from_win_rate(opponent_win_rate);

    let (wins, total) = count_ats(favored_games.iter().filter_map(|g| {
        let opponent = if played_home(favored, g) { &g.away_team } else { &g.home_team };
        let opponent_rate = win_rates.get(opponent).copied().unwrap_or(0.5);
        if OpponentTier::from_win_rate(opponent_rate) != tier {
            return None;
        }
        covered_in_role(favored, g, true)
    }));

    OpponentStrengthSummary {
        opponent_tier: tier,
        opponent_win_rate: round3(opponent_win_rate),
        ats_vs_tier: round3(rate_or_neutral(wins, total)),
        games_vs_tier: total,
        adjustment: match tier {
            OpponentTier::Strong => STRONG_OPPONENT_ADJUSTMENT,
            OpponentTier::Weak => WEAK_OPPONENT_ADJUSTMENT,
            OpponentTier::Mediocre => 0.0,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a completed game where `team` plays at `location` with the
    /// given line (from the home side) and home margin.
    fn game(
        id: u32,
        home: &str,
        away: &str,
        home_score: i32,
        away_score: i32,
        spread_line: Option<f64>,
        div_game: bool,
    ) -> CompletedGame {
        CompletedGame {
            game_id: format!("2024_{id:02}_{away}_{home}"),
            season: 2024,
            game_type: "REG".to_string(),
            week: id as i32,
            gameday: format!("2024-09-{:02}", id),
            weekday: None,
            gametime: None,
            away_team: away.to_string(),
            away_score,
            home_team: home.to_string(),
            home_score,
            location: None,
            away_moneyline: None,
            home_moneyline: None,
            spread_line,
            total_line: None,
            div_game,
        }
    }

    fn aggregate(team: &str, ats_cover_rate: f64, home_win_rate: f64, away_win_rate: f64) -> TeamSeasonAggregate {
        TeamSeasonAggregate {
            team_id: team.to_string(),
            season: 2024,
            games_played: 17,
            wins: 9,
            losses: 8,
            ties: 0,
            win_rate: 9.0 / 17.0,
            total_points_scored: 400,
            total_points_allowed: 390,
            avg_points_scored: 23.5,
            avg_points_allowed: 22.9,
            point_differential: 10,
            avg_point_differential: 0.6,
            offensive_rank: 10,
            defensive_rank: 15,
            overall_rank: 12,
            home_games: 9,
            home_wins: 5,
            home_losses: 4,
            home_win_rate,
            home_avg_points_scored: 24.0,
            home_avg_points_allowed: 22.0,
            away_games: 8,
            away_wins: 4,
            away_losses: 4,
            away_win_rate,
            away_avg_points_scored: 23.0,
            away_avg_points_allowed: 24.0,
            div_games: 6,
            div_wins: 3,
            div_losses: 3,
            div_win_rate: 0.5,
            ats_wins: 8,
            ats_losses: 8,
            ats_pushes: 1,
            ats_cover_rate,
            avg_spread_line: Some(-1.0),
            avg_total_line: Some(45.0),
            times_favored: 9,
            times_underdog: 8,
        }
    }

    #[test]
    fn situational_matches_known_scenario() {
        // Favorite KC away in the (2,4] bucket: 4 covers in 6 games.
        // KC away favored means negative home line; cover when KC margin
        // beats the magnitude.
        let mut fav_games = Vec::new();
        for i in 0..6 {
            let (home_score, away_score) = if i < 4 { (17, 24) } else { (21, 22) };
            fav_games.push(game(i + 1, "DEN", "KC", home_score, away_score, Some(-3.0), false));
        }
        // Underdog CHI home in the same bucket: 2 covers in 5 games.
        let mut und_games = Vec::new();
        for i in 0..5 {
            let (home_score, away_score) = if i < 2 { (20, 21) } else { (10, 24) };
            und_games.push(game(i + 10, "CHI", "GB", home_score, away_score, Some(-3.0), false));
        }

        let s = situational_ats("KC", &fav_games, "CHI", &und_games, false, SpreadBucket::TwoToFour);
        assert_eq!(s.favored_record, "4-2");
        assert_eq!(s.underdog_record, "2-3");
        assert_eq!(s.sample_size, 11);
        // 0.667 / (0.667 + 0.4) ≈ 0.625
        assert!((s.favored_normalized - 0.625).abs() < 0.001);
        assert!((s.favored_normalized + s.underdog_normalized - 1.0).abs() < 1e-12);
    }

    #[test]
    fn situational_wrong_location_or_bucket_is_excluded() {
        // KC home favorite by 3: wrong location for an away favorite query.
        let home_game = vec![game(1, "KC", "DEN", 30, 20, Some(3.0), false)];
        let s = situational_ats("KC", &home_game, "CHI", &[], false, SpreadBucket::TwoToFour);
        assert_eq!(s.sample_size, 0);
        assert_eq!(s.favored_normalized, 0.5);

        // Line magnitude 7 belongs to (4,7], not (2,4].
        let wide = vec![game(2, "DEN", "KC", 13, 27, Some(-7.0), false)];
        let s = situational_ats("KC", &wide, "CHI", &[], false, SpreadBucket::TwoToFour);
        assert_eq!(s.sample_size, 0);
    }

    #[test]
    fn overall_ats_weights_by_games_played() {
        let mut short_season = aggregate("KC", 0.8, 0.5, 0.5);
        short_season.season = 2025;
        short_season.games_played = 3;
        let aggs = vec![aggregate("KC", 0.5, 0.5, 0.5), short_season, aggregate("CHI", 0.4, 0.5, 0.5)];

        let s = overall_ats("KC", "CHI", &aggs);
        // (0.5 * 17 + 0.8 * 3) / 20 = 0.545
        assert!((s.favored_rate - 0.545).abs() < 1e-9);
        assert!(s.favored_normalized > s.underdog_normalized);
    }

    #[test]
    fn overall_ats_missing_team_is_neutral() {
        let s = overall_ats("KC", "CHI", &[]);
        assert_eq!(s.favored_normalized, 0.5);
        assert_eq!(s.favored_record, "N/A");
        assert_eq!(s.sample_size, 0);
    }

    #[test]
    fn home_away_uses_actual_locations() {
        let aggs = vec![aggregate("KC", 0.5, 0.8, 0.2), aggregate("CHI", 0.5, 0.6, 0.3)];
        // KC home: KC's home rate (0.8) against CHI's away rate (0.3).
        let s = home_away("KC", "CHI", true, &aggs);
        assert!((s.favored_rate - 0.8).abs() < 1e-9);
        assert!((s.underdog_rate - 0.3).abs() < 1e-9);
        // KC away: 0.2 against CHI's home 0.6.
        let s = home_away("KC", "CHI", false, &aggs);
        assert!(s.favored_normalized < s.underdog_normalized);
    }

    #[test]
    fn recent_form_respects_cutoff_and_window() {
        // Seven KC games; weeks 1-4 wins, 5-7 losses.
        let games: Vec<CompletedGame> = (1..=7)
            .map(|w| {
                let (home_score, away_score) = if w <= 4 { (24, 10) } else { (10, 24) };
                game(w, "KC", "DEN", home_score, away_score, None, false)
            })
            .collect();

        // No cutoff: last five are weeks 3-7 (2 wins).
        let s = recent_form("KC", &games, "CHI", &[], None);
        assert_eq!(s.favored_record, "2-3");
        assert!((s.favored_rate - 0.4).abs() < 1e-9);

        // Cutoff before week 5: last five are weeks 1-4, all wins.
        let s = recent_form("KC", &games, "CHI", &[], Some((2024, 5)));
        assert_eq!(s.favored_record, "4-0");
        assert!((s.favored_rate - 1.0).abs() < 1e-9);

        // Underdog with no games stays neutral.
        assert_eq!(s.underdog_normalized, 0.5);
    }

    #[test]
    fn divisional_penalty_only_for_rivals() {
        let games = vec![
            game(1, "KC", "DEN", 30, 20, Some(3.0), true),
            game(2, "KC", "GB", 20, 21, Some(3.0), false),
        ];
        let div = divisional("KC", &games, "DEN");
        assert!(div.is_divisional);
        assert!((div.adjustment - DIVISIONAL_FAVORITE_PENALTY).abs() < 1e-12);
        assert_eq!(div.divisional_games, 1);
        assert!((div.divisional_ats - 1.0).abs() < 1e-9);

        let non_div = divisional("KC", &games, "GB");
        assert!(!non_div.is_divisional);
        assert_eq!(non_div.adjustment, 0.0);
    }

    #[test]
    fn opponent_strength_tiers_and_adjusts() {
        let mut rates = HashMap::new();
        rates.insert("DEN".to_string(), 0.70); // strong
        rates.insert("CHI".to_string(), 0.70); // strong
        rates.insert("NE".to_string(), 0.20); // weak

        let games = vec![
            game(1, "KC", "DEN", 30, 20, Some(7.0), false), // covered vs strong
            game(2, "KC", "NE", 21, 20, Some(7.0), false),  // vs weak, ignored for tier
        ];
        let s = opponent_strength("KC", &games, "CHI", &rates);
        assert_eq!(s.opponent_tier, OpponentTier::Strong);
        assert_eq!(s.games_vs_tier, 1);
        assert!((s.ats_vs_tier - 1.0).abs() < 1e-9);
        assert!((s.adjustment - STRONG_OPPONENT_ADJUSTMENT).abs() < 1e-12);

        let s = opponent_strength("KC", &games, "NE", &rates);
        assert!((s.adjustment - WEAK_OPPONENT_ADJUSTMENT).abs() < 1e-12);

        // Unknown opponent defaults to a neutral mediocre tier.
        let s = opponent_strength("KC", &games, "SEA", &rates);
        assert_eq!(s.opponent_tier, OpponentTier::Mediocre);
        assert_eq!(s.adjustment, 0.0);
    }
}
