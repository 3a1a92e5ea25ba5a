//! Per-season aggregate computation. A season's rows are always derived
//! from scratch out of its full game set, never patched incrementally, so
//! re-running over the same games is idempotent.

use std::collections::BTreeMap;

use crate::types::{AtsOutcome, CompletedGame, TeamSeasonAggregate};

#[derive(Default)]
struct SplitAccum {
    games: i32,
    wins: i32,
    scored: i32,
    allowed: i32,
}

#[derive(Default)]
struct TeamAccum {
    games: i32,
    wins: i32,
    ties: i32,
    points_scored: i32,
    points_allowed: i32,
    home: SplitAccum,
    away: SplitAccum,
    div_games: i32,
    div_wins: i32,
    ats_wins: i32,
    ats_losses: i32,
    ats_pushes: i32,
    spread_sum: f64,
    spread_count: i32,
    total_sum: f64,
    total_count: i32,
    times_favored: i32,
    times_underdog: i32,
}

impl TeamAccum {
    fn record_side(&mut self, game: &CompletedGame, home_side: bool) {
        let (scored, allowed) = if home_side {
            (game.home_score, game.away_score)
        } else {
            (game.away_score, game.home_score)
        };
        let won = scored > allowed;

        self.games += 1;
        self.points_scored += scored;
        self.points_allowed += allowed;
        if won {
            self.wins += 1;
        } else if game.tied() {
            self.ties += 1;
        }

        let split = if home_side { &mut self.home } else { &mut self.away };
        split.games += 1;
        split.scored += scored;
        split.allowed += allowed;
        if won {
            split.wins += 1;
        }

        if game.div_game {
            self.div_games += 1;
            if won {
                self.div_wins += 1;
            }
        }

        if let Some(line) = game.spread_line {
            // Store the line from this team's own perspective (negative =
            // this team favored), matching how books quote it.
            let team_line = if home_side { -line } else { line };
            self.spread_sum += team_line;
            self.spread_count += 1;
            if team_line < 0.0 {
                self.times_favored += 1;
            } else if team_line > 0.0 {
                self.times_underdog += 1;
            }
        }
        if let Some(total) = game.total_line {
            self.total_sum += total;
            self.total_count += 1;
        }
        match game.ats_outcome(home_side) {
            Some(AtsOutcome::Cover) => self.ats_wins += 1,
            Some(AtsOutcome::Loss) => self.ats_losses += 1,
            Some(AtsOutcome::Push) => self.ats_pushes += 1,
            None => {}
        }
    }
}

/// Computes every team's aggregate row for one season. `games` is that
/// season's complete regular-season game set.
pub fn compute_season_aggregates(season: i32, games: &[CompletedGame]) -> Vec<TeamSeasonAggregate> {
    let mut teams: BTreeMap<String, TeamAccum> = BTreeMap::new();
    for game in games.iter().filter(|g| g.season == season) {
        teams.entry(game.home_team.clone()).or_default().record_side(game, true);
        teams.entry(game.away_team.clone()).or_default().record_side(game, false);
    }

    let mut rows: Vec<TeamSeasonAggregate> = teams
        .into_iter()
        .filter(|(_, acc)| acc.games > 0)
        .map(|(team_id, acc)| build_row(team_id, season, acc))
        .collect();
    assign_ranks(&mut rows);
    rows
}

fn build_row(team_id: String, season: i32, acc: TeamAccum) -> TeamSeasonAggregate {
    let games = f64::from(acc.games);
    let decided_ats = acc.ats_wins + acc.ats_losses;
    TeamSeasonAggregate {
        team_id,
        season,
        games_played: acc.games,
        wins: acc.wins,
        losses: acc.games - acc.wins - acc.ties,
        ties: acc.ties,
        win_rate: (f64::from(acc.wins) + 0.5 * f64::from(acc.ties)) / games,
        total_points_scored: acc.points_scored,
        total_points_allowed: acc.points_allowed,
        avg_points_scored: f64::from(acc.points_scored) / games,
        avg_points_allowed: f64::from(acc.points_allowed) / games,
        point_differential: acc.points_scored - acc.points_allowed,
        avg_point_differential: f64::from(acc.points_scored - acc.points_allowed) / games,
        offensive_rank: 0,
        defensive_rank: 0,
        overall_rank: 0,
        home_games: acc.home.games,
        home_wins: acc.home.wins,
        home_losses: acc.home.games - acc.home.wins,
        home_win_rate: split_rate(acc.home.wins, acc.home.games),
        home_avg_points_scored: split_avg(acc.home.scored, acc.home.games),
        home_avg_points_allowed: split_avg(acc.home.allowed, acc.home.games),
        away_games: acc.away.games,
        away_wins: acc.away.wins,
        away_losses: acc.away.games - acc.away.wins,
        away_win_rate: split_rate(acc.away.wins, acc.away.games),
        away_avg_points_scored: split_avg(acc.away.scored, acc.away.games),
        away_avg_points_allowed: split_avg(acc.away.allowed, acc.away.games),
        div_games: acc.div_games,
        div_wins: acc.div_wins,
        div_losses: acc.div_games - acc.div_wins,
        div_win_rate: split_rate(acc.div_wins, acc.div_games),
        ats_wins: acc.ats_wins,
        ats_losses: acc.ats_losses,
        ats_pushes: acc.ats_pushes,
        // Pushes decide nothing, so they are excluded from the rate.
        ats_cover_rate: split_rate(acc.ats_wins, decided_ats),
        avg_spread_line: if acc.spread_count > 0 {
            Some(acc.spread_sum / f64::from(acc.spread_count))
        } else {
            None
        },
        avg_total_line: if acc.total_count > 0 {
            Some(acc.total_sum / f64::from(acc.total_count))
        } else {
            None
        },
        times_favored: acc.times_favored,
        times_underdog: acc.times_underdog,
    }
}

fn split_rate(wins: i32, games: i32) -> f64 {
    if games > 0 {
        f64::from(wins) / f64::from(games)
    } else {
        0.0
    }
}

fn split_avg(points: i32, games: i32) -> f64 {
    if games > 0 {
        f64::from(points) / f64::from(games)
    } else {
        0.0
    }
}

/// Competition ("min") ranking: tied values share the best rank and the next
/// value skips past them.
fn rank_min(values: &[f64], higher_is_better: bool) -> Vec<i32> {
    values
        .iter()
        .map(|&v| {
            let better = values
                .iter()
                .filter(|&&other| if higher_is_better { other > v } else { other < v })
                .count();
            better as i32 + 1
        })
        .collect()
}

fn assign_ranks(rows: &mut [TeamSeasonAggregate]) {
    if rows.is_empty() {
        return;
    }
    let scored: Vec<f64> = rows.iter().map(|r| r.avg_points_scored).collect();
    let allowed: Vec<f64> = rows.iter().map(|r| r.avg_points_allowed).collect();

    // Overall blends normalized win rate (70%) with normalized point
    // differential (30%).
    let normalize = |values: &[f64]| -> Vec<f64> {
        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        if max > min {
            values.iter().map(|v| (v - min) / (max - min)).collect()
        } else {
            vec![0.5; values.len()]
        }
    };
    let win_norm = normalize(&rows.iter().map(|r| r.win_rate).collect::<Vec<_>>());
    let diff_norm =
        normalize(&rows.iter().map(|r| f64::from(r.point_differential)).collect::<Vec<_>>());
    let overall: Vec<f64> = win_norm
        .iter()
        .zip(&diff_norm)
        .map(|(w, d)| 0.7 * w + 0.3 * d)
        .collect();

    let offensive = rank_min(&scored, true);
    let defensive = rank_min(&allowed, false);
    let overall = rank_min(&overall, true);
    for (i, row) in rows.iter_mut().enumerate() {
        row.offensive_rank = offensive[i];
        row.defensive_rank = defensive[i];
        row.overall_rank = overall[i];
    }
}
