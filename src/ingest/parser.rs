//! Parser for the delimited game-results feed. Each row carries 45 columns;
//! only the identity, score, and betting-line fields are kept. Rows for
//! games that have not finished, or that are not regular season, are
//! dropped and counted rather than treated as errors.

use crate::types::{CompletedGame, GameType};

const MIN_COLUMNS: usize = 33;

const IDX_GAME_ID: usize = 0;
const IDX_SEASON: usize = 1;
const IDX_GAME_TYPE: usize = 2;
const IDX_WEEK: usize = 3;
const IDX_GAMEDAY: usize = 4;
const IDX_WEEKDAY: usize = 5;
const IDX_GAMETIME: usize = 6;
const IDX_AWAY_TEAM: usize = 7;
const IDX_AWAY_SCORE: usize = 8;
const IDX_HOME_TEAM: usize = 9;
const IDX_HOME_SCORE: usize = 10;
const IDX_LOCATION: usize = 11;
const IDX_AWAY_MONEYLINE: usize = 24;
const IDX_HOME_MONEYLINE: usize = 25;
const IDX_SPREAD_LINE: usize = 26;
const IDX_TOTAL_LINE: usize = 29;
const IDX_DIV_GAME: usize = 32;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParseStats {
    pub total_rows: u32,
    pub kept: u32,
    pub rejected_short_row: u32,
    pub rejected_incomplete: u32,
    pub rejected_game_type: u32,
    pub rejected_season: u32,
    pub rejected_malformed: u32,
}

pub struct FeedParser {
    delimiter: char,
    allowed_seasons: Option<Vec<i32>>,
}

impl FeedParser {
    pub fn new(delimiter: char) -> Self {
        Self { delimiter, allowed_seasons: None }
    }

    /// Restricts parsing to the given seasons; rows outside it are counted
    /// as rejected, not errors.
    pub fn with_seasons(mut self, seasons: Vec<i32>) -> Self {
        self.allowed_seasons = Some(seasons);
        self
    }

    pub fn parse(&self, content: &str) -> (Vec<CompletedGame>, ParseStats) {
        let mut stats = ParseStats::default();
        let mut games = Vec::new();

        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            stats.total_rows += 1;
            let fields: Vec<&str> = line.split(self.delimiter).map(str::trim).collect();
            if fields.len() < MIN_COLUMNS {
                stats.rejected_short_row += 1;
                continue;
            }

            let season = match fields[IDX_SEASON].parse::<i32>() {
                Ok(s) => s,
                Err(_) => {
                    stats.rejected_malformed += 1;
                    continue;
                }
            };
            if let Some(allowed) = &self.allowed_seasons {
                if !allowed.contains(&season) {
                    stats.rejected_season += 1;
                    continue;
                }
            }
            if GameType::parse(fields[IDX_GAME_TYPE]) != Some(GameType::Reg) {
                stats.rejected_game_type += 1;
                continue;
            }
            // A game without both final scores has not completed.
            let (away_raw, home_raw) = (fields[IDX_AWAY_SCORE], fields[IDX_HOME_SCORE]);
            if away_raw.is_empty() || home_raw.is_empty() {
                stats.rejected_incomplete += 1;
                continue;
            }
            let (away_score, home_score) = match (opt_i32(away_raw), opt_i32(home_raw)) {
                (Some(a), Some(h)) if a >= 0 && h >= 0 => (a, h),
                _ => {
                    stats.rejected_malformed += 1;
                    continue;
                }
            };
            let week = match fields[IDX_WEEK].parse::<i32>() {
                Ok(w) => w,
                Err(_) => {
                    stats.rejected_malformed += 1;
                    continue;
                }
            };
            let game_id = fields[IDX_GAME_ID].to_string();
            let away_team = fields[IDX_AWAY_TEAM].to_string();
            let home_team = fields[IDX_HOME_TEAM].to_string();
            if game_id.is_empty() || away_team.is_empty() || home_team.is_empty() {
                stats.rejected_malformed += 1;
                continue;
            }

            games.push(CompletedGame {
                game_id,
                season,
                game_type: fields[IDX_GAME_TYPE].to_string(),
                week,
                gameday: fields[IDX_GAMEDAY].to_string(),
                weekday: opt_string(fields[IDX_WEEKDAY]),
                gametime: opt_string(fields[IDX_GAMETIME]),
                away_team,
                away_score,
                home_team,
                home_score,
                location: opt_string(fields[IDX_LOCATION]),
                away_moneyline: opt_f64(fields[IDX_AWAY_MONEYLINE]),
                home_moneyline: opt_f64(fields[IDX_HOME_MONEYLINE]),
                spread_line: opt_f64(fields[IDX_SPREAD_LINE]),
                total_line: opt_f64(fields[IDX_TOTAL_LINE]),
                div_game: fields[IDX_DIV_GAME].parse::<i32>().map(|v| v != 0).unwrap_or(false),
            });
            stats.kept += 1;
        }

        (games, stats)
    }
}

fn opt_string(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn opt_i32(s: &str) -> Option<i32> {
    // Some exports render integer scores as "24.0". Casting an out-of-range
    // float would saturate silently, so the range is checked first.
    s.parse::<f64>()
        .ok()
        .filter(|v| v.fract() == 0.0 && v.abs() <= i32::MAX as f64)
        .map(|v| v as i32)
}

fn opt_f64(s: &str) -> Option<f64> {
    s.parse::<f64>().ok()
}
