//! Probability combiner. Resolves favorite/underdog roles, gathers history,
//! runs every signal calculator, and folds the results into one calibrated
//! cover probability under the configured policy.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::{
    Config, PolicyKind, SignalWeights, BASELINE_PROB, BASELINE_PROB_CEILING, BASELINE_PROB_FLOOR,
    BASE_ADJUSTMENT_FACTOR, FULL_QUALITY_GAMES, KEY_NUMBER_DAMPING, LARGE_SPREAD_MULTIPLIER,
    LARGE_SPREAD_POINTS, MIN_SITUATIONAL_GAMES,
};
use crate::db::history::HistoryReader;
use crate::engine::key_numbers::key_number_impact;
use crate::engine::signals;
use crate::error::{AppError, Result};
use crate::types::{
    round3, Prediction, PredictionBreakdown, PredictionRequest, PredictionResult, SpreadBucket,
};

pub struct SpreadPredictor {
    history: HistoryReader,
    policy: PolicyKind,
    weights: SignalWeights,
    signal_timeout: Duration,
    default_seasons: Vec<i32>,
}

impl SpreadPredictor {
    pub fn new(history: HistoryReader, cfg: &Config) -> Self {
        Self {
            history,
            policy: cfg.policy,
            weights: cfg.weights,
            signal_timeout: Duration::from_millis(cfg.signal_timeout_ms),
            default_seasons: cfg.default_seasons.clone(),
        }
    }

    pub async fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult> {
        let team_a = normalize_code(&request.team_a)?;
        let team_b = normalize_code(&request.team_b)?;
        if team_a == team_b {
            return Err(AppError::InvalidRequest(
                "both sides name the same team".to_string(),
            ));
        }
        if !request.spread.is_finite() {
            return Err(AppError::InvalidRequest("spread must be a finite number".to_string()));
        }
        if request.spread == 0.0 {
            return Err(AppError::InvalidRequest(
                "a zero spread has no favorite; supply a non-zero line".to_string(),
            ));
        }
        let seasons = if request.seasons.is_empty() {
            self.default_seasons.clone()
        } else {
            request.seasons.clone()
        };

        // A dead database fails the whole request. Per-signal failures after
        // this point degrade to neutral instead.
        self.history
            .ping()
            .await
            .map_err(|e| AppError::Upstream(format!("database unreachable: {e}")))?;

        // Negative spread = the first named team is favored.
        let (favored, underdog, favored_home) = if request.spread < 0.0 {
            (team_a, team_b, request.team_a_home)
        } else {
            (team_b, team_a, !request.team_a_home)
        };
        let magnitude = request.spread.abs();
        let bucket = SpreadBucket::from_magnitude(magnitude);
        let cutoff = request.current_season.zip(request.current_week);

        let favored_games = self
            .fetch("favored team games", self.history.team_games(&favored, &seasons))
            .await;
        let underdog_games = self
            .fetch("underdog team games", self.history.team_games(&underdog, &seasons))
            .await;
        let aggregates = self
            .fetch(
                "season aggregates",
                self.history.season_aggregates(&favored, &underdog, &seasons),
            )
            .await;
        let win_rates = self.fetch("win rates", self.history.win_rates(&seasons)).await;

        let breakdown = PredictionBreakdown {
            situational_ats: signals::situational_ats(
                &favored,
                &favored_games,
                &underdog,
                &underdog_games,
                favored_home,
                bucket,
            ),
            overall_ats: signals::overall_ats(&favored, &underdog, &aggregates),
            home_away: signals::home_away(&favored, &underdog, favored_home, &aggregates),
            recent_form: signals::recent_form(
                &favored,
                &favored_games,
                &underdog,
                &underdog_games,
                cutoff,
            ),
            divisional: signals::divisional(&favored, &favored_games, &underdog),
            opponent_strength: signals::opponent_strength(
                &favored,
                &favored_games,
                &underdog,
                &win_rates,
            ),
        };
        debug!(
            situational = breakdown.situational_ats.favored_normalized,
            overall = breakdown.overall_ats.favored_normalized,
            home_away = breakdown.home_away.favored_normalized,
            recent_form = breakdown.recent_form.favored_normalized,
            "signals computed"
        );

        let favored_prob = round3(match self.policy {
            PolicyKind::BaselineAnchored => combine_baseline(&breakdown, magnitude, self.weights),
            PolicyKind::DirectWeighted => combine_direct(&breakdown, self.weights),
        });
        let underdog_prob = round3(1.0 - favored_prob);

        let (home, away) =
            if favored_home { (&favored, &underdog) } else { (&underdog, &favored) };
        let matchup = format!("{away} @ {home}");
        let spread_line = format!("{favored} -{magnitude:.1}");
        let recommended_bet =
            if favored_prob > 0.5 { favored.clone() } else { underdog.clone() };

        info!(
            matchup = %matchup,
            line = %spread_line,
            favored_prob,
            "prediction computed"
        );

        Ok(PredictionResult {
            matchup,
            spread_line,
            favored_team: favored,
            underdog_team: underdog,
            prediction: Prediction {
                favored_cover_probability: favored_prob,
                underdog_cover_probability: underdog_prob,
                recommended_bet,
                confidence: round3(favored_prob.max(underdog_prob)),
                edge: round3((favored_prob - 0.5).abs()),
            },
            breakdown,
        })
    }

    /// Runs one history query under the signal budget. Failures and timeouts
    /// degrade that signal's input to empty, never the whole prediction.
    async fn fetch<T, F>(&self, what: &str, fut: F) -> T
    where
        T: Default,
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.signal_timeout, fut).await {
            Ok(Ok(value)) => value,
            Ok(Err(e)) => {
                warn!("{what} query failed, signal degrades to neutral: {e}");
                T::default()
            }
            Err(_) => {
                warn!(
                    "{what} query exceeded {:?}, signal degrades to neutral",
                    self.signal_timeout
                );
                T::default()
            }
        }
    }
}

fn normalize_code(raw: &str) -> Result<String> {
    let code = raw.trim().to_uppercase();
    if code.is_empty() {
        return Err(AppError::InvalidRequest("team code must not be empty".to_string()));
    }
    Ok(code)
}

/// True when every pairwise signal saw zero qualifying games, meaning the
/// market baseline is all the model has.
fn no_history(b: &PredictionBreakdown) -> bool {
    b.situational_ats.sample_size == 0
        && b.overall_ats.sample_size == 0
        && b.home_away.sample_size == 0
        && b.recent_form.sample_size == 0
}

/// Graduated spread-size penalty: gentle up to a field goal, then two
/// progressively steeper segments.
fn spread_penalty(magnitude: f64) -> f64 {
    if magnitude <= 3.0 {
        magnitude * 0.005
    } else if magnitude <= 7.0 {
        0.015 + (magnitude - 3.0) * 0.008
    } else {
        0.047 + (magnitude - 7.0) * 0.01
    }
}

/// Baseline-anchored policy: the market is assumed efficient, so start at
/// 0.50 and apply bounded adjustments scaled by how much situational history
/// backs them, then the key-number and spread-size penalties.
pub fn combine_baseline(
    breakdown: &PredictionBreakdown,
    magnitude: f64,
    weights: SignalWeights,
) -> f64 {
    if no_history(breakdown) {
        return BASELINE_PROB;
    }

    let situational_games = breakdown.situational_ats.sample_size;
    let w = if situational_games < MIN_SITUATIONAL_GAMES {
        weights.without_situational()
    } else {
        weights
    };

    let favored_intelligence = w.situational * breakdown.situational_ats.favored_normalized
        + w.overall * breakdown.overall_ats.favored_normalized
        + w.home_away * breakdown.home_away.favored_normalized
        + w.recent_form * breakdown.recent_form.favored_normalized;

    let data_quality = (f64::from(situational_games) / FULL_QUALITY_GAMES).min(1.0);
    let adjustment_factor = if magnitude > LARGE_SPREAD_POINTS {
        BASE_ADJUSTMENT_FACTOR * LARGE_SPREAD_MULTIPLIER
    } else {
        BASE_ADJUSTMENT_FACTOR
    };
    let favored_adjustment = (favored_intelligence - 0.5) * adjustment_factor * data_quality;
    let key_penalty = key_number_impact(magnitude) * KEY_NUMBER_DAMPING;

    let prob = BASELINE_PROB + favored_adjustment - key_penalty - spread_penalty(magnitude);
    prob.clamp(BASELINE_PROB_FLOOR, BASELINE_PROB_CEILING)
}

/// Direct-weighted policy: the favorite's probability is the weighted sum of
/// its normalized signal scores plus the fixed divisional and
/// opponent-strength adjustments.
pub fn combine_direct(breakdown: &PredictionBreakdown, weights: SignalWeights) -> f64 {
    let w = if breakdown.situational_ats.sample_size < MIN_SITUATIONAL_GAMES {
        weights.without_situational()
    } else {
        weights
    };

    let favored_prob = w.situational * breakdown.situational_ats.favored_normalized
        + w.overall * breakdown.overall_ats.favored_normalized
        + w.home_away * breakdown.home_away.favored_normalized
        + w.recent_form * breakdown.recent_form.favored_normalized
        + breakdown.divisional.adjustment
        + breakdown.opponent_strength.adjustment;

    favored_prob.clamp(0.0, 1.0)
}
