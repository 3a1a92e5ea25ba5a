use crate::error::{AppError, Result};

/// Minimum combined sample (both teams) before the situational ATS signal is
/// trusted. Below this the signal is dropped and its weight redistributed.
pub const MIN_SITUATIONAL_GAMES: u32 = 3;

/// Situational sample size at which the data-quality factor saturates at 1.0.
pub const FULL_QUALITY_GAMES: f64 = 10.0;

/// Anchor probability: the market is assumed efficient until data says otherwise.
pub const BASELINE_PROB: f64 = 0.50;

/// Scale applied to a team's deviation from the neutral 0.5 intelligence score.
pub const BASE_ADJUSTMENT_FACTOR: f64 = 0.4;

/// Spreads above this magnitude indicate a mismatch, so team intelligence
/// is weighted more heavily.
pub const LARGE_SPREAD_POINTS: f64 = 6.0;
pub const LARGE_SPREAD_MULTIPLIER: f64 = 1.2;

/// Fraction of the raw key-number impact applied as a probability penalty.
pub const KEY_NUMBER_DAMPING: f64 = 0.15;

/// Clamp bounds for the baseline-anchored policy.
pub const BASELINE_PROB_FLOOR: f64 = 0.30;
pub const BASELINE_PROB_CEILING: f64 = 0.70;

/// Divisional underdogs cover more often; the favorite eats a fixed penalty.
pub const DIVISIONAL_FAVORITE_PENALTY: f64 = -0.015;

/// Opponent-strength adjustments applied to the favorite's probability.
pub const STRONG_OPPONENT_ADJUSTMENT: f64 = -0.025;
pub const WEAK_OPPONENT_ADJUSTMENT: f64 = 0.015;

/// Tier boundaries on season win rate: > 10/17 is Strong, < 7/17 is Weak.
pub const STRONG_TIER_MIN_WIN_RATE: f64 = 10.0 / 17.0;
pub const WEAK_TIER_MAX_WIN_RATE: f64 = 7.0 / 17.0;

/// Number of most recent completed games used for the recent-form signal.
pub const RECENT_FORM_WINDOW: u32 = 5;

/// Which probability-construction policy the combiner runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    /// Start from a 0.50 baseline and apply bounded, data-quality-scaled
    /// adjustments; clamp to [0.30, 0.70].
    BaselineAnchored,
    /// Weighted sum of the favorite's normalized signal scores plus fixed
    /// adjustments; clamp to [0.0, 1.0].
    DirectWeighted,
}

impl PolicyKind {
    fn parse(s: &str) -> Result<Self> {
        match s {
            "baseline" => Ok(PolicyKind::BaselineAnchored),
            "direct" => Ok(PolicyKind::DirectWeighted),
            other => Err(AppError::Config(format!(
                "PREDICT_POLICY must be 'baseline' or 'direct', got '{other}'"
            ))),
        }
    }
}

/// Signal weight vector. Carried as configuration so the two policies can be
/// unit-tested with injected weights instead of hardcoded constants.
#[derive(Debug, Clone, Copy)]
pub struct SignalWeights {
    pub situational: f64,
    pub overall: f64,
    pub home_away: f64,
    pub recent_form: f64,
}

impl SignalWeights {
    /// Default vector for the baseline-anchored policy (recent form unused).
    pub fn baseline() -> Self {
        Self { situational: 0.40, overall: 0.30, home_away: 0.30, recent_form: 0.0 }
    }

    /// Default vector for the direct-weighted policy.
    pub fn direct() -> Self {
        Self { situational: 0.35, overall: 0.25, home_away: 0.25, recent_form: 0.15 }
    }

    pub fn for_policy(policy: PolicyKind) -> Self {
        match policy {
            PolicyKind::BaselineAnchored => Self::baseline(),
            PolicyKind::DirectWeighted => Self::direct(),
        }
    }

    /// Redistribute the situational weight proportionally across the
    /// remaining signals. For the baseline vector this yields 0.5/0.5 over
    /// overall and home/away.
    pub fn without_situational(&self) -> Self {
        let rest = self.overall + self.home_away + self.recent_form;
        if rest <= 0.0 {
            return *self;
        }
        let scale = (self.situational + rest) / rest;
        Self {
            situational: 0.0,
            overall: self.overall * scale,
            home_away: self.home_away * scale,
            recent_form: self.recent_form * scale,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub api_port: u16,
    pub log_level: String,
    pub policy: PolicyKind,
    pub weights: SignalWeights,
    /// Seasons used for /predict when the request omits them.
    pub default_seasons: Vec<i32>,
    /// Per-signal query budget; a timed-out signal degrades to neutral.
    pub signal_timeout_ms: u64,
    pub db_max_connections: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let policy = PolicyKind::parse(
            &std::env::var("PREDICT_POLICY").unwrap_or_else(|_| "baseline".to_string()),
        )?;
        Ok(Self {
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "spread_engine.db".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            policy,
            weights: SignalWeights::for_policy(policy),
            default_seasons: parse_seasons(
                &std::env::var("DEFAULT_SEASONS").unwrap_or_else(|_| "2024,2025".to_string()),
            )?,
            signal_timeout_ms: std::env::var("SIGNAL_TIMEOUT_MS")
                .unwrap_or_else(|_| "2000".to_string())
                .parse::<u64>()
                .unwrap_or(2000),
            db_max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "5".to_string())
                .parse::<u32>()
                .unwrap_or(5),
        })
    }
}

pub fn parse_seasons(raw: &str) -> Result<Vec<i32>> {
    let seasons: Vec<i32> = raw
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i32>()
                .map_err(|_| AppError::Config(format!("invalid season '{s}' in DEFAULT_SEASONS")))
        })
        .collect::<Result<_>>()?;
    if seasons.is_empty() {
        return Err(AppError::Config("DEFAULT_SEASONS must name at least one season".to_string()));
    }
    Ok(seasons)
}
