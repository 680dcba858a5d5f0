use thiserror::Error;

use crate::types::{Category, Track};

#[derive(Error, Debug)]
pub enum ScreenError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Insufficient signals: {stock_id} has no known signal on the {track} track")]
    InsufficientSignals { stock_id: String, track: Track },

    #[error("Degenerate backtest: {0}")]
    DegenerateBacktest(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Defects in an engine configuration. All of these are fatal at startup.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(String),

    #[error("track {0} is referenced but not configured")]
    MissingTrack(Track),

    #[error("track {0} has an empty weight map")]
    EmptyWeights(Track),

    #[error("track {track}: weight {weight} for signal '{signal}' must be finite and non-negative")]
    InvalidWeight { track: Track, signal: String, weight: f64 },

    #[error("track {track}: weights sum to {sum}, expected 1")]
    WeightSum { track: Track, sum: f64 },

    #[error("{context} references unconfigured signal '{signal}'")]
    UnknownSignal { context: String, signal: String },

    #[error("signal '{signal}' has an invalid domain: {reason}")]
    InvalidDomain { signal: String, reason: String },

    #[error("track {0} has an empty band table")]
    EmptyBands(Track),

    #[error("track {track}: band table does not partition [0, 1]: {reason}")]
    BandCoverage { track: Track, reason: String },

    #[error("track {track}: category '{category}' does not belong to this track")]
    BandCategory { track: Track, category: Category },

    #[error("override '{name}' is invalid: {reason}")]
    InvalidOverride { name: String, reason: String },

    #[error("evidence cap must be at least 1")]
    EvidenceCap,

    #[error("backtest min_periods must be at least 2, got {0}")]
    BacktestMinPeriods(usize),

    #[error("backtest periods_per_year must be positive and finite, got {0}")]
    PeriodsPerYear(f64),
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}
