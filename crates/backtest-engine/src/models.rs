use chrono::NaiveDate;
use screener_core::{Category, Classification, ConfigError, ScreenError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One historical classification with the return realized over the holding
/// horizon that followed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestObservation {
    pub date: NaiveDate,
    pub stock_id: String,
    pub category: Category,
    /// Simple return as a fraction (0.02 = +2%). Missing when the price was unavailable.
    #[serde(default)]
    pub forward_return: Option<f64>,
}

impl BacktestObservation {
    pub fn from_classification(
        date: NaiveDate,
        classification: &Classification,
        forward_return: Option<f64>,
    ) -> Self {
        Self {
            date,
            stock_id: classification.stock_id.clone(),
            category: classification.category,
            forward_return,
        }
    }
}

/// What to do with a date where no stock holds the top category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyPeriodPolicy {
    /// Leave the date out of the series.
    #[default]
    Skip,
    /// Count the date as a flat (0.0) period, i.e. sitting in cash.
    Flat,
}

/// Configuration for a backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    /// Category whose members form the equal-weight basket each date.
    #[serde(default = "default_top_category")]
    pub top_category: Category,
    /// Fewer periods than this is reported as insufficient history.
    #[serde(default = "default_min_periods")]
    pub min_periods: usize,
    /// Annualization constant (252 daily, 52 weekly, 12 monthly).
    #[serde(default = "default_periods_per_year")]
    pub periods_per_year: f64,
    #[serde(default)]
    pub empty_period_policy: EmptyPeriodPolicy,
}

fn default_top_category() -> Category {
    Category::HighPotential
}

fn default_min_periods() -> usize {
    20
}

fn default_periods_per_year() -> f64 {
    252.0
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            top_category: default_top_category(),
            min_periods: default_min_periods(),
            periods_per_year: default_periods_per_year(),
            empty_period_policy: EmptyPeriodPolicy::default(),
        }
    }
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_periods < 2 {
            return Err(ConfigError::BacktestMinPeriods(self.min_periods));
        }
        if !self.periods_per_year.is_finite() || self.periods_per_year <= 0.0 {
            return Err(ConfigError::PeriodsPerYear(self.periods_per_year));
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: BacktestConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }
}

/// Equal-weight basket return for one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodReturn {
    pub date: NaiveDate,
    pub value: f64,
    /// Stocks averaged into `value`; 0 for a flat period.
    pub constituents: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BacktestStatus {
    Ok,
    /// Fewer than two periods; nothing can be estimated.
    TooFewObservations,
    /// Fewer periods than the configured minimum.
    InsufficientHistory,
    ZeroVolatility,
}

/// Annualized Sharpe ratio. `Undefined` is never zero and never infinite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum SharpeRatio {
    Defined(f64),
    Undefined,
}

impl SharpeRatio {
    pub fn value(&self) -> Option<f64> {
        match self {
            SharpeRatio::Defined(v) => Some(*v),
            SharpeRatio::Undefined => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, SharpeRatio::Defined(_))
    }
}

impl From<Option<f64>> for SharpeRatio {
    fn from(value: Option<f64>) -> Self {
        match value {
            Some(v) if v.is_finite() => SharpeRatio::Defined(v),
            _ => SharpeRatio::Undefined,
        }
    }
}

/// One-sided test that the mean period return is above zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignificanceTest {
    pub t_stat: f64,
    pub p_value: f64,
    pub degrees_of_freedom: usize,
}

/// Result of a completed backtest. Immutable once computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub status: BacktestStatus,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    pub mean_return: Option<f64>,
    /// Sample standard deviation of period returns.
    pub return_volatility: Option<f64>,
    pub sharpe_ratio: SharpeRatio,
    pub n_observations: usize,
    /// Dates dropped because no stock held the top category.
    pub skipped_periods: usize,
    pub significance: Option<SignificanceTest>,
    pub returns: Vec<PeriodReturn>,
}

impl BacktestResult {
    pub fn is_ok(&self) -> bool {
        self.status == BacktestStatus::Ok
    }

    /// The result itself, or `DegenerateBacktest` naming the status.
    pub fn into_checked(self) -> Result<Self, ScreenError> {
        match self.status {
            BacktestStatus::Ok => Ok(self),
            status => Err(ScreenError::DegenerateBacktest(format!(
                "{:?} over {} periods",
                status, self.n_observations
            ))),
        }
    }
}
