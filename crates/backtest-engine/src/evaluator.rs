//! Backtest Evaluator.
//!
//! Builds an equal-weight period return series from historical
//! classifications (the average forward return of every stock holding the
//! top category on a date) and summarises it as mean, sample volatility and
//! annualized Sharpe ratio. Degenerate inputs come back as an explicit status.

use chrono::NaiveDate;
use rayon::prelude::*;
use screener_core::{normalize_stock_id, ScreenError};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::models::*;
use crate::stats;

pub struct BacktestEvaluator {
    config: BacktestConfig,
}

impl BacktestEvaluator {
    pub fn new(config: BacktestConfig) -> Result<Self, ScreenError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Period return series in ascending date order, plus the number of
    /// skipped dates.
    pub fn period_returns(&self, observations: &[BacktestObservation]) -> (Vec<PeriodReturn>, usize) {
        if observations.windows(2).any(|w| w[1].date < w[0].date) {
            tracing::warn!("Backtest observations are not in date order, sorting");
        }

        // date -> stock -> forward return of top-category stocks
        let mut dates: BTreeMap<NaiveDate, BTreeMap<String, Option<f64>>> = BTreeMap::new();
        for obs in observations {
            let basket = dates.entry(obs.date).or_default();
            if obs.category != self.config.top_category {
                continue;
            }
            let stock_id = match normalize_stock_id(&obs.stock_id) {
                Ok(id) => id,
                Err(e) => {
                    tracing::warn!("Skipping backtest observation on {}: {}", obs.date, e);
                    continue;
                }
            };
            match basket.get_mut(&stock_id) {
                Some(kept) => {
                    tracing::debug!("{} listed twice on {}", stock_id, obs.date);
                    if supersedes(obs.forward_return, *kept) {
                        *kept = obs.forward_return;
                    }
                }
                None => {
                    basket.insert(stock_id, obs.forward_return);
                }
            }
        }

        let dates: Vec<(NaiveDate, BTreeMap<String, Option<f64>>)> = dates.into_iter().collect();
        let averaged: Vec<(NaiveDate, Option<(f64, usize)>)> = dates
            .par_iter()
            .map(|(date, basket)| (*date, basket_return(basket)))
            .collect();

        let mut skipped = 0;
        let mut series = Vec::with_capacity(averaged.len());
        for (date, basket) in averaged {
            match (basket, self.config.empty_period_policy) {
                (Some((value, constituents)), _) => series.push(PeriodReturn {
                    date,
                    value,
                    constituents,
                }),
                (None, EmptyPeriodPolicy::Flat) => series.push(PeriodReturn {
                    date,
                    value: 0.0,
                    constituents: 0,
                }),
                (None, EmptyPeriodPolicy::Skip) => skipped += 1,
            }
        }
        (series, skipped)
    }

    pub fn evaluate(&self, observations: &[BacktestObservation]) -> BacktestResult {
        let (series, skipped_periods) = self.period_returns(observations);
        let result = self.summarize(series, skipped_periods);
        tracing::info!(
            "Backtest: {:?}, {} periods ({} skipped), sharpe {:?}",
            result.status,
            result.n_observations,
            result.skipped_periods,
            result.sharpe_ratio
        );
        result
    }

    /// Statistics over an already-built series.
    pub fn summarize(&self, series: Vec<PeriodReturn>, skipped_periods: usize) -> BacktestResult {
        let values: Vec<f64> = series.iter().map(|p| p.value).collect();
        let n = values.len();
        let mean_return = stats::mean(&values);
        let return_volatility = stats::sample_std_dev(&values);

        let status = if n < 2 {
            BacktestStatus::TooFewObservations
        } else if n < self.config.min_periods {
            BacktestStatus::InsufficientHistory
        } else if return_volatility.map_or(true, |v| v <= stats::VOLATILITY_EPSILON) {
            BacktestStatus::ZeroVolatility
        } else {
            BacktestStatus::Ok
        };

        let (sharpe_ratio, significance) = match (status, mean_return, return_volatility) {
            (BacktestStatus::Ok, Some(mean), Some(vol)) => (
                stats::annualized_sharpe(mean, vol, self.config.periods_per_year).into(),
                stats::mean_return_t_test(mean, vol, n),
            ),
            _ => (SharpeRatio::Undefined, None),
        };

        BacktestResult {
            status,
            period_start: series.first().map(|p| p.date),
            period_end: series.last().map(|p| p.date),
            mean_return,
            return_volatility,
            sharpe_ratio,
            n_observations: n,
            skipped_periods,
            significance,
            returns: series,
        }
    }
}

/// Average of the finite returns in a basket, summed in stock id order.
/// Duplicate rows for a stock on one date: a finite return beats a missing
/// one, then the larger return wins.
fn supersedes(candidate: Option<f64>, kept: Option<f64>) -> bool {
    let finite = |r: Option<f64>| r.filter(|v| v.is_finite());
    match (finite(candidate), finite(kept)) {
        (Some(a), Some(b)) => a.total_cmp(&b) == Ordering::Greater,
        (Some(_), None) => true,
        _ => false,
    }
}

fn basket_return(basket: &BTreeMap<String, Option<f64>>) -> Option<(f64, usize)> {
    let returns: Vec<f64> = basket
        .values()
        .filter_map(|r| r.filter(|v| v.is_finite()))
        .collect();
    let avg = stats::mean(&returns)?;
    Some((avg, returns.len()))
}
