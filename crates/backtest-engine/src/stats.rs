//! Summary statistics over a period return series.

use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::models::SignificanceTest;

/// Volatility at or below this is treated as zero.
pub const VOLATILITY_EPSILON: f64 = 1e-12;

/// Mean of a data slice.
pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    Some(data.iter().sum::<f64>() / data.len() as f64)
}

/// Sample standard deviation (Bessel's correction, n - 1).
pub fn sample_std_dev(data: &[f64]) -> Option<f64> {
    if data.len() < 2 {
        return None;
    }
    let m = mean(data)?;
    let variance = data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (data.len() - 1) as f64;
    Some(variance.sqrt())
}

/// Annualized Sharpe ratio, `None` for zero volatility.
pub fn annualized_sharpe(mean: f64, volatility: f64, periods_per_year: f64) -> Option<f64> {
    if volatility <= VOLATILITY_EPSILON {
        return None;
    }
    Some(mean / volatility * periods_per_year.sqrt())
}

/// One-sided t-test of `mean > 0` with `n - 1` degrees of freedom.
pub fn mean_return_t_test(mean: f64, volatility: f64, n: usize) -> Option<SignificanceTest> {
    if n < 2 || volatility <= VOLATILITY_EPSILON {
        return None;
    }
    let t_stat = mean / (volatility / (n as f64).sqrt());
    let dist = StudentsT::new(0.0, 1.0, (n - 1) as f64).ok()?;
    Some(SignificanceTest {
        t_stat,
        p_value: 1.0 - dist.cdf(t_stat),
        degrees_of_freedom: n - 1,
    })
}
