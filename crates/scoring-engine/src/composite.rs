//! Composite Scorer.
//!
//! Unknown signals are dropped and the remaining weights re-normalized to sum
//! to one. Summation always runs in signal-name order (the order of the weight
//! map), so the result does not depend on the order signals arrived in.

use screener_core::{CompositeScore, ContributingSignal, NormalizedSignal, Score, Track};
use std::collections::BTreeMap;

pub fn composite_score(
    stock_id: &str,
    track: Track,
    weights: &BTreeMap<String, f64>,
    signals: &BTreeMap<String, NormalizedSignal>,
) -> CompositeScore {
    let present: Vec<(&str, f64, f64, bool)> = weights
        .iter()
        .filter_map(|(name, &weight)| {
            let signal = signals.get(name)?;
            signal
                .value
                .value()
                .map(|v| (name.as_str(), weight, v, signal.is_proxy))
        })
        .collect();

    let total_weight: f64 = present.iter().map(|(_, w, _, _)| w).sum();
    if present.is_empty() || total_weight <= 0.0 {
        return CompositeScore {
            stock_id: stock_id.to_string(),
            track,
            value: Score::Unknown,
            contributing_signals: Vec::new(),
        };
    }

    let contributing_signals: Vec<ContributingSignal> = present
        .into_iter()
        .map(|(name, weight, value, is_proxy)| ContributingSignal {
            signal_name: name.to_string(),
            weight: weight / total_weight,
            normalized_value: value,
            is_proxy,
        })
        .collect();

    let value: f64 = contributing_signals.iter().map(|c| c.contribution()).sum();

    CompositeScore {
        stock_id: stock_id.to_string(),
        track,
        value: Score::Known(value.clamp(0.0, 1.0)),
        contributing_signals,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn signal(name: &str, value: Score) -> NormalizedSignal {
        NormalizedSignal {
            stock_id: "HDFCBANK".to_string(),
            signal_name: name.to_string(),
            value,
            is_proxy: false,
        }
    }

    fn weights(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, w)| (k.to_string(), *w)).collect()
    }

    fn signals(list: Vec<NormalizedSignal>) -> BTreeMap<String, NormalizedSignal> {
        list.into_iter().map(|s| (s.signal_name.clone(), s)).collect()
    }

    #[test]
    fn test_weighted_sum() {
        let w = weights(&[("pe", 0.5), ("roe", 0.3), ("sentiment", 0.2)]);
        let s = signals(vec![
            signal("pe", Score::Known(0.8)),
            signal("roe", Score::Known(0.6)),
            signal("sentiment", Score::Known(0.5)),
        ]);

        let composite = composite_score("HDFCBANK", Track::Fundamentals, &w, &s);
        assert_relative_eq!(composite.value.value().unwrap(), 0.68, epsilon = 1e-12);
        let names: Vec<&str> = composite
            .contributing_signals
            .iter()
            .map(|c| c.signal_name.as_str())
            .collect();
        assert_eq!(names, vec!["pe", "roe", "sentiment"]);
    }

    #[test]
    fn test_unknown_signals_are_dropped_and_weights_renormalized() {
        let w = weights(&[("pe", 0.5), ("roe", 0.3), ("sentiment", 0.2)]);
        let s = signals(vec![
            signal("pe", Score::Known(0.8)),
            signal("roe", Score::Unknown),
            signal("sentiment", Score::Known(0.5)),
        ]);

        let composite = composite_score("HDFCBANK", Track::Fundamentals, &w, &s);
        // (0.8 * 0.5 + 0.5 * 0.2) / 0.7
        assert_relative_eq!(composite.value.value().unwrap(), 0.5 / 0.7, epsilon = 1e-12);
        let weight_sum: f64 = composite.contributing_signals.iter().map(|c| c.weight).sum();
        assert_relative_eq!(weight_sum, 1.0, epsilon = 1e-12);
        assert_eq!(composite.contributing_signals.len(), 2);
    }

    #[test]
    fn test_all_unknown_is_unknown() {
        let w = weights(&[("pe", 0.5), ("roe", 0.5)]);
        let s = signals(vec![signal("pe", Score::Unknown)]);

        let composite = composite_score("HDFCBANK", Track::Fundamentals, &w, &s);
        assert_eq!(composite.value, Score::Unknown);
        assert!(composite.contributing_signals.is_empty());
    }

    #[test]
    fn test_zero_weight_only_is_unknown() {
        let w = weights(&[("pe", 0.0), ("roe", 1.0)]);
        let s = signals(vec![signal("pe", Score::Known(0.9))]);

        let composite = composite_score("HDFCBANK", Track::Fundamentals, &w, &s);
        assert_eq!(composite.value, Score::Unknown);
    }

    #[test]
    fn test_signals_outside_weight_map_are_ignored() {
        let w = weights(&[("pe", 1.0)]);
        let s = signals(vec![
            signal("pe", Score::Known(0.25)),
            signal("beta", Score::Known(1.0)),
        ]);

        let composite = composite_score("HDFCBANK", Track::Fundamentals, &w, &s);
        assert_eq!(composite.value, Score::Known(0.25));
    }
}
