//! Signal Normalizer: raw metric -> `[0, 1]` or unknown.

use screener_core::{NormalizedSignal, Score, SignalRecord};
use std::collections::BTreeMap;

use crate::config::{Direction, RejectLimit, SignalDomain};

impl SignalDomain {
    /// Map a raw value onto `[0, 1]`.
    ///
    /// Missing, non-finite and hard-rejected values come back as
    /// `Score::Unknown`; nothing is guessed.
    pub fn normalize(&self, raw: Option<f64>) -> Score {
        let raw = match raw {
            Some(v) if v.is_finite() => v,
            _ => return Score::Unknown,
        };
        if self.rejects(raw) {
            return Score::Unknown;
        }

        let position = (raw - self.min) / (self.max - self.min);
        let value = match self.direction {
            Direction::LowerIsBetter => 1.0 - position,
            Direction::HigherIsBetter => position,
        };
        Score::Known(value.clamp(0.0, 1.0))
    }

    fn rejects(&self, raw: f64) -> bool {
        let below = |limit: RejectLimit| {
            raw < limit.value || (limit.inclusive && raw == limit.value)
        };
        let above = |limit: RejectLimit| {
            raw > limit.value || (limit.inclusive && raw == limit.value)
        };
        self.reject_below.map_or(false, below) || self.reject_above.map_or(false, above)
    }
}

/// Normalize one record. Signals without a configured domain are unknown.
pub fn normalize_record(
    record: &SignalRecord,
    domains: &BTreeMap<String, SignalDomain>,
) -> NormalizedSignal {
    let (value, is_proxy) = match domains.get(&record.signal_name) {
        Some(domain) => (domain.normalize(record.raw_value), domain.is_proxy),
        None => {
            tracing::debug!(
                "{}: signal '{}' has no configured domain",
                record.stock_id,
                record.signal_name
            );
            (Score::Unknown, false)
        }
    };

    NormalizedSignal {
        stock_id: record.stock_id.clone(),
        signal_name: record.signal_name.clone(),
        value,
        is_proxy,
    }
}
