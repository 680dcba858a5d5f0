//! Classifier: ordered rule evaluation over a composite score.
//!
//! 1. hard overrides, in declared order, first match wins
//! 2. band lookup on a known composite score
//! 3. `Insufficient Data` when the composite score is unknown

use screener_core::{Category, CompositeScore, Score, Track};
use std::collections::BTreeMap;

use crate::config::{Band, OverrideRule};

#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub category: Category,
    /// Name of the override that fired.
    pub override_rule: Option<String>,
}

/// Find the band containing `score`.
///
/// Bands are closed on the lower bound, so a score sitting exactly on an edge
/// belongs to the higher band. The last band also contains its upper bound.
pub fn lookup_band(bands: &[Band], score: f64) -> Option<Category> {
    let last = bands.len().checked_sub(1)?;
    bands
        .iter()
        .enumerate()
        .find(|(i, band)| {
            score >= band.lower && (score < band.upper || (*i == last && score == band.upper))
        })
        .map(|(_, band)| band.category)
}

pub struct Classifier<'a> {
    track: Track,
    bands: &'a [Band],
    overrides: Vec<&'a OverrideRule>,
}

impl<'a> Classifier<'a> {
    /// Only the overrides declared for `track` are kept, in declared order.
    pub fn new(track: Track, bands: &'a [Band], overrides: &'a [OverrideRule]) -> Self {
        Self {
            track,
            bands,
            overrides: overrides.iter().filter(|r| r.track == track).collect(),
        }
    }

    pub fn track(&self) -> Track {
        self.track
    }

    /// `raw_values` holds the raw (un-normalized) value of each signal the stock
    /// reported; overrides are judged on those.
    pub fn classify(
        &self,
        composite: &CompositeScore,
        raw_values: &BTreeMap<String, Option<f64>>,
    ) -> Decision {
        for rule in &self.overrides {
            let raw = raw_values
                .get(&rule.signal)
                .copied()
                .flatten()
                .filter(|v| v.is_finite());
            if let Some(raw) = raw {
                if rule.comparison.holds(raw, rule.threshold) {
                    tracing::debug!(
                        "{}: override '{}' fired ({} = {})",
                        composite.stock_id,
                        rule.name,
                        rule.signal,
                        raw
                    );
                    return Decision {
                        category: rule.forced_category(),
                        override_rule: Some(rule.name.clone()),
                    };
                }
            }
        }

        let category = match composite.value {
            Score::Known(score) => lookup_band(self.bands, score).unwrap_or_else(|| {
                // Unreachable with a validated band table.
                tracing::warn!(
                    "{}: score {} fell outside the {} bands",
                    composite.stock_id,
                    score,
                    self.track
                );
                Category::InsufficientData
            }),
            Score::Unknown => Category::InsufficientData,
        };

        Decision {
            category,
            override_rule: None,
        }
    }
}
