use rayon::prelude::*;
use screener_core::{
    normalize_stock_id, Classification, CompositeScore, EvidenceItem, NormalizedSignal,
    ScreenError, SignalRecord, SourceType, Track,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::classifier::{Classifier, Decision};
use crate::composite::composite_score;
use crate::config::EngineConfig;
use crate::evidence::EvidenceCollector;
use crate::normalizer::normalize_record;
use crate::ranking::RankedTable;

const MAX_REASONS: usize = 6;

/// Everything one run produces. A pure function of the inputs; callers stamp
/// the wall-clock time if they need one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenReport {
    pub tables: BTreeMap<Track, RankedTable>,
    /// Retained evidence of every stock: stock id order, then source type,
    /// then retention priority.
    pub evidence: Vec<EvidenceItem>,
    /// Rows dropped because their stock id was empty.
    pub skipped_records: usize,
}

impl ScreenReport {
    pub fn table(&self, track: Track) -> Option<&RankedTable> {
        self.tables.get(&track)
    }

    pub fn classification(&self, track: Track, stock_id: &str) -> Option<&Classification> {
        self.table(track)?.get(stock_id)
    }
}

/// Per-stock result of `ScoringEngine::score_stock`.
#[derive(Debug, Clone)]
pub struct StockOutcome {
    pub stock_id: String,
    pub composites: Vec<CompositeScore>,
    pub classifications: Vec<Classification>,
    pub evidence: Vec<EvidenceItem>,
}

#[derive(Default)]
struct StockInputs {
    records: Vec<SignalRecord>,
    evidence: Vec<EvidenceItem>,
}

pub struct ScoringEngine {
    config: EngineConfig,
    evidence: EvidenceCollector,
}

impl ScoringEngine {
    /// Validates the configuration; a broken one never gets to score.
    pub fn new(config: EngineConfig) -> Result<Self, ScreenError> {
        config.validate()?;
        let evidence = EvidenceCollector::new(config.evidence.max_items_per_stock);
        Ok(Self { config, evidence })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Score every stock present in either feed.
    ///
    /// Stocks are independent and scored in parallel; the output order is
    /// fixed by the ranked tables, not by scheduling.
    pub fn run(&self, records: &[SignalRecord], evidence: &[EvidenceItem]) -> ScreenReport {
        let mut skipped_records = 0;
        let mut grouped: BTreeMap<String, StockInputs> = BTreeMap::new();

        for record in records {
            match normalize_stock_id(&record.stock_id) {
                Ok(id) => grouped.entry(id.clone()).or_default().records.push(SignalRecord {
                    stock_id: id,
                    ..record.clone()
                }),
                Err(e) => {
                    tracing::warn!("Skipping signal '{}': {}", record.signal_name, e);
                    skipped_records += 1;
                }
            }
        }
        for item in evidence {
            match normalize_stock_id(&item.stock_id) {
                Ok(id) => grouped.entry(id.clone()).or_default().evidence.push(EvidenceItem {
                    stock_id: id,
                    ..item.clone()
                }),
                Err(e) => {
                    tracing::warn!("Skipping evidence '{}': {}", item.snippet, e);
                    skipped_records += 1;
                }
            }
        }

        let stocks: Vec<(String, StockInputs)> = grouped.into_iter().collect();
        tracing::info!(
            "Scoring {} stocks across {} tracks",
            stocks.len(),
            self.config.tracks.len()
        );

        let outcomes: Vec<StockOutcome> = stocks
            .par_iter()
            .map(|(id, inputs)| self.score_stock(id, &inputs.records, &inputs.evidence))
            .collect();

        let mut rows: BTreeMap<Track, Vec<Classification>> = BTreeMap::new();
        let mut evidence_table = Vec::new();
        for outcome in outcomes {
            for classification in outcome.classifications {
                rows.entry(classification.track).or_default().push(classification);
            }
            evidence_table.extend(outcome.evidence);
        }

        let tables: BTreeMap<Track, RankedTable> = self
            .config
            .tracks
            .keys()
            .map(|track| {
                let table = RankedTable::new(*track, rows.remove(track).unwrap_or_default());
                tracing::info!(
                    "{} track: {} ranked, {} without enough data",
                    track,
                    table.ranked().count(),
                    table.unranked().count()
                );
                (*track, table)
            })
            .collect();

        ScreenReport {
            tables,
            evidence: evidence_table,
            skipped_records,
        }
    }

    /// Score a single stock on every configured track.
    ///
    /// `records` and `evidence` are expected to carry the normalized `stock_id`.
    pub fn score_stock(
        &self,
        stock_id: &str,
        records: &[SignalRecord],
        evidence: &[EvidenceItem],
    ) -> StockOutcome {
        let latest = latest_per_signal(records);

        let mut normalized: BTreeMap<String, NormalizedSignal> = BTreeMap::new();
        let mut raw_values: BTreeMap<String, Option<f64>> = BTreeMap::new();
        for (name, record) in &latest {
            normalized.insert(name.to_string(), normalize_record(record, &self.config.signals));
            raw_values.insert(name.to_string(), record.raw_value);
        }

        // Each source is capped on its own so every track keeps a rationale.
        let by_source: BTreeMap<SourceType, Vec<EvidenceItem>> =
            [SourceType::News, SourceType::Keyword]
                .into_iter()
                .map(|source| {
                    let items = evidence.iter().filter(|e| e.source_type == source);
                    (source, self.evidence.collect(stock_id, items))
                })
                .collect();

        let mut composites = Vec::with_capacity(self.config.tracks.len());
        let mut classifications = Vec::with_capacity(self.config.tracks.len());
        for (track, cfg) in &self.config.tracks {
            let composite = composite_score(stock_id, *track, &cfg.weights, &normalized);
            if !composite.value.is_known() {
                tracing::debug!(
                    "{}",
                    ScreenError::InsufficientSignals {
                        stock_id: stock_id.to_string(),
                        track: *track,
                    }
                );
            }

            let decision = Classifier::new(*track, &cfg.bands, &self.config.overrides)
                .classify(&composite, &raw_values);

            let rationale: Vec<EvidenceItem> = evidence_sources(*track)
                .iter()
                .filter_map(|source| by_source.get(source))
                .flatten()
                .cloned()
                .collect();

            classifications.push(Classification {
                stock_id: stock_id.to_string(),
                track: *track,
                category: decision.category,
                composite_score: composite.value,
                contributing_signals: composite.contributing_signals.clone(),
                uses_proxy_data: composite.uses_proxy_data(),
                reasons: reasons(&composite, &decision),
                override_rule: decision.override_rule,
                rationale,
            });
            composites.push(composite);
        }

        StockOutcome {
            stock_id: stock_id.to_string(),
            composites,
            classifications,
            evidence: by_source.into_values().flatten().collect(),
        }
    }
}

/// Evidence kinds that justify each track.
fn evidence_sources(track: Track) -> &'static [SourceType] {
    match track {
        Track::Fundamentals => &[SourceType::News],
        Track::Policy => &[SourceType::Keyword],
    }
}

/// Latest row per signal name.
///
/// Rows on the same date prefer a finite value, then the larger value, so the
/// choice never depends on input order.
fn latest_per_signal(records: &[SignalRecord]) -> BTreeMap<&str, &SignalRecord> {
    let mut latest: BTreeMap<&str, &SignalRecord> = BTreeMap::new();
    for record in records {
        latest
            .entry(record.signal_name.as_str())
            .and_modify(|kept| {
                if supersedes(record, *kept) {
                    *kept = record;
                }
            })
            .or_insert(record);
    }
    latest
}

fn supersedes(candidate: &SignalRecord, kept: &SignalRecord) -> bool {
    let finite = |r: &SignalRecord| r.raw_value.filter(|v| v.is_finite());
    let by_value = match (finite(candidate), finite(kept)) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    };
    candidate.as_of_date.cmp(&kept.as_of_date).then(by_value) == Ordering::Greater
}

fn strength(normalized: f64) -> &'static str {
    if normalized >= 0.7 {
        "strong"
    } else if normalized >= 0.4 {
        "fair"
    } else {
        "weak"
    }
}

/// Override first, then contributions by weighted size.
fn reasons(composite: &CompositeScore, decision: &Decision) -> Vec<String> {
    let mut reasons = Vec::new();
    if let Some(rule) = &decision.override_rule {
        reasons.push(format!("override: {}", rule));
    }

    let mut contributions: Vec<_> = composite.contributing_signals.iter().collect();
    contributions.sort_by(|a, b| {
        b.contribution()
            .total_cmp(&a.contribution())
            .then_with(|| a.signal_name.cmp(&b.signal_name))
    });
    for c in contributions {
        let proxy = if c.is_proxy { " [proxy]" } else { "" };
        reasons.push(format!(
            "{} {} ({:.2}){}",
            strength(c.normalized_value),
            c.signal_name,
            c.normalized_value,
            proxy
        ));
    }

    reasons.truncate(MAX_REASONS);
    reasons
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(signal: &str, value: Option<f64>, day: u32) -> SignalRecord {
        SignalRecord::new(
            "ONGC",
            signal,
            value,
            NaiveDate::from_ymd_opt(2024, 6, day).unwrap(),
        )
    }

    #[test]
    fn test_latest_record_wins() {
        let records = vec![
            record("trailing_pe", Some(9.0), 3),
            record("trailing_pe", Some(7.5), 10),
            record("trailing_pe", Some(8.0), 5),
        ];
        let latest = latest_per_signal(&records);
        assert_eq!(latest["trailing_pe"].raw_value, Some(7.5));
    }

    #[test]
    fn test_same_date_duplicates_are_order_independent() {
        let a = record("trailing_pe", Some(9.0), 3);
        let b = record("trailing_pe", None, 3);
        let c = record("trailing_pe", Some(11.0), 3);

        let forward = vec![a.clone(), b.clone(), c.clone()];
        let backward = vec![c, b, a];
        assert_eq!(latest_per_signal(&forward)["trailing_pe"].raw_value, Some(11.0));
        assert_eq!(latest_per_signal(&backward)["trailing_pe"].raw_value, Some(11.0));
    }

    #[test]
    fn test_invalid_config_is_rejected_at_construction() {
        let mut config = EngineConfig::default();
        config.tracks.clear();
        assert!(matches!(
            ScoringEngine::new(config),
            Err(ScreenError::Configuration(_))
        ));
    }
}
