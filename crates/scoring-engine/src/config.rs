//! Engine configuration.
//!
//! Everything the engine needs to know about signals, weights, bands and
//! overrides is data. `EngineConfig::validate` checks the whole contract up
//! front so a broken configuration never reaches scoring.

use screener_core::{Category, ConfigError, Track};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Allowed drift when checking that weights sum to one.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Ratios such as PE or debt/equity.
    LowerIsBetter,
    /// ROE, margins, sentiment.
    HigherIsBetter,
}

/// A threshold beyond which a raw value is rejected as invalid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RejectLimit {
    pub value: f64,
    /// Reject the threshold value itself as well.
    #[serde(default)]
    pub inclusive: bool,
}

impl RejectLimit {
    pub fn exclusive(value: f64) -> Self {
        Self { value, inclusive: false }
    }

    pub fn inclusive(value: f64) -> Self {
        Self { value, inclusive: true }
    }
}

/// Normalization bounds for one signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalDomain {
    pub direction: Direction,
    pub min: f64,
    pub max: f64,
    #[serde(default)]
    pub reject_below: Option<RejectLimit>,
    #[serde(default)]
    pub reject_above: Option<RejectLimit>,
    #[serde(default)]
    pub is_proxy: bool,
}

impl SignalDomain {
    pub fn lower_is_better(min: f64, max: f64) -> Self {
        Self {
            direction: Direction::LowerIsBetter,
            min,
            max,
            reject_below: None,
            reject_above: None,
            is_proxy: false,
        }
    }

    pub fn higher_is_better(min: f64, max: f64) -> Self {
        Self {
            direction: Direction::HigherIsBetter,
            ..Self::lower_is_better(min, max)
        }
    }

    pub fn reject_below(mut self, limit: RejectLimit) -> Self {
        self.reject_below = Some(limit);
        self
    }

    pub fn reject_above(mut self, limit: RejectLimit) -> Self {
        self.reject_above = Some(limit);
        self
    }

    pub fn proxy(mut self) -> Self {
        self.is_proxy = true;
        self
    }

    fn validate(&self, signal: &str) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidDomain {
            signal: signal.to_string(),
            reason: reason.to_string(),
        };

        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(invalid("bounds must be finite"));
        }
        if self.min >= self.max {
            return Err(invalid("min must be strictly below max"));
        }
        for limit in [self.reject_below, self.reject_above].into_iter().flatten() {
            if !limit.value.is_finite() {
                return Err(invalid("reject limits must be finite"));
            }
        }
        Ok(())
    }
}

/// Closed-open interval `[lower, upper)` of composite scores mapped to a label.
/// The last band of a table is closed at 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub lower: f64,
    pub upper: f64,
    pub category: Category,
}

impl Band {
    pub fn new(lower: f64, upper: f64, category: Category) -> Self {
        Self { lower, upper, category }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackConfig {
    /// Signal name to weight. Iterated in name order.
    pub weights: BTreeMap<String, f64>,
    /// Ascending, gap-free band table.
    pub bands: Vec<Band>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Above,
    AtLeast,
    Below,
    AtMost,
}

impl Comparison {
    pub fn holds(&self, value: f64, threshold: f64) -> bool {
        match self {
            Comparison::Above => value > threshold,
            Comparison::AtLeast => value >= threshold,
            Comparison::Below => value < threshold,
            Comparison::AtMost => value <= threshold,
        }
    }
}

/// Forces a category from a raw signal value, ahead of band lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideRule {
    pub name: String,
    pub track: Track,
    pub signal: String,
    pub comparison: Comparison,
    pub threshold: f64,
    /// Defaults to the worst category of the track.
    #[serde(default)]
    pub category: Option<Category>,
}

impl OverrideRule {
    pub fn forced_category(&self) -> Category {
        self.category.unwrap_or_else(|| self.track.worst())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceConfig {
    /// Cap on retained items per stock, applied to each source type separately.
    pub max_items_per_stock: usize,
}

impl Default for EvidenceConfig {
    fn default() -> Self {
        Self { max_items_per_stock: 5 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub signals: BTreeMap<String, SignalDomain>,
    pub tracks: BTreeMap<Track, TrackConfig>,
    #[serde(default)]
    pub overrides: Vec<OverrideRule>,
    #[serde(default)]
    pub evidence: EvidenceConfig,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

fn default_top_n() -> usize {
    50
}

impl EngineConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }

    pub fn track(&self, track: Track) -> Option<&TrackConfig> {
        self.tracks.get(&track)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, domain) in &self.signals {
            domain.validate(name)?;
        }

        if self.tracks.is_empty() {
            return Err(ConfigError::MissingTrack(Track::Fundamentals));
        }
        for (track, cfg) in &self.tracks {
            self.validate_weights(*track, cfg)?;
            validate_bands(*track, &cfg.bands)?;
        }

        for rule in &self.overrides {
            self.validate_override(rule)?;
        }

        if self.evidence.max_items_per_stock == 0 {
            return Err(ConfigError::EvidenceCap);
        }
        Ok(())
    }

    fn validate_weights(&self, track: Track, cfg: &TrackConfig) -> Result<(), ConfigError> {
        if cfg.weights.is_empty() {
            return Err(ConfigError::EmptyWeights(track));
        }

        let mut sum = 0.0;
        for (signal, &weight) in &cfg.weights {
            if !weight.is_finite() || weight < 0.0 {
                return Err(ConfigError::InvalidWeight {
                    track,
                    signal: signal.clone(),
                    weight,
                });
            }
            if !self.signals.contains_key(signal) {
                return Err(ConfigError::UnknownSignal {
                    context: format!("{} weights", track),
                    signal: signal.clone(),
                });
            }
            sum += weight;
        }

        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::WeightSum { track, sum });
        }
        Ok(())
    }

    fn validate_override(&self, rule: &OverrideRule) -> Result<(), ConfigError> {
        if !self.tracks.contains_key(&rule.track) {
            return Err(ConfigError::MissingTrack(rule.track));
        }
        if !self.signals.contains_key(&rule.signal) {
            return Err(ConfigError::UnknownSignal {
                context: format!("override '{}'", rule.name),
                signal: rule.signal.clone(),
            });
        }
        if !rule.threshold.is_finite() {
            return Err(ConfigError::InvalidOverride {
                name: rule.name.clone(),
                reason: "threshold must be finite".to_string(),
            });
        }
        if let Some(category) = rule.category {
            if category.track() != Some(rule.track) {
                return Err(ConfigError::InvalidOverride {
                    name: rule.name.clone(),
                    reason: format!("category '{}' is not a {} label", category, rule.track),
                });
            }
        }
        Ok(())
    }
}

/// Bands must start at 0, end at 1, and each upper bound must equal the next
/// lower bound exactly.
pub fn validate_bands(track: Track, bands: &[Band]) -> Result<(), ConfigError> {
    let coverage = |reason: String| ConfigError::BandCoverage { track, reason };

    let (first, last) = match (bands.first(), bands.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(ConfigError::EmptyBands(track)),
    };

    for band in bands {
        if band.category.track() != Some(track) {
            return Err(ConfigError::BandCategory {
                track,
                category: band.category,
            });
        }
        if !band.lower.is_finite() || !band.upper.is_finite() || band.lower >= band.upper {
            return Err(coverage(format!(
                "band [{}, {}) for '{}' is empty or inverted",
                band.lower, band.upper, band.category
            )));
        }
    }

    if first.lower != 0.0 {
        return Err(coverage(format!("first band starts at {}, not 0", first.lower)));
    }
    if last.upper != 1.0 {
        return Err(coverage(format!("last band ends at {}, not 1", last.upper)));
    }

    for pair in bands.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        if a.upper < b.lower {
            return Err(coverage(format!("gap between {} and {}", a.upper, b.lower)));
        }
        if a.upper > b.lower {
            return Err(coverage(format!("overlap between {} and {}", b.lower, a.upper)));
        }
    }
    Ok(())
}

impl Default for EngineConfig {
    fn default() -> Self {
        let sentiment = || {
            SignalDomain::higher_is_better(-1.0, 1.0)
                .reject_below(RejectLimit::exclusive(-1.0))
                .reject_above(RejectLimit::exclusive(1.0))
        };

        let signals: BTreeMap<String, SignalDomain> = [
            (
                "trailing_pe",
                SignalDomain::lower_is_better(5.0, 50.0).reject_below(RejectLimit::inclusive(0.0)),
            ),
            (
                "pe_vs_industry",
                SignalDomain::lower_is_better(0.5, 2.0).reject_below(RejectLimit::inclusive(0.0)),
            ),
            (
                "peg_ratio",
                SignalDomain::lower_is_better(0.5, 3.0).reject_below(RejectLimit::inclusive(0.0)),
            ),
            (
                "forward_pe",
                SignalDomain::lower_is_better(5.0, 50.0).reject_below(RejectLimit::inclusive(0.0)),
            ),
            ("forward_pe_improvement", SignalDomain::higher_is_better(0.0, 1.0)),
            (
                "price_to_book",
                SignalDomain::lower_is_better(0.5, 8.0).reject_below(RejectLimit::inclusive(0.0)),
            ),
            ("return_on_equity", SignalDomain::higher_is_better(0.0, 0.30)),
            ("return_on_assets", SignalDomain::higher_is_better(0.0, 0.15)),
            ("profit_margins", SignalDomain::higher_is_better(0.0, 0.25)),
            (
                "debt_to_equity",
                SignalDomain::lower_is_better(0.0, 250.0).reject_below(RejectLimit::exclusive(0.0)),
            ),
            (
                "promoter_holding_pct",
                SignalDomain::higher_is_better(0.0, 75.0)
                    .reject_below(RejectLimit::exclusive(0.0))
                    .reject_above(RejectLimit::exclusive(100.0))
                    .proxy(),
            ),
            ("company_sentiment", sentiment()),
            ("ceo_sentiment", sentiment()),
            (
                "keyword_coverage",
                SignalDomain::higher_is_better(0.0, 1.0)
                    .reject_below(RejectLimit::exclusive(0.0))
                    .reject_above(RejectLimit::exclusive(1.0)),
            ),
            ("scheme_sentiment", sentiment()),
            (
                "scheme_mentions",
                SignalDomain::higher_is_better(0.0, 5.0).reject_below(RejectLimit::exclusive(0.0)),
            ),
        ]
        .into_iter()
        .map(|(name, domain)| (name.to_string(), domain))
        .collect();

        let weights = |pairs: &[(&str, f64)]| -> BTreeMap<String, f64> {
            pairs.iter().map(|(k, w)| (k.to_string(), *w)).collect()
        };

        let mut tracks = BTreeMap::new();
        tracks.insert(
            Track::Fundamentals,
            TrackConfig {
                weights: weights(&[
                    ("trailing_pe", 0.10),
                    ("pe_vs_industry", 0.15),
                    ("peg_ratio", 0.15),
                    ("return_on_equity", 0.15),
                    ("profit_margins", 0.10),
                    ("debt_to_equity", 0.10),
                    ("promoter_holding_pct", 0.10),
                    ("company_sentiment", 0.10),
                    ("ceo_sentiment", 0.05),
                ]),
                bands: vec![
                    Band::new(0.0, 0.4, Category::AvoidNeedsWork),
                    Band::new(0.4, 0.7, Category::Watchlist),
                    Band::new(0.7, 1.0, Category::HighPotential),
                ],
            },
        );
        tracks.insert(
            Track::Policy,
            TrackConfig {
                weights: weights(&[
                    ("keyword_coverage", 0.5),
                    ("scheme_mentions", 0.3),
                    ("scheme_sentiment", 0.2),
                ]),
                bands: vec![
                    Band::new(0.0, 0.35, Category::Unlikely),
                    Band::new(0.35, 0.65, Category::PossibleBeneficiary),
                    Band::new(0.65, 1.0, Category::LikelyBeneficiary),
                ],
            },
        );

        Self {
            signals,
            tracks,
            overrides: vec![OverrideRule {
                name: "excessive_leverage".to_string(),
                track: Track::Fundamentals,
                signal: "debt_to_equity".to_string(),
                comparison: Comparison::Above,
                threshold: 300.0,
                category: None,
            }],
            evidence: EvidenceConfig::default(),
            top_n: default_top_n(),
        }
    }
}
