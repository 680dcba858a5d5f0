use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ScreenError;

/// Trim and upper-case a raw stock id. Empty ids are rejected.
pub fn normalize_stock_id(raw: &str) -> Result<String, ScreenError> {
    let id = raw.trim().to_uppercase();
    if id.is_empty() {
        return Err(ScreenError::InvalidInput(format!(
            "empty stock id (raw: {:?})",
            raw
        )));
    }
    Ok(id)
}

/// A value in `[0, 1]` or explicitly unknown.
///
/// Serialized as a plain number, or `null` when unknown, so rows stay tabular.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "Option<f64>", into = "Option<f64>")]
pub enum Score {
    Known(f64),
    Unknown,
}

impl Score {
    pub fn value(&self) -> Option<f64> {
        match self {
            Score::Known(v) => Some(*v),
            Score::Unknown => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Score::Known(_))
    }
}

impl From<Option<f64>> for Score {
    fn from(value: Option<f64>) -> Self {
        match value {
            Some(v) if v.is_finite() => Score::Known(v),
            _ => Score::Unknown,
        }
    }
}

impl From<Score> for Option<f64> {
    fn from(score: Score) -> Self {
        score.value()
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Score::Known(v) => write!(f, "{:.4}", v),
            Score::Unknown => f.write_str("unknown"),
        }
    }
}

/// One raw measurement supplied by a collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRecord {
    pub stock_id: String,
    pub signal_name: String,
    #[serde(default)]
    pub raw_value: Option<f64>,
    pub as_of_date: NaiveDate,
}

impl SignalRecord {
    pub fn new(
        stock_id: impl Into<String>,
        signal_name: impl Into<String>,
        raw_value: Option<f64>,
        as_of_date: NaiveDate,
    ) -> Self {
        Self {
            stock_id: stock_id.into(),
            signal_name: signal_name.into(),
            raw_value,
            as_of_date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedSignal {
    pub stock_id: String,
    pub signal_name: String,
    pub value: Score,
    /// The signal is an approximation of the quantity it names.
    #[serde(default)]
    pub is_proxy: bool,
}

/// Evaluation track a composite score belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Track {
    Fundamentals,
    Policy,
}

impl Track {
    pub const ALL: [Track; 2] = [Track::Fundamentals, Track::Policy];

    pub fn as_str(&self) -> &'static str {
        match self {
            Track::Fundamentals => "fundamentals",
            Track::Policy => "policy",
        }
    }

    /// Labels of this track, worst first.
    pub fn categories(&self) -> [Category; 3] {
        match self {
            Track::Fundamentals => [
                Category::AvoidNeedsWork,
                Category::Watchlist,
                Category::HighPotential,
            ],
            Track::Policy => [
                Category::Unlikely,
                Category::PossibleBeneficiary,
                Category::LikelyBeneficiary,
            ],
        }
    }

    pub fn worst(&self) -> Category {
        self.categories()[0]
    }

    pub fn best(&self) -> Category {
        self.categories()[2]
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recommendation label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "High Potential")]
    HighPotential,
    #[serde(rename = "Watchlist")]
    Watchlist,
    #[serde(rename = "Avoid/Needs Work")]
    AvoidNeedsWork,
    #[serde(rename = "Likely Beneficiary")]
    LikelyBeneficiary,
    #[serde(rename = "Possible Beneficiary")]
    PossibleBeneficiary,
    #[serde(rename = "Unlikely")]
    Unlikely,
    /// Track-independent fallback when the composite score is unknown.
    #[serde(rename = "Insufficient Data")]
    InsufficientData,
}

impl Category {
    pub fn label(&self) -> &'static str {
        match self {
            Category::HighPotential => "High Potential",
            Category::Watchlist => "Watchlist",
            Category::AvoidNeedsWork => "Avoid/Needs Work",
            Category::LikelyBeneficiary => "Likely Beneficiary",
            Category::PossibleBeneficiary => "Possible Beneficiary",
            Category::Unlikely => "Unlikely",
            Category::InsufficientData => "Insufficient Data",
        }
    }

    pub fn track(&self) -> Option<Track> {
        match self {
            Category::HighPotential | Category::Watchlist | Category::AvoidNeedsWork => {
                Some(Track::Fundamentals)
            }
            Category::LikelyBeneficiary | Category::PossibleBeneficiary | Category::Unlikely => {
                Some(Track::Policy)
            }
            Category::InsufficientData => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One signal's share of a composite score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributingSignal {
    pub signal_name: String,
    /// Weight after re-normalization over the known signals.
    pub weight: f64,
    pub normalized_value: f64,
    #[serde(default)]
    pub is_proxy: bool,
}

impl ContributingSignal {
    pub fn contribution(&self) -> f64 {
        self.weight * self.normalized_value
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeScore {
    pub stock_id: String,
    pub track: Track,
    pub value: Score,
    /// Ordered by signal name.
    pub contributing_signals: Vec<ContributingSignal>,
}

impl CompositeScore {
    pub fn score_name(&self) -> &'static str {
        self.track.as_str()
    }

    pub fn uses_proxy_data(&self) -> bool {
        self.contributing_signals.iter().any(|c| c.is_proxy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    News,
    Keyword,
}

/// Snippet retained to justify a score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub stock_id: String,
    pub source_type: SourceType,
    pub snippet: String,
    #[serde(default)]
    pub matched_term: Option<String>,
    #[serde(default)]
    pub sentiment_value: Option<f64>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub published: Option<DateTime<Utc>>,
}

/// Final label for one stock on one track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub stock_id: String,
    pub track: Track,
    pub category: Category,
    pub composite_score: Score,
    pub contributing_signals: Vec<ContributingSignal>,
    /// Name of the hard override that decided the category, if any.
    #[serde(default)]
    pub override_rule: Option<String>,
    #[serde(default)]
    pub uses_proxy_data: bool,
    /// Short human-readable reasons, strongest contribution first.
    #[serde(default)]
    pub reasons: Vec<String>,
    /// Evidence for this stock, in retention priority order.
    #[serde(default)]
    pub rationale: Vec<EvidenceItem>,
}

impl Classification {
    /// Only stocks with a known composite score take part in ranking.
    pub fn is_ranked(&self) -> bool {
        self.composite_score.is_known()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_stock_id() {
        assert_eq!(normalize_stock_id("  reliance ").unwrap(), "RELIANCE");
        assert!(normalize_stock_id("   ").is_err());
    }

    #[test]
    fn test_score_serializes_unknown_as_null() {
        let json = serde_json::to_string(&vec![Score::Known(0.5), Score::Unknown]).unwrap();
        assert_eq!(json, "[0.5,null]");

        let back: Vec<Score> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, vec![Score::Known(0.5), Score::Unknown]);
    }

    #[test]
    fn test_category_labels_round_trip_through_serde() {
        let json = serde_json::to_string(&Category::AvoidNeedsWork).unwrap();
        assert_eq!(json, "\"Avoid/Needs Work\"");
        assert_eq!(Category::InsufficientData.track(), None);
        assert_eq!(Track::Policy.worst(), Category::Unlikely);
        assert_eq!(Track::Fundamentals.best(), Category::HighPotential);
    }
}
