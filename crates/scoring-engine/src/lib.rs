//! Multi-factor scoring and classification engine.
//!
//! Raw per-stock signals are normalized onto `[0, 1]`, blended per track into
//! composite scores, mapped to categories through band tables and hard
//! overrides, and reported as ranked tables with supporting evidence.

pub mod classifier;
pub mod composite;
pub mod config;
pub mod engine;
pub mod evidence;
pub mod normalizer;
pub mod ranking;

#[cfg(test)]
mod tests;

pub use classifier::{lookup_band, Classifier, Decision};
pub use composite::composite_score;
pub use config::{
    Band, Comparison, Direction, EngineConfig, EvidenceConfig, OverrideRule, RejectLimit,
    SignalDomain, TrackConfig,
};
pub use engine::{ScoringEngine, ScreenReport, StockOutcome};
pub use evidence::{priority_cmp, EvidenceCollector};
pub use normalizer::normalize_record;
pub use ranking::RankedTable;
