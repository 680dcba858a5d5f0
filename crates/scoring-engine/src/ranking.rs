//! Ranked classification tables.

use screener_core::{Category, Classification, Track};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One row per stock for a track, sorted by composite score descending.
///
/// Ties break on stock id. Rows with an unknown composite score sit after all
/// ranked rows and never appear in `top_n`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedTable {
    pub track: Track,
    pub rows: Vec<Classification>,
}

fn rank_cmp(a: &Classification, b: &Classification) -> Ordering {
    match (a.composite_score.value(), b.composite_score.value()) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.stock_id.cmp(&b.stock_id))
}

impl RankedTable {
    pub fn new(track: Track, mut rows: Vec<Classification>) -> Self {
        rows.sort_by(rank_cmp);
        Self { track, rows }
    }

    pub fn ranked(&self) -> impl Iterator<Item = &Classification> {
        self.rows.iter().filter(|c| c.is_ranked())
    }

    pub fn top_n(&self, n: usize) -> Vec<&Classification> {
        self.ranked().take(n).collect()
    }

    /// Stocks reported as `Insufficient Data` or otherwise left unranked.
    pub fn unranked(&self) -> impl Iterator<Item = &Classification> {
        self.rows.iter().filter(|c| !c.is_ranked())
    }

    pub fn get(&self, stock_id: &str) -> Option<&Classification> {
        self.rows.iter().find(|c| c.stock_id == stock_id)
    }

    pub fn filter_by_category(&self, category: Category) -> Vec<&Classification> {
        self.rows.iter().filter(|c| c.category == category).collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
